//! Capability set triple granted to the executed command.
//!
//! A `CapabilitySet` carries the Inheritable, Ambient, and Bounding sets
//! (IAB) that determine what privilege the spawned command may retain or
//! acquire. It is disjoint from the tool's own permitted and effective sets:
//! installing it never widens what the tool itself can do, and the tool's
//! ambient privilege must never leak into it.

use capctl::{Cap, CapSet, ParseCapError};

/// Inheritable, ambient, and bounding capability sets for the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    /// Capabilities preserved across execve into the permitted set of
    /// capability-aware binaries.
    pub inheritable: CapSet,

    /// Capabilities granted to the child regardless of file capabilities.
    /// Must be a subset of `inheritable`; `normalize` maintains this.
    pub ambient: CapSet,

    /// Upper bound on what the child (and its descendants) can ever hold.
    pub bounding: CapSet,
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::empty()
    }
}

impl CapabilitySet {
    /// The fully deprivileged set: nothing inheritable, nothing ambient,
    /// empty bounding set. A grant carrying this runs the command with no
    /// capabilities at all.
    pub fn empty() -> Self {
        Self {
            inheritable: CapSet::empty(),
            ambient: CapSet::empty(),
            bounding: CapSet::empty(),
        }
    }

    /// Grant exactly `caps`: inheritable, ambient, and bounding all equal to
    /// the given set. This is the common policy-authoring shape, matching a
    /// grant of discrete capabilities and nothing more.
    pub fn from_granted(caps: CapSet) -> Self {
        Self {
            inheritable: caps,
            ambient: caps,
            bounding: caps,
        }
    }

    /// Add a single capability to all three sets.
    pub fn grant(mut self, cap: Cap) -> Self {
        self.inheritable.add(cap);
        self.ambient.add(cap);
        self.bounding.add(cap);
        self
    }

    /// True if nothing is granted in any of the three sets.
    pub fn is_empty(&self) -> bool {
        let none = CapSet::empty();
        self.inheritable == none && self.ambient == none && self.bounding == none
    }

    /// Fold the ambient set into the inheritable set.
    ///
    /// The kernel requires ambient capabilities to be inheritable as well;
    /// the enforcer installs the normalized form.
    pub fn normalize(&self) -> Self {
        Self {
            inheritable: self.inheritable.union(self.ambient),
            ambient: self.ambient,
            bounding: self.bounding,
        }
    }

    /// Render the granted capabilities for display, lowest bit first.
    ///
    /// Only the inheritable/ambient grant is listed; the bounding set is a
    /// ceiling, not a grant.
    pub fn describe(&self) -> String {
        let granted = self.inheritable.union(self.ambient);
        if granted == CapSet::empty() {
            return "(none)".to_string();
        }
        granted
            .iter()
            .map(|cap| format!("CAP_{:?}", cap).to_uppercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse a capability name into a [`Cap`].
///
/// Accepts both the kernel spelling (`CAP_NET_RAW`) and the bare name
/// (`net_raw`), case-insensitively.
pub fn parse_cap(name: &str) -> Result<Cap, ParseCapError> {
    let upper = name.trim().to_uppercase();
    let full = if upper.starts_with("CAP_") {
        upper
    } else {
        format!("CAP_{}", upper)
    };
    full.parse()
}

/// Parse a comma-separated capability list into a [`CapSet`].
pub fn parse_cap_list(list: &str) -> Result<CapSet, ParseCapError> {
    let mut set = CapSet::empty();
    for name in list.split(',').filter(|s| !s.trim().is_empty()) {
        set.add(parse_cap(name)?);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_grants_nothing() {
        let set = CapabilitySet::empty();
        assert!(set.is_empty());
        assert_eq!(set.describe(), "(none)");
    }

    #[test]
    fn from_granted_fills_all_three_sets() {
        let mut caps = CapSet::empty();
        caps.add(Cap::NET_RAW);
        let set = CapabilitySet::from_granted(caps);
        assert!(set.inheritable.has(Cap::NET_RAW));
        assert!(set.ambient.has(Cap::NET_RAW));
        assert!(set.bounding.has(Cap::NET_RAW));
    }

    #[test]
    fn grant_accumulates() {
        let set = CapabilitySet::empty()
            .grant(Cap::NET_BIND_SERVICE)
            .grant(Cap::KILL);
        assert!(set.inheritable.has(Cap::NET_BIND_SERVICE));
        assert!(set.inheritable.has(Cap::KILL));
        assert!(!set.inheritable.has(Cap::SYS_ADMIN));
    }

    #[test]
    fn normalize_folds_ambient_into_inheritable() {
        let mut set = CapabilitySet::empty();
        set.ambient.add(Cap::CHOWN);
        let norm = set.normalize();
        assert!(norm.inheritable.has(Cap::CHOWN));
        assert!(norm.ambient.has(Cap::CHOWN));
    }

    #[test]
    fn parse_accepts_both_spellings() {
        assert_eq!(parse_cap("CAP_NET_RAW").unwrap(), Cap::NET_RAW);
        assert_eq!(parse_cap("net_raw").unwrap(), Cap::NET_RAW);
        assert_eq!(parse_cap("Chown").unwrap(), Cap::CHOWN);
        assert!(parse_cap("not_a_cap").is_err());
    }

    #[test]
    fn parse_list_collects_all_entries() {
        let set = parse_cap_list("net_raw, kill").unwrap();
        assert!(set.has(Cap::NET_RAW));
        assert!(set.has(Cap::KILL));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn describe_names_kernel_spelling() {
        let set = CapabilitySet::empty().grant(Cap::NET_RAW);
        assert_eq!(set.describe(), "CAP_NET_RAW");
    }
}
