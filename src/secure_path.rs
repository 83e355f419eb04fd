//! Executable search path securing.
//!
//! The inherited PATH is attacker-influenced input. Before any command
//! lookup, it is rebuilt to contain only directories the policy approves:
//! relative entries are rejected outright, unapproved directories are
//! dropped, order is preserved, and duplicates are removed. An empty result
//! is an error, never a fallback to the raw PATH.

use std::path::{Path, PathBuf};

use crate::error::PathError;

/// A single rule of a [`PathPolicy`].
#[derive(Debug, Clone)]
pub enum PathRule {
    /// The directory is allowed exactly as named.
    Dir(PathBuf),

    /// The directory is allowed if the predicate accepts it.
    Check(fn(&Path) -> bool),
}

/// Ordered directory rules defining which entries may appear in the secured
/// PATH. A directory survives if any rule permits it; with no rules, nothing
/// survives.
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    rules: Vec<PathRule>,
}

/// The standard system directories, the usual baseline for granted roles.
pub fn system_path_policy() -> PathPolicy {
    PathPolicy::default()
        .allow("/usr/local/sbin")
        .allow("/usr/local/bin")
        .allow("/usr/sbin")
        .allow("/usr/bin")
        .allow("/sbin")
        .allow("/bin")
}

impl PathPolicy {
    /// Policy with no rules: every directory is rejected.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Append an explicitly allowed directory.
    pub fn allow(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rules.push(PathRule::Dir(dir.into()));
        self
    }

    /// Append a validation predicate.
    pub fn check(mut self, predicate: fn(&Path) -> bool) -> Self {
        self.rules.push(PathRule::Check(predicate));
        self
    }

    /// True if some rule permits `dir`. Relative directories never pass.
    pub fn permits(&self, dir: &Path) -> bool {
        if !dir.is_absolute() {
            return false;
        }
        self.rules.iter().any(|rule| match rule {
            PathRule::Dir(allowed) => allowed == dir,
            PathRule::Check(predicate) => predicate(dir),
        })
    }

    /// Rebuild `raw` into a trustworthy colon-joined PATH.
    ///
    /// Splits on `:`, keeps only approved absolute directories, preserves
    /// relative order, and de-duplicates.
    ///
    /// # Errors
    ///
    /// [`PathError::NoValidDirectories`] if nothing survives — command
    /// resolution must be blocked rather than fall back to the raw PATH.
    pub fn secure(&self, raw: &str) -> Result<String, PathError> {
        let mut kept: Vec<&str> = Vec::new();
        for entry in raw.split(':') {
            if entry.is_empty() || kept.contains(&entry) {
                continue;
            }
            if self.permits(Path::new(entry)) {
                kept.push(entry);
            }
        }
        if kept.is_empty() {
            return Err(PathError::NoValidDirectories);
        }
        Ok(kept.join(":"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_allowed_directories_survive() {
        let policy = PathPolicy::default().allow("/usr/bin");
        assert_eq!(policy.secure("/usr/bin:/tmp").unwrap(), "/usr/bin");
    }

    #[test]
    fn order_is_preserved() {
        let policy = PathPolicy::default().allow("/usr/bin").allow("/bin");
        assert_eq!(policy.secure("/bin:/usr/bin").unwrap(), "/bin:/usr/bin");
    }

    #[test]
    fn duplicates_are_dropped() {
        let policy = PathPolicy::default().allow("/usr/bin").allow("/bin");
        assert_eq!(
            policy.secure("/usr/bin:/bin:/usr/bin").unwrap(),
            "/usr/bin:/bin"
        );
    }

    #[test]
    fn relative_entries_are_rejected() {
        let policy = PathPolicy::default()
            .allow("/usr/bin")
            .check(|_| true); // even a permissive predicate cannot pass them
        assert_eq!(
            policy.secure("bin:.:../sbin:/usr/bin").unwrap(),
            "/usr/bin"
        );
    }

    #[test]
    fn empty_result_is_an_error() {
        let policy = PathPolicy::default().allow("/usr/bin");
        assert_eq!(
            policy.secure("/tmp:/var/tmp"),
            Err(PathError::NoValidDirectories)
        );
    }

    #[test]
    fn deny_all_rejects_everything() {
        assert_eq!(
            PathPolicy::deny_all().secure("/usr/bin:/bin"),
            Err(PathError::NoValidDirectories)
        );
    }

    #[test]
    fn predicate_rules_apply() {
        let policy = PathPolicy::default().check(|p| p.starts_with("/opt/tools"));
        assert_eq!(
            policy.secure("/opt/tools/bin:/usr/bin").unwrap(),
            "/opt/tools/bin"
        );
    }

    #[test]
    fn system_policy_keeps_the_usual_suspects() {
        let secured = system_path_policy()
            .secure("/usr/local/bin:/usr/bin:/home/me/bin:/bin")
            .unwrap();
        assert_eq!(secured, "/usr/local/bin:/usr/bin:/bin");
    }

    #[test]
    fn output_never_invents_directories() {
        let policy = system_path_policy();
        let raw = "/usr/bin:/tmp:/bin";
        let secured = policy.secure(raw).unwrap();
        for dir in secured.split(':') {
            assert!(raw.split(':').any(|d| d == dir));
            assert!(policy.permits(Path::new(dir)));
        }
    }
}
