//! Role policy and decision resolution.
//!
//! The main entry point of the crate. A [`RolePolicy`] holds the ordered
//! role entries a deployment grants; [`RolePolicy::resolve`] matches the
//! executor identity and requested command against them and produces the one
//! [`Decision`] every downstream component consumes. Matching is
//! deterministic, total, and single-winner: the fields of the winning entry
//! are copied verbatim into the decision and never unioned across entries,
//! so ambiguity is a policy-authoring problem, not a silent privilege grant.

use std::path::{Path, PathBuf};

use crate::capset::CapabilitySet;
use crate::env_policy::EnvPolicy;
use crate::error::PolicyError;
use crate::identity::Identity;
use crate::secure_path::{system_path_policy, PathPolicy};

/// Per-grant execution options, copied from the winning role entry.
#[derive(Debug, Clone)]
pub struct Options {
    /// Lock securebits so the command (and its children) can never regain
    /// root-equivalent privilege, setuid binaries included.
    pub no_root: bool,

    /// Environment filter applied to the inherited environment.
    pub env: EnvPolicy,

    /// Rules for rebuilding the executable search path.
    pub path: PathPolicy,
}

impl Default for Options {
    /// Fail-closed defaults: no-root locked, every inherited variable
    /// dropped, and only the standard system directories in PATH.
    fn default() -> Self {
        Self {
            no_root: true,
            env: EnvPolicy::deny_all(),
            path: system_path_policy(),
        }
    }
}

/// Who a role entry applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// Matches the executor's username.
    User(String),
    /// Matches any of the executor's group names.
    Group(String),
}

impl Subject {
    fn matches(&self, identity: &Identity) -> bool {
        match self {
            Subject::User(name) => identity.username == *name,
            Subject::Group(name) => identity.in_group(name),
        }
    }
}

/// Which commands a role entry covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRule {
    /// Any command. The least specific rule.
    Any,
    /// A command with this basename, wherever it resolves.
    Basename(String),
    /// Exactly this path. The most specific rule.
    Exact(PathBuf),
}

impl CommandRule {
    fn matches(&self, command: &Path) -> bool {
        match self {
            CommandRule::Any => true,
            CommandRule::Basename(name) => {
                command.file_name().is_some_and(|base| base == name.as_str())
            }
            CommandRule::Exact(path) => command == path,
        }
    }

    /// Precedence of this rule when several entries match; higher wins.
    fn specificity(&self) -> u8 {
        match self {
            CommandRule::Any => 0,
            CommandRule::Basename(_) => 1,
            CommandRule::Exact(_) => 2,
        }
    }
}

/// One role grant: subjects, covered commands, and what they get.
#[derive(Debug, Clone)]
pub struct RoleEntry {
    name: String,
    subjects: Vec<Subject>,
    commands: Vec<CommandRule>,
    capabilities: CapabilitySet,
    options: Options,
}

impl RoleEntry {
    /// New entry with no subjects, no command rules, no capabilities, and
    /// fail-closed default options. An entry like this matches nobody.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subjects: Vec::new(),
            commands: Vec::new(),
            capabilities: CapabilitySet::empty(),
            options: Options::default(),
        }
    }

    /// Role name, as selected by `--role`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grant the role to a username.
    pub fn user(mut self, name: impl Into<String>) -> Self {
        self.subjects.push(Subject::User(name.into()));
        self
    }

    /// Grant the role to a group.
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.subjects.push(Subject::Group(name.into()));
        self
    }

    /// Cover any command.
    pub fn any_command(mut self) -> Self {
        self.commands.push(CommandRule::Any);
        self
    }

    /// Cover commands with this basename.
    pub fn command(mut self, basename: impl Into<String>) -> Self {
        self.commands.push(CommandRule::Basename(basename.into()));
        self
    }

    /// Cover exactly this command path.
    pub fn command_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.commands.push(CommandRule::Exact(path.into()));
        self
    }

    /// Set the capability triple granted by this entry.
    pub fn capabilities(mut self, caps: CapabilitySet) -> Self {
        self.capabilities = caps;
        self
    }

    /// Replace the entry's options.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    fn applies_to(&self, identity: &Identity) -> bool {
        self.subjects.iter().any(|s| s.matches(identity))
    }

    /// Best (highest) specificity of any matching command rule, if one
    /// matches at all.
    fn match_specificity(&self, command: &Path) -> Option<u8> {
        self.commands
            .iter()
            .filter(|rule| rule.matches(command))
            .map(CommandRule::specificity)
            .max()
    }
}

/// What the winning role entry grants, copied verbatim.
#[derive(Debug, Clone)]
pub struct Grant {
    /// Name of the role that matched.
    pub role: String,
    /// Capability triple to install for the command.
    pub capabilities: CapabilitySet,
    /// Execution options.
    pub options: Options,
}

/// The sole artifact the matcher emits and downstream components consume.
///
/// `Denied` consults nothing else and triggers no privilege transition:
/// the deny path never reaches the enforcer, sanitizer, or executor.
#[derive(Debug, Clone)]
pub enum Decision {
    /// A single policy entry granted the request.
    Granted(Grant),
    /// No entry matched. Fail closed.
    Denied,
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted(_))
    }
}

/// Resolves decisions for identities. The seam the external policy store
/// implements; [`RolePolicy`] is the in-memory implementation.
pub trait DecisionSource {
    /// Load the decision for this identity, requested role, and command.
    ///
    /// # Errors
    ///
    /// [`PolicyError::LookupFailed`] if the backing store cannot produce a
    /// decision at all. "No grant" is `Ok(Decision::Denied)`, not an error.
    fn load(
        &self,
        identity: &Identity,
        role: Option<&str>,
        command: &Path,
    ) -> Result<Decision, PolicyError>;
}

/// Ordered set of role entries. Built with [`RolePolicy::builder`];
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    entries: Vec<RoleEntry>,
}

impl RolePolicy {
    /// Create a new policy builder.
    pub fn builder() -> RolePolicyBuilder {
        RolePolicyBuilder::new()
    }

    /// The empty policy: every request is denied.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Resolve (identity, requested role, command) to a decision.
    ///
    /// Evaluation is total and deterministic: among entries whose subject
    /// set contains the identity (and whose name matches the requested role,
    /// when one is given), the entry with the most specific matching command
    /// rule wins; ties break by declaration order. No match is `Denied`.
    pub fn resolve(
        &self,
        identity: &Identity,
        requested_role: Option<&str>,
        command: &Path,
    ) -> Decision {
        let mut best: Option<(u8, &RoleEntry)> = None;

        for entry in &self.entries {
            if requested_role.is_some_and(|role| entry.name != role) {
                continue;
            }
            if !entry.applies_to(identity) {
                continue;
            }
            if let Some(specificity) = entry.match_specificity(command) {
                // Strictly greater, so the first declared entry wins ties.
                if best.is_none_or(|(b, _)| specificity > b) {
                    best = Some((specificity, entry));
                }
            }
        }

        match best {
            Some((_, entry)) => Decision::Granted(Grant {
                role: entry.name.clone(),
                capabilities: entry.capabilities,
                options: entry.options.clone(),
            }),
            None => Decision::Denied,
        }
    }

    /// Best-match rights for reporting: the first declared entry that
    /// applies to the identity, restricted to `requested_role` when one is
    /// given, independent of any command. Used by the read-only `--info`
    /// path.
    pub fn rights_of(&self, identity: &Identity, requested_role: Option<&str>) -> Decision {
        self.entries
            .iter()
            .find(|entry| {
                requested_role.is_none_or(|role| entry.name == role) && entry.applies_to(identity)
            })
            .map(|entry| {
                Decision::Granted(Grant {
                    role: entry.name.clone(),
                    capabilities: entry.capabilities,
                    options: entry.options.clone(),
                })
            })
            .unwrap_or(Decision::Denied)
    }
}

impl DecisionSource for RolePolicy {
    fn load(
        &self,
        identity: &Identity,
        role: Option<&str>,
        command: &Path,
    ) -> Result<Decision, PolicyError> {
        Ok(self.resolve(identity, role, command))
    }
}

/// Builder for [`RolePolicy`]. Declaration order is match order for ties.
#[derive(Debug, Clone, Default)]
pub struct RolePolicyBuilder {
    entries: Vec<RoleEntry>,
}

impl RolePolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a role entry.
    pub fn entry(mut self, entry: RoleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn build(self) -> RolePolicy {
        RolePolicy {
            entries: self.entries,
        }
    }
}

/// Load the deployment's role policy.
///
/// This is the integration seam for the external policy store; the on-disk
/// format is out of this crate's scope. Until a store backend is wired in,
/// the empty policy is returned and every request is denied.
pub fn load_system_policy() -> Result<RolePolicy, PolicyError> {
    Ok(RolePolicy::deny_all())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capctl::Cap;
    use nix::unistd::{Gid, Uid};

    fn alice() -> Identity {
        Identity {
            username: "alice".to_string(),
            euid: Uid::from_raw(1000),
            gid: Gid::from_raw(1000),
            groups: vec![Gid::from_raw(1000), Gid::from_raw(27)],
            group_names: vec!["alice".to_string(), "netadmin".to_string()],
        }
    }

    #[test]
    fn empty_policy_denies() {
        let decision = RolePolicy::deny_all().resolve(&alice(), None, Path::new("/bin/ls"));
        assert!(!decision.is_granted());
    }

    #[test]
    fn username_subject_matches() {
        let policy = RolePolicy::builder()
            .entry(RoleEntry::new("ls").user("alice").command("ls"))
            .build();
        assert!(policy
            .resolve(&alice(), None, Path::new("/bin/ls"))
            .is_granted());
    }

    #[test]
    fn group_subject_matches() {
        let policy = RolePolicy::builder()
            .entry(
                RoleEntry::new("net")
                    .group("netadmin")
                    .command_path("/usr/bin/ip"),
            )
            .build();
        assert!(policy
            .resolve(&alice(), None, Path::new("/usr/bin/ip"))
            .is_granted());
        assert!(!policy
            .resolve(&alice(), None, Path::new("/usr/bin/tc"))
            .is_granted());
    }

    #[test]
    fn unrelated_identity_is_denied() {
        let policy = RolePolicy::builder()
            .entry(RoleEntry::new("ls").user("bob").any_command())
            .build();
        let decision = policy.resolve(&alice(), None, Path::new("/bin/ls"));
        assert!(!decision.is_granted());
    }

    #[test]
    fn requested_role_restricts_candidates() {
        let policy = RolePolicy::builder()
            .entry(RoleEntry::new("a").user("alice").any_command())
            .entry(RoleEntry::new("b").user("alice").any_command())
            .build();

        match policy.resolve(&alice(), Some("b"), Path::new("/bin/ls")) {
            Decision::Granted(grant) => assert_eq!(grant.role, "b"),
            Decision::Denied => panic!("expected a grant"),
        }

        // A role the identity does not hold is a denial, not an error.
        assert!(!policy
            .resolve(&alice(), Some("missing"), Path::new("/bin/ls"))
            .is_granted());
    }

    #[test]
    fn most_specific_command_rule_wins() {
        let policy = RolePolicy::builder()
            .entry(RoleEntry::new("broad").user("alice").any_command())
            .entry(
                RoleEntry::new("narrow")
                    .user("alice")
                    .command_path("/bin/ping"),
            )
            .build();

        match policy.resolve(&alice(), None, Path::new("/bin/ping")) {
            Decision::Granted(grant) => assert_eq!(grant.role, "narrow"),
            Decision::Denied => panic!("expected a grant"),
        }
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let policy = RolePolicy::builder()
            .entry(RoleEntry::new("first").user("alice").command("ping"))
            .entry(RoleEntry::new("second").user("alice").command("ping"))
            .build();

        match policy.resolve(&alice(), None, Path::new("/bin/ping")) {
            Decision::Granted(grant) => assert_eq!(grant.role, "first"),
            Decision::Denied => panic!("expected a grant"),
        }
    }

    #[test]
    fn winner_fields_are_copied_not_unioned() {
        let policy = RolePolicy::builder()
            .entry(
                RoleEntry::new("raw")
                    .user("alice")
                    .command("ping")
                    .capabilities(CapabilitySet::empty().grant(Cap::NET_RAW)),
            )
            .entry(
                RoleEntry::new("admin")
                    .user("alice")
                    .command("ping")
                    .capabilities(CapabilitySet::empty().grant(Cap::SYS_ADMIN)),
            )
            .build();

        match policy.resolve(&alice(), None, Path::new("/bin/ping")) {
            Decision::Granted(grant) => {
                assert!(grant.capabilities.inheritable.has(Cap::NET_RAW));
                // The losing entry's grant must not bleed in.
                assert!(!grant.capabilities.inheritable.has(Cap::SYS_ADMIN));
            }
            Decision::Denied => panic!("expected a grant"),
        }
    }

    #[test]
    fn rights_of_reports_the_first_applicable_role() {
        let policy = RolePolicy::builder()
            .entry(RoleEntry::new("other").user("bob").any_command())
            .entry(RoleEntry::new("mine").user("alice").command("ping"))
            .entry(RoleEntry::new("also-mine").user("alice").any_command())
            .build();

        match policy.rights_of(&alice(), None) {
            Decision::Granted(grant) => assert_eq!(grant.role, "mine"),
            Decision::Denied => panic!("expected a grant"),
        }

        match policy.rights_of(&alice(), Some("also-mine")) {
            Decision::Granted(grant) => assert_eq!(grant.role, "also-mine"),
            Decision::Denied => panic!("expected a grant"),
        }

        assert!(!policy.rights_of(&alice(), Some("other")).is_granted());
    }

    #[test]
    fn system_policy_seam_fails_closed() {
        let policy = load_system_policy().unwrap();
        assert!(!policy
            .resolve(&alice(), None, Path::new("/bin/ls"))
            .is_granted());
    }
}
