//! # rolegate
//!
//! Role-based privilege delegation for Linux.
//!
//! `rolegate` lets an unprivileged caller run a command "as a role": the
//! executor's identity and requested command are matched against policy to
//! produce a least-privilege decision, the tool drops from its elevated
//! starting state to exactly that decision's capability triple, the
//! inherited environment and PATH are sanitized, and only then is the
//! target command resolved and executed in place.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rolegate::{
//!     resolve_identity, CapabilitySet, Decision, RoleEntry, RolePolicy,
//! };
//! use capctl::Cap;
//! use nix::unistd::geteuid;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), rolegate::Error> {
//! let policy = RolePolicy::builder()
//!     .entry(
//!         RoleEntry::new("net-diag")
//!             .group("netadmin")
//!             .command("ping")
//!             .capabilities(CapabilitySet::empty().grant(Cap::NET_RAW)),
//!     )
//!     .build();
//!
//! let identity = resolve_identity(geteuid())?;
//! match policy.resolve(&identity, None, Path::new("/bin/ping")) {
//!     Decision::Granted(grant) => println!("granted role {}", grant.role),
//!     Decision::Denied => println!("permission denied"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Design principles
//!
//! - **Fail closed**: no matching policy entry, an empty secured PATH, or
//!   any transition failure denies or aborts; nothing ever falls back to an
//!   untrusted default.
//! - **Single winner**: when several policy entries apply, exactly one is
//!   chosen deterministically; grants are never unioned across entries.
//! - **Minimal privilege window**: the setpcap elevation needed to rewrite
//!   capability state is a scoped bracket holding nothing else.
//! - **Default-deny environment**: inherited variables reach the command
//!   only through an explicit keep list or a checked list with a safety
//!   predicate.
//! - **No trusted PATH inheritance**: the executable search path is rebuilt
//!   from policy-approved directories before any lookup.
//!
//! ## Platform support
//!
//! Linux only: the enforcement layer is built on Linux capabilities,
//! ambient sets, and securebits.

#[cfg(not(target_os = "linux"))]
compile_error!(
    "rolegate only supports Linux. \
     Enforcement relies on the Linux capability model (inheritable, \
     ambient, and bounding sets) and on securebits."
);

mod auth;
mod capset;
mod enforce;
mod env_policy;
mod error;
mod exec;
mod file_check;
mod identity;
mod policy;
mod report;
mod secure_path;

// Public API
pub use auth::{Authenticator, TrustingAuthenticator};
pub use capset::{parse_cap, parse_cap_list, CapabilitySet};
pub use enforce::{enforce_decision, Enforcer, SetpcapGuard, SysEnforcer};
pub use env_policy::{check_value, EnvPolicy};
pub use error::{
    AuthError, EnforcementError, Error, ExecError, FilterError, IdentityError, PathError,
    PolicyError,
};
pub use exec::{fallback_argv, resolve, PreparedExec, FALLBACK_SHELL};
pub use identity::{resolve_identity, Identity};
pub use policy::{
    load_system_policy, CommandRule, Decision, DecisionSource, Grant, Options, RoleEntry,
    RolePolicy, RolePolicyBuilder, Subject,
};
pub use report::render;
pub use secure_path::{system_path_policy, PathPolicy, PathRule};
