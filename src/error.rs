//! Error types for rolegate.
//!
//! Every error in this crate is fatal to the invocation: the tool either
//! fully resolves, drops privilege, and executes, or it exits without having
//! executed anything. There is no retry path except the single designed
//! ENOEXEC shell fallback in the executor.

use thiserror::Error;

/// Failure to resolve the executing identity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The executor uid has no entry in the user database.
    #[error("unable to retrieve the username of uid {uid}")]
    UnknownUid { uid: u32 },

    /// The group membership list could not be enumerated.
    #[error("unable to retrieve the groups of {user}: {reason}")]
    GroupLookupFailed { user: String, reason: String },

    /// The user database itself could not be queried.
    #[error("user database lookup failed: {reason}")]
    LookupFailed { reason: String },
}

/// Authentication rejected or unavailable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The authentication service rejected the user.
    #[error("authentication failed for {user}")]
    Rejected { user: String },

    /// The authentication service could not be reached.
    #[error("authentication service unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Policy lookup outcomes that are not a granted decision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// No policy entry grants this identity the requested command.
    #[error("permission denied")]
    Denied,

    /// The policy store could not produce a decision at all.
    #[error("policy lookup failed: {reason}")]
    LookupFailed { reason: String },
}

/// Capability or securebit transition failure.
///
/// Each variant is fatal: the process may already be partially transitioned,
/// which is acceptable only because the caller terminates immediately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnforcementError {
    /// Could not raise CAP_SETPCAP in the effective set.
    #[error("unable to raise setpcap: {reason}")]
    CannotElevate { reason: String },

    /// Could not install the target capability sets.
    #[error("unable to install capability sets: {reason}")]
    CannotInstall { reason: String },

    /// Could not clear CAP_SETPCAP after the install.
    #[error("unable to revoke setpcap: {reason}")]
    CannotRevoke { reason: String },

    /// Could not activate and lock the no-root securebits.
    #[error("unable to lock securebits: {reason}")]
    CannotLockSecurebits { reason: String },
}

/// Environment policy violation detected while filtering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A variable the policy requires did not survive filtering.
    #[error("required environment variable missing: {name}")]
    MissingRequired { name: String },
}

/// PATH could not be secured.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// No directory of the inherited PATH passed the policy.
    #[error("no valid directories in PATH")]
    NoValidDirectories,
}

/// Command resolution or execution failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The requested command exceeds the system path length limit.
    #[error("path too long")]
    PathTooLong,

    /// No executable was found by canonicalization or the secured PATH.
    #[error("{command}: command not found")]
    NotFound { command: String },

    /// The process image could not be replaced.
    #[error("failed to execute {command}: {reason}")]
    ExecFailed { command: String, reason: String },
}

/// Combined error type for the binary's single fatal exit path.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Enforcement(#[from] EnforcementError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_message_is_terse() {
        assert_eq!(PolicyError::Denied.to_string(), "permission denied");
    }

    #[test]
    fn not_found_names_the_command() {
        let err = ExecError::NotFound {
            command: "myscript".to_string(),
        };
        assert_eq!(err.to_string(), "myscript: command not found");
    }

    #[test]
    fn umbrella_preserves_inner_display() {
        let err: Error = PathError::NoValidDirectories.into();
        assert_eq!(err.to_string(), "no valid directories in PATH");
    }
}
