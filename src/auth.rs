//! Authentication seam.
//!
//! Validating the invoking identity is the job of an external PAM-class
//! service; this crate only defines the interface it plugs into. The tool
//! authenticates before any policy lookup, and a rejection is fatal.

use crate::error::AuthError;

/// Validates that the named user is who they claim to be.
///
/// Implementations are expected to be bounded, synchronous calls (a PAM
/// conversation, an agent socket, ...). Returning `Err` aborts the
/// invocation before any policy state is consulted.
pub trait Authenticator {
    /// Authenticate `username`, failing closed on any doubt.
    fn authenticate(&self, username: &str) -> Result<(), AuthError>;
}

/// Pass-through authenticator for deployments where the real check happens
/// out of process (or in tests). This is the stub the PAM-backed
/// implementation replaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustingAuthenticator;

impl Authenticator for TrustingAuthenticator {
    fn authenticate(&self, _username: &str) -> Result<(), AuthError> {
        Ok(())
    }
}
