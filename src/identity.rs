//! Executor identity resolution.
//!
//! Maps the invoking uid to a username and group-membership list via the
//! system user database. The resulting [`Identity`] is built once per
//! invocation and never mutated afterwards; everything downstream (policy
//! matching, rights reporting) reads it immutably.

use std::ffi::CString;

use nix::unistd::{getgrouplist, Gid, Group, Uid, User};

use crate::error::IdentityError;

/// The resolved identity of the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Login name of the executor.
    pub username: String,
    /// Effective uid the tool was invoked under.
    pub euid: Uid,
    /// Primary group id.
    pub gid: Gid,
    /// All group memberships, primary group included.
    pub groups: Vec<Gid>,
    /// Names of `groups`, in the same order, for name-based policy subjects.
    /// Gids with no database entry are skipped.
    pub group_names: Vec<String>,
}

impl Identity {
    /// True if the identity belongs to the named group.
    pub fn in_group(&self, name: &str) -> bool {
        self.group_names.iter().any(|g| g == name)
    }
}

/// Resolve the executor identity for `uid` from the system user database.
///
/// # Errors
///
/// - [`IdentityError::UnknownUid`] if the uid has no passwd entry
/// - [`IdentityError::GroupLookupFailed`] if memberships cannot be enumerated
/// - [`IdentityError::LookupFailed`] if the database query itself fails
pub fn resolve_identity(uid: Uid) -> Result<Identity, IdentityError> {
    let user = User::from_uid(uid)
        .map_err(|e| IdentityError::LookupFailed {
            reason: e.to_string(),
        })?
        .ok_or(IdentityError::UnknownUid { uid: uid.as_raw() })?;

    let cname = CString::new(user.name.as_str()).map_err(|_| IdentityError::LookupFailed {
        reason: "username contains an interior NUL".to_string(),
    })?;

    let groups =
        getgrouplist(&cname, user.gid).map_err(|e| IdentityError::GroupLookupFailed {
            user: user.name.clone(),
            reason: e.to_string(),
        })?;

    let group_names = groups
        .iter()
        .filter_map(|gid| Group::from_gid(*gid).ok().flatten())
        .map(|g| g.name)
        .collect();

    Ok(Identity {
        username: user.name,
        euid: uid,
        gid: user.gid,
        groups,
        group_names,
    })
}
