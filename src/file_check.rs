//! Executability checks for resolved commands.
//!
//! The resolver only ever executes a regular file the effective identity can
//! run. The check is used on the canonicalized command for the direct-match
//! branch and on each candidate during the secured PATH search.

use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// True if `path` is a regular file the effective identity may execute.
///
/// Directories, devices, sockets, and unreadable paths are all "not
/// executable" here; the caller treats them as non-matches rather than
/// distinct errors, mirroring an `access(X_OK)` probe.
pub fn executable_file(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && is_executable(&metadata),
        Err(_) => false,
    }
}

/// Execute-permission check against the effective uid/gid.
fn is_executable(metadata: &Metadata) -> bool {
    let mode = metadata.permissions().mode();

    let euid = unsafe { libc::geteuid() };
    let egid = unsafe { libc::getegid() };

    if euid == metadata.uid() {
        return (mode & 0o100) != 0;
    }

    if egid == metadata.gid() {
        return (mode & 0o010) != 0;
    }

    if (mode & 0o001) != 0 {
        return true;
    }

    // Root executes anything with at least one execute bit set.
    euid == 0 && (mode & 0o111) != 0
}
