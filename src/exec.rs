//! Command resolution and execution.
//!
//! Resolution is a two-branch decision, in strict priority order: the raw
//! command is canonicalized, and if the canonical target is an executable
//! regular file it is used directly; only otherwise is the secured PATH
//! searched directory-by-directory for the requested basename. The raw,
//! untrusted PATH is never consulted.
//!
//! Execution replaces the process image. On success nothing returns, so
//! [`PreparedExec::exec`] returns only the error type. The single designed
//! alternate path is the ENOEXEC fallback: an interpreter-less script is
//! re-invoked through the fixed system shell.

use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::unistd;

use crate::error::ExecError;
use crate::file_check::executable_file;

/// Shell used for the ENOEXEC fallback. Fixed; never taken from the
/// environment or the policy.
pub const FALLBACK_SHELL: &CStr = c"/bin/sh";

/// Resolve `raw` to the executable that will be run.
///
/// # Errors
///
/// - [`ExecError::PathTooLong`] if the raw command or its canonicalization
///   exceeds the system limit
/// - [`ExecError::NotFound`] if neither branch locates an executable
pub fn resolve(raw: &str, secured_path: &str) -> Result<PathBuf, ExecError> {
    if raw.len() >= libc::PATH_MAX as usize {
        return Err(ExecError::PathTooLong);
    }

    match std::fs::canonicalize(raw) {
        Ok(canonical) if executable_file(&canonical) => return Ok(canonical),
        Err(e) if e.raw_os_error() == Some(libc::ENAMETOOLONG) => {
            return Err(ExecError::PathTooLong);
        }
        // Not canonicalizable, or canonical but not executable: fall
        // through to the secured PATH search.
        _ => {}
    }

    search_secured_path(raw, secured_path).ok_or_else(|| ExecError::NotFound {
        command: raw.to_string(),
    })
}

/// Search the policy-approved PATH for an executable with the requested
/// basename. First match wins, mirroring shell PATH search over approved
/// directories only.
fn search_secured_path(raw: &str, secured_path: &str) -> Option<PathBuf> {
    let basename = Path::new(raw).file_name()?;
    secured_path
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(basename))
        .find(|candidate| executable_file(candidate))
}

/// A fully resolved command, the sanitized environment it will receive, and
/// the argument vector to hand over. The last artifact before the process
/// image is replaced.
#[derive(Debug, Clone)]
pub struct PreparedExec {
    /// Canonical path of the executable.
    pub command: PathBuf,
    /// argv[0] as the caller typed it.
    pub argv0: String,
    /// Arguments following the command.
    pub args: Vec<String>,
    /// Sanitized environment, already filtered and PATH-secured.
    pub env: Vec<(String, String)>,
}

impl PreparedExec {
    /// Replace the process image with the resolved command.
    ///
    /// Never returns on success. The returned [`ExecError`] is therefore the
    /// only value this function can produce.
    pub fn exec(self) -> ExecError {
        let display = self.command.display().to_string();

        let (path, argv, envp) = match self.build_vectors() {
            Ok(v) => v,
            Err(err) => return err,
        };

        let errno = match unistd::execve(&path, &argv, &envp) {
            Ok(never) => match never {},
            Err(errno) => errno,
        };

        if errno == Errno::ENOEXEC {
            // Interpreter-less script: re-invoke through the fixed shell
            // with the resolved command as its first argument, the original
            // argv carried whole after it.
            let nargv = fallback_argv(&path, &argv);
            let errno = match unistd::execve(FALLBACK_SHELL, &nargv, &envp) {
                Ok(never) => match never {},
                Err(errno) => errno,
            };
            return ExecError::ExecFailed {
                command: display,
                reason: errno.desc().to_string(),
            };
        }

        ExecError::ExecFailed {
            command: display,
            reason: errno.desc().to_string(),
        }
    }

    fn build_vectors(&self) -> Result<(CString, Vec<CString>, Vec<CString>), ExecError> {
        let path = cstring(&self.command.display().to_string(), &self.command)?;

        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(cstring(&self.argv0, &self.command)?);
        for arg in &self.args {
            argv.push(cstring(arg, &self.command)?);
        }

        let mut envp = Vec::with_capacity(self.env.len());
        for (key, value) in &self.env {
            envp.push(cstring(&format!("{key}={value}"), &self.command)?);
        }

        Ok((path, argv, envp))
    }
}

fn cstring(s: &str, command: &Path) -> Result<CString, ExecError> {
    CString::new(s).map_err(|_| ExecError::ExecFailed {
        command: command.display().to_string(),
        reason: "embedded NUL byte".to_string(),
    })
}

/// Build the shell-fallback argument vector:
/// `[sh, resolved-command, original argv...]`.
///
/// The original vector follows the two fixed entries in full, the caller's
/// argv[0] included, so the script sees the command name it was invoked
/// under. Sized for exactly those entries; the exec binding appends the
/// trailing NULL terminator when it hands the vector to the kernel.
pub fn fallback_argv(command: &CStr, argv: &[CString]) -> Vec<CString> {
    let mut nargv = Vec::with_capacity(argv.len() + 2);
    nargv.push(c"sh".to_owned());
    nargv.push(command.to_owned());
    nargv.extend_from_slice(argv);
    nargv
}
