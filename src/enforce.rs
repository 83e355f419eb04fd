//! Capability enforcement.
//!
//! Applies a granted [`CapabilitySet`] to the live process before exec. The
//! rewrite of capability state requires CAP_SETPCAP in the effective set;
//! that elevation is modeled as a scoped guard so it is held for the
//! minimum duration and cannot be left open on any exit path. Nothing
//! fallible beyond the install itself runs while the bracket is held.
//!
//! Every failure here is fatal to the invocation: the process may already be
//! partially transitioned, which is acceptable only because the caller
//! terminates immediately instead of continuing with uncertain privilege.

use capctl::prctl::{self, Secbits};
use capctl::{ambient, bounding, Cap, CapState};

use crate::capset::CapabilitySet;
use crate::error::{EnforcementError, Error, PolicyError};
use crate::policy::{Decision, Grant};

/// Scoped CAP_SETPCAP elevation.
///
/// Acquiring raises the bit in the effective set; [`release`] clears it and
/// reports failure. `Drop` is the backstop for early-error paths so the
/// bracket can never stay open, but the happy path always releases
/// explicitly to surface `CannotRevoke`.
///
/// [`release`]: SetpcapGuard::release
#[derive(Debug)]
pub struct SetpcapGuard {
    armed: bool,
}

impl SetpcapGuard {
    /// Raise CAP_SETPCAP in the effective set.
    pub fn acquire() -> Result<Self, EnforcementError> {
        setpcap_effective(true).map_err(|e| EnforcementError::CannotElevate {
            reason: e.to_string(),
        })?;
        Ok(Self { armed: true })
    }

    /// Clear CAP_SETPCAP again, consuming the guard.
    pub fn release(mut self) -> Result<(), EnforcementError> {
        self.armed = false;
        setpcap_effective(false).map_err(|e| EnforcementError::CannotRevoke {
            reason: e.to_string(),
        })
    }
}

impl Drop for SetpcapGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = setpcap_effective(false);
        }
    }
}

fn setpcap_effective(enable: bool) -> Result<(), capctl::Error> {
    let mut state = CapState::get_current()?;
    state.effective.set_state(Cap::SETPCAP, enable);
    state.set_current()
}

/// Install the granted triple onto the current process.
///
/// Touches only the inheritable, ambient, and bounding sets. The tool's own
/// permitted and effective sets are left alone, so nothing of its ambient
/// privilege leaks into the grant.
fn install(caps: &CapabilitySet) -> Result<(), EnforcementError> {
    let target = caps.normalize();
    let cannot_install = |e: capctl::Error| EnforcementError::CannotInstall {
        reason: e.to_string(),
    };

    // Bounding first: drop every currently-set capability the grant does
    // not retain. Requires the setpcap bracket to be held.
    for cap in bounding::probe().iter() {
        if !target.bounding.has(cap) {
            bounding::drop(cap).map_err(cannot_install)?;
        }
    }

    // Inheritable in a single state write.
    let mut state = CapState::get_current().map_err(cannot_install)?;
    state.inheritable = target.inheritable;
    state.set_current().map_err(cannot_install)?;

    // Ambient last: start from a clean set, then raise exactly the grant.
    ambient::clear().map_err(cannot_install)?;
    for cap in target.ambient.iter() {
        ambient::raise(cap).map_err(cannot_install)?;
    }

    Ok(())
}

/// Securebits that keep root-equivalent privilege unrecoverable, setuid
/// binaries in the exec chain included. The locked bits make the setting
/// permanent for the process and its descendants.
fn no_root_bits() -> Secbits {
    Secbits::NOROOT
        | Secbits::NOROOT_LOCKED
        | Secbits::NO_SETUID_FIXUP
        | Secbits::NO_SETUID_FIXUP_LOCKED
        | Secbits::KEEP_CAPS_LOCKED
}

/// Activate and lock the no-root securebits.
///
/// `PR_SET_SECUREBITS` itself needs CAP_SETPCAP effective, so this runs
/// under its own minimal bracket, after the install bracket has closed.
fn lock_no_root() -> Result<(), EnforcementError> {
    let guard = SetpcapGuard::acquire()?;
    let locked = prctl::set_securebits(no_root_bits()).map_err(|e| {
        EnforcementError::CannotLockSecurebits {
            reason: e.to_string(),
        }
    });
    let released = guard.release();
    locked?;
    released
}

/// Apply a granted capability set to the current process.
///
/// Protocol, in strict order, each step fatal: elevate setpcap, install the
/// triple, revoke setpcap, then lock securebits when `no_root` is set.
pub fn apply(caps: &CapabilitySet, no_root: bool) -> Result<(), EnforcementError> {
    let guard = SetpcapGuard::acquire()?;
    let installed = install(caps);
    let released = guard.release();
    installed?;
    released?;

    if no_root {
        lock_no_root()?;
    }

    Ok(())
}

/// The enforcement seam consumed by the pipeline; [`SysEnforcer`] is the
/// real implementation, tests substitute a recorder.
pub trait Enforcer {
    /// Apply the decision's capability triple and no-root option.
    fn apply(&mut self, caps: &CapabilitySet, no_root: bool) -> Result<(), EnforcementError>;
}

/// Enforcer backed by the live process capability state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysEnforcer;

impl Enforcer for SysEnforcer {
    fn apply(&mut self, caps: &CapabilitySet, no_root: bool) -> Result<(), EnforcementError> {
        apply(caps, no_root)
    }
}

/// Enforce a decision, failing closed.
///
/// A denied decision returns [`PolicyError::Denied`] without ever touching
/// the enforcer; a granted one applies exactly the capability triple and
/// no-root flag the grant carries, then hands the grant back for the
/// environment and path stages.
pub fn enforce_decision<'a>(
    decision: &'a Decision,
    enforcer: &mut dyn Enforcer,
) -> Result<&'a Grant, Error> {
    match decision {
        Decision::Denied => Err(PolicyError::Denied.into()),
        Decision::Granted(grant) => {
            enforcer.apply(&grant.capabilities, grant.options.no_root)?;
            Ok(grant)
        }
    }
}
