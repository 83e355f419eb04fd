//! Rights reporting for `--info`.
//!
//! Renders a resolved [`Decision`] for display. Pure and read-only: this
//! path never reaches the enforcer, the environment filter, or the
//! executor, so querying rights leaves the process capability state
//! untouched.

use crate::identity::Identity;
use crate::policy::Decision;

/// Render the rights a decision grants to `identity`.
///
/// Works for the caller's own best match and for an explicitly requested
/// role alike; both arrive here as a `Decision` from the matcher.
pub fn render(identity: &Identity, decision: &Decision) -> String {
    match decision {
        Decision::Denied => format!("{} has no matching rights", identity.username),
        Decision::Granted(grant) => {
            let mut lines = Vec::new();
            lines.push(format!("Rights of {}:", identity.username));
            lines.push(format!("  role: {}", grant.role));
            lines.push(format!(
                "  capabilities: {}",
                grant.capabilities.describe()
            ));
            lines.push(format!(
                "  no-root: {}",
                if grant.options.no_root {
                    "enforced"
                } else {
                    "disabled"
                }
            ));
            lines.join("\n")
        }
    }
}
