//! Environment variable policy.
//!
//! The inherited environment is filtered default-deny before execution:
//! variables on the keep list pass through unchanged, variables on the check
//! list pass only if their value survives a safety predicate, and everything
//! else is dropped. The filter runs exactly once over an explicitly passed
//! environment snapshot, never over ambient global state, and preserves the
//! snapshot's order.

use std::collections::HashSet;

use crate::error::FilterError;

/// Which inherited variables reach the executed command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvPolicy {
    /// Variables passed through unconditionally.
    keep: HashSet<String>,

    /// Variables passed through only if the value passes [`check_value`].
    check: HashSet<String>,

    /// Variables that must be present in the filtered result. A granted
    /// command never runs with an incomplete environment; a missing entry
    /// aborts instead.
    required: Vec<String>,
}

impl EnvPolicy {
    /// Policy that drops every inherited variable.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Add names to the unconditional keep list.
    pub fn keep<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add names to the checked list.
    pub fn check<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check.extend(names.into_iter().map(Into::into));
        self
    }

    /// Mark names as mandatory in the filtered result.
    pub fn require<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Filter an environment snapshot against this policy.
    ///
    /// Single pass; surviving variables keep the snapshot's order, so the
    /// result is reproducible for a given input.
    ///
    /// # Errors
    ///
    /// [`FilterError::MissingRequired`] if a mandatory variable did not
    /// survive.
    pub fn filter<I>(&self, env: I) -> Result<Vec<(String, String)>, FilterError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let kept: Vec<(String, String)> = env
            .into_iter()
            .filter(|(key, value)| {
                self.keep.contains(key)
                    || (self.check.contains(key) && check_value(key, value))
            })
            .collect();

        for name in &self.required {
            if !kept.iter().any(|(key, _)| key == name) {
                return Err(FilterError::MissingRequired { name: name.clone() });
            }
        }

        Ok(kept)
    }
}

/// Safety predicate for checked variables.
///
/// Rejects empty keys or values, values carrying path-like injection
/// characters (`/`, `%`), and unbounded lengths. `TZ` gets the stricter
/// timezone validation.
pub fn check_value(key: &str, value: &str) -> bool {
    if key.is_empty() || value.is_empty() {
        return false;
    }
    if value.len() >= libc::PATH_MAX as usize {
        return false;
    }
    match key {
        "TZ" => tz_is_safe(value),
        _ => !value.contains(['/', '%']),
    }
}

/// Validate a TZ value the way tzcode will interpret it.
///
/// A leading `:` marks a path; fully-qualified values and `..` elements are
/// rejected so TZ cannot be used to read arbitrary files, and the value must
/// be printable and bounded.
fn tz_is_safe(value: &str) -> bool {
    let value = value.strip_prefix(':').unwrap_or(value);

    if value.starts_with('/') {
        return false;
    }

    if !value.chars().all(|c| c.is_ascii_graphic()) {
        return false;
    }

    // No `..` path element anywhere in the value.
    value.split('/').all(|element| element != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_deny_drops_everything() {
        let policy = EnvPolicy::deny_all();
        let out = policy
            .filter(env(&[("HOME", "/home/a"), ("LD_PRELOAD", "/evil.so")]))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn keep_passes_unconditionally() {
        let policy = EnvPolicy::deny_all().keep(["HOME"]);
        let out = policy.filter(env(&[("HOME", "/home/a")])).unwrap();
        assert_eq!(out, env(&[("HOME", "/home/a")]));
    }

    #[test]
    fn check_applies_the_safety_predicate() {
        let policy = EnvPolicy::deny_all().check(["COLORTERM"]);
        let ok = policy.filter(env(&[("COLORTERM", "truecolor")])).unwrap();
        assert_eq!(ok.len(), 1);

        // A value with a path separator fails the predicate.
        let bad = policy
            .filter(env(&[("COLORTERM", "../../etc/passwd")]))
            .unwrap();
        assert!(bad.is_empty());

        let pct = policy.filter(env(&[("COLORTERM", "a%n")])).unwrap();
        assert!(pct.is_empty());
    }

    #[test]
    fn order_follows_the_snapshot() {
        let policy = EnvPolicy::deny_all().keep(["B", "A", "C"]);
        let out = policy
            .filter(env(&[("A", "1"), ("B", "2"), ("X", "3"), ("C", "4")]))
            .unwrap();
        assert_eq!(out, env(&[("A", "1"), ("B", "2"), ("C", "4")]));
    }

    #[test]
    fn filter_is_idempotent() {
        let policy = EnvPolicy::deny_all()
            .keep(["HOME", "USER"])
            .check(["TZ", "COLORTERM"]);
        let input = env(&[
            ("HOME", "/home/a"),
            ("TZ", "Europe/Paris"),
            ("LD_PRELOAD", "/evil.so"),
            ("COLORTERM", "truecolor"),
        ]);
        let once = policy.filter(input).unwrap();
        let twice = policy.filter(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_required_variable_aborts() {
        let policy = EnvPolicy::deny_all().keep(["HOME"]).require(["HOME"]);
        let err = policy.filter(env(&[("USER", "a")])).unwrap_err();
        assert_eq!(
            err,
            FilterError::MissingRequired {
                name: "HOME".to_string()
            }
        );
    }

    #[test]
    fn tz_relative_zone_is_safe() {
        assert!(check_value("TZ", "Europe/Paris"));
        assert!(check_value("TZ", ":America/New_York"));
    }

    #[test]
    fn tz_path_escapes_are_rejected() {
        assert!(!check_value("TZ", "/etc/passwd"));
        assert!(!check_value("TZ", ":/etc/passwd"));
        assert!(!check_value("TZ", "../../etc/passwd"));
        assert!(!check_value("TZ", "Europe/../../../etc/passwd"));
        assert!(!check_value("TZ", "Bad Zone"));
    }

    #[test]
    fn oversized_values_are_rejected() {
        let huge = "a".repeat(libc::PATH_MAX as usize);
        assert!(!check_value("COLORTERM", &huge));
    }
}
