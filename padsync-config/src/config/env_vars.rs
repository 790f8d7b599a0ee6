//! `${VAR}` expansion in the raw config text.
//!
//! The config usually carries the session cookie, so by default only a short
//! list of path/user variables plus anything prefixed `PADSYNC_` or `LC_` is
//! expanded. Everything else stays as literal text.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `${NAME}`, `${NAME:-fallback}`, and the escaped form `$${NAME}`.
///
/// Group 1 is the escaping `$`, group 2 the name, group 3 the fallback
/// (where `\}` stands for a literal brace).
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\$)?\{([A-Za-z_][A-Za-z0-9_]*)(?::-((?:[^}\\]|\\.)*))?\}")
        .expect("config variable pattern is a compile-time constant and must be valid")
});

/// Top-level `allow_all_env_vars: true`, matched before the YAML is parsed.
static ALLOW_ALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^allow_all_env_vars:\s*true\s*$")
        .expect("allow_all_env_vars pattern is a compile-time constant and must be valid")
});

/// Variables expanded without `allow_all_env_vars`.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "HOME",
    "USER",
    "USERNAME",
    "USERPROFILE",
    "XDG_CONFIG_HOME",
    "XDG_RUNTIME_DIR",
    "TMPDIR",
    "TEMP",
    "APPDATA",
    "HOSTNAME",
];

/// Whether `name` may be expanded while the allowlist is in force.
pub fn is_env_var_allowed(name: &str) -> bool {
    name.starts_with("PADSYNC_") || name.starts_with("LC_") || ALLOWED_ENV_VARS.contains(&name)
}

/// Expand allow-listed references in `input`.
///
/// An unset variable falls back to its `:-` default, or is left untouched
/// when it has none. `$${NAME}` always yields the literal `${NAME}`.
pub fn substitute_variables(input: &str) -> String {
    substitute_variables_with_allowlist(input, false)
}

/// Like [`substitute_variables`], expanding every variable when `allow_all`.
pub fn substitute_variables_with_allowlist(input: &str, allow_all: bool) -> String {
    REFERENCE
        .replace_all(input, |caps: &Captures| expand(caps, allow_all))
        .into_owned()
}

fn expand(caps: &Captures, allow_all: bool) -> String {
    let whole = &caps[0];
    if caps.get(1).is_some() {
        return whole[1..].to_string();
    }

    let name = &caps[2];
    if !allow_all && !is_env_var_allowed(name) {
        log::warn!(
            "Not expanding ${{{name}}} in config: variable is not allowlisted \
             (set allow_all_env_vars: true to expand it)"
        );
        return whole.to_string();
    }

    if let Ok(value) = std::env::var(name) {
        return value;
    }
    match caps.get(3) {
        Some(fallback) => fallback.as_str().replace("\\}", "}"),
        None => whole.to_string(),
    }
}

/// Whether the raw config opts into expanding every variable.
pub(crate) fn pre_scan_allow_all_env_vars(raw_yaml: &str) -> bool {
    ALLOW_ALL.is_match(raw_yaml)
}
