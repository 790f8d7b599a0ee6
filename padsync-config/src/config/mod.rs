//! The `Config` struct and its sections.
//!
//! Sub-modules:
//! - `env_vars`: `${VAR}` substitution with an allowlist
//! - `persistence`: load/save and path helpers

mod env_vars;
mod persistence;

pub use env_vars::{
    ALLOWED_ENV_VARS, is_env_var_allowed, substitute_variables,
    substitute_variables_with_allowlist,
};

use crate::error::ConfigError;
use crate::types::{LogLevel, SameTabPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the pad API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Origin of the pad server, e.g. `https://pad.example.com`.
    /// Plain `http` is accepted only for loopback hosts.
    #[serde(default = "crate::defaults::base_url")]
    pub base_url: String,

    /// Global timeout for each HTTP request, in seconds. `0` disables it.
    #[serde(default = "crate::defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Value sent verbatim in the `Cookie` header (typically `session=...`).
    /// Use `${PADSYNC_SESSION}` to keep it out of the file.
    #[serde(default)]
    pub session_cookie: Option<String>,

    /// `User-Agent` header for every request
    #[serde(default = "crate::defaults::user_agent")]
    pub user_agent: String,
}

impl ServerConfig {
    /// The transport timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: crate::defaults::base_url(),
            request_timeout_secs: crate::defaults::request_timeout_secs(),
            session_cookie: None,
            user_agent: crate::defaults::user_agent(),
        }
    }
}

/// Settings for the optimistic sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How to handle a mutation on a tab that already has one in flight
    #[serde(default = "crate::defaults::same_tab_policy")]
    pub same_tab_policy: SameTabPolicy,

    /// Title shown on the placeholder tab while a create is in flight
    #[serde(default = "crate::defaults::new_pad_title")]
    pub new_pad_title: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            same_tab_policy: crate::defaults::same_tab_policy(),
            new_pad_title: crate::defaults::new_pad_title(),
        }
    }
}

/// Top-level padsync configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Log file verbosity
    #[serde(default)]
    pub log_level: LogLevel,

    /// Resolve every `${VAR}` in the config file, not just allow-listed ones
    #[serde(default = "crate::defaults::bool_false")]
    pub allow_all_env_vars: bool,
}

impl Config {
    /// Check field values that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.base_url must not be empty".to_string(),
            ));
        }
        if self.sync.new_pad_title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sync.new_pad_title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
