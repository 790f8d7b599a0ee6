//! Configuration system for the padsync client.
//!
//! This crate provides configuration loading, saving, and default values
//! for the pad synchronization client. It includes:
//!
//! - Server connection settings (base URL, timeout, session cookie)
//! - Sync engine settings (same-tab mutation policy, placeholder title)
//! - Log level selection
//! - `${VAR}` environment variable substitution with an allowlist

pub mod config;
pub mod defaults;
pub mod error;
mod types;

pub use config::{Config, ServerConfig, SyncConfig, substitute_variables};
pub use error::ConfigError;
pub use types::{LogLevel, SameTabPolicy};
