//! Errors from reading, parsing and validating the config file.

use thiserror::Error;

/// Why a config could not be loaded or saved.
///
/// ```rust,no_run
/// use padsync_config::{Config, ConfigError};
///
/// match Config::load() {
///     Ok(config) => println!("server: {}", config.server.base_url),
///     Err(ConfigError::Validation(msg)) => eprintln!("fix your config: {msg}"),
///     Err(other) => eprintln!("{other}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid YAML: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// A value parsed but is not usable; the message names the field.
    #[error("invalid config: {0}")]
    Validation(String),
}
