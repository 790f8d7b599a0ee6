//! Reading and writing `config.yaml`.
//!
//! `load` falls back to (and writes out) the defaults on first run;
//! `save_to` replaces the file atomically.

use super::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load `config.yaml` from [`Config::config_dir`], writing the defaults
    /// there first if the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            return Self::load_from(&path);
        }

        log::info!("No config at {:?}; writing defaults", path);
        let config = Self::default();
        config.save_to(&path).inspect_err(|e| {
            log::error!("Could not write default config to {:?}: {}", path, e);
        })?;
        Ok(config)
    }

    /// Load configuration from an explicit file.
    ///
    /// `${VAR}` references are substituted before parsing; see
    /// [`crate::substitute_variables`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading config from {:?}", path);

        // The file may carry a session cookie, so warn when others can read it.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o044 != 0 {
                    log::warn!(
                        "Config file {:?} is readable by group or others (mode {:04o}). \
                         Run: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path,
                    );
                }
            }
        }

        let contents = fs::read_to_string(path)?;
        let allow_all = super::env_vars::pre_scan_allow_all_env_vars(&contents);
        let contents = super::env_vars::substitute_variables_with_allowlist(&contents, allow_all);

        // An empty file is a valid, all-defaults config.
        let config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml_ng::from_str(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Save to [`Config::config_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save to `path`, creating parent directories as needed. The YAML goes
    /// to a sibling `.yaml.tmp` first and is renamed into place.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let staged = path.with_extension("yaml.tmp");
        fs::write(&staged, serde_yaml_ng::to_string(self)?)?;
        fs::rename(&staged, path)?;
        log::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// `<config dir>/config.yaml`
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// `~/.config/padsync` on Unix (macOS included), `%APPDATA%\padsync` on
    /// Windows. Falls back to the working directory when neither resolves.
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        let base = dirs::config_dir();
        #[cfg(not(target_os = "windows"))]
        let base = dirs::home_dir().map(|home| home.join(".config"));

        base.map_or_else(|| PathBuf::from("."), |dir| dir.join("padsync"))
    }
}
