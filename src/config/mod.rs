//! Runtime configuration.
//!
//! A small YAML file under the per-user application directory controls
//! console verbosity, notification targets, and the minimum log level.

mod paths;

pub use paths::AppPaths;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LogLevel;

fn default_level() -> String {
    LogLevel::Info.to_string()
}

/// On-disk configuration. Unspecified fields take their defaults, so a
/// partial file loads cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Opens the console's debug-gated writer.
    #[serde(default)]
    pub debug: bool,
    /// Notification targets, reserved for delivery integrations.
    #[serde(default)]
    pub notify: Vec<String>,
    /// Minimum level written to the log file.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debug: false,
            notify: Vec::new(),
            level: default_level(),
        }
    }
}

impl Config {
    /// Reads the YAML file at `path`. A missing file is an error; first-run
    /// bootstrapping belongs to [`AppPaths::config_file`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Writes the configuration as YAML at `path`.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let raw = serde_yaml::to_string(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Parsed minimum log level; unrecognized names fall back to INFO.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_name(&self.level)
    }
}
