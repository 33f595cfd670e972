//! Per-user application directory layout.
//!
//! All state lives under one root: the key-value database, the YAML
//! configuration, and the log directory.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::config::Config;
use crate::error::ConfigError;

const DATABASE_NAME: &str = "filemeta.db";
const CONFIG_NAME: &str = "config.yaml";
const LOG_DIR_NAME: &str = "logs";
const LOG_FILE_NAME: &str = "events.log";

/// Resolved application root: `~/.stowage` on Unix-like systems, a
/// `Stowage` folder under roaming app data on Windows. An explicit
/// object threaded through startup, not a process-wide cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Locates the per-user root for the current platform, creating it on
    /// first use.
    pub fn resolve() -> Result<AppPaths, ConfigError> {
        let base = BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
        #[cfg(windows)]
        let root = base.data_dir().join("Stowage");
        #[cfg(not(windows))]
        let root = base.home_dir().join(".stowage");
        AppPaths::at(root)
    }

    /// Uses an explicit root, creating it as needed. Tests point this at
    /// scratch directories.
    pub fn at<P: Into<PathBuf>>(root: P) -> Result<AppPaths, ConfigError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(AppPaths { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the key-value database.
    pub fn database(&self) -> PathBuf {
        self.root.join(DATABASE_NAME)
    }

    /// Location of the YAML configuration. The default config is written
    /// on first run; an existing file is never overwritten.
    pub fn config_file(&self) -> Result<PathBuf, ConfigError> {
        let path = self.root.join(CONFIG_NAME);
        if !path.is_file() {
            Config::default().dump(&path)?;
        }
        Ok(path)
    }

    /// Location of the append-only log file, creating the log directory.
    pub fn log_file(&self) -> Result<PathBuf, ConfigError> {
        let dir = self.root.join(LOG_DIR_NAME);
        fs::create_dir_all(&dir)?;
        Ok(dir.join(LOG_FILE_NAME))
    }
}
