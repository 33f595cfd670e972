//! Command-line interface.
//!
//! Declares the command surface and the [`CliContext`] that wires the
//! startup sequence together: per-user application paths, configuration
//! (bootstrapped on first run), the file logger, and the content store.
//! Every command executes synchronously and renders to a single output
//! string.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{AppPaths, Config};
use crate::console::Console;
use crate::entry::Entry;
use crate::error::{ServiceError, StoreError};
use crate::image::ImageMeta;
use crate::logging;
use crate::service::Service;
use crate::store::{MetaStore, StoredRecord};

/// Stowage CLI - content-addressed archival of file metadata
#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "Content-addressed archival of file metadata", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print debug detail to the console regardless of configuration
    #[arg(long)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk a directory tree and store metadata for every visible file
    Backup {
        /// Root directory to archive
        directory: PathBuf,
    },
    /// Resolve one path and print its populated metadata
    Inspect {
        /// File or directory to describe
        path: PathBuf,
    },
    /// List stored signature keys
    Keys {
        /// Most keys to return
        #[arg(long, default_value = "100")]
        limit: usize,
    },
    /// Fetch stored records by signature key
    Show {
        /// Signature keys to fetch
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Count the visible files under a directory by mimetype
    Survey {
        /// Root directory to examine
        directory: PathBuf,
    },
}

/// CLI context owning the assembled service and the console.
pub struct CliContext {
    service: Service,
    console: Console,
}

impl CliContext {
    /// Runs the startup sequence against the per-user application
    /// directories. Nothing here can be bypassed, so any failure is
    /// unrecoverable for the process.
    pub fn new(debug: bool) -> Result<CliContext, ServiceError> {
        let paths = AppPaths::resolve()?;
        let config = Config::load(&paths.config_file()?)?;
        logging::init(config.log_level(), &paths.log_file()?)?;

        let service = Service::assemble(MetaStore::open(paths.database())?);
        let console = Console::new(debug || config.debug);

        Ok(CliContext { service, console })
    }

    /// Builds a context from explicit parts.
    pub fn with_service(service: Service, console: Console) -> CliContext {
        CliContext { service, console }
    }

    pub fn console(&self) -> Console {
        self.console
    }

    /// Execute a CLI command.
    pub fn execute(&self, command: &Commands) -> Result<String, ServiceError> {
        match command {
            Commands::Backup { directory } => {
                let report = self.service.backup(directory)?;
                Ok(report.to_string())
            }
            Commands::Inspect { path } => self.inspect(path),
            Commands::Keys { limit } => Ok(self.service.keys(*limit)?.join("\n")),
            Commands::Show { keys } => {
                let mut shown = Vec::new();
                for key in keys {
                    match self.service.fetch(key) {
                        Ok(record) => shown.push(pretty(&record)?),
                        Err(err) => self.console.error("store lookup", err),
                    }
                }
                Ok(shown.join("\n\n"))
            }
            Commands::Survey { directory } => {
                let counts = self.service.survey(directory)?;
                let lines: Vec<String> = counts
                    .into_iter()
                    .map(|(mimetype, count)| format!("{count}: {mimetype}"))
                    .collect();
                Ok(lines.join("\n"))
            }
        }
    }

    fn inspect(&self, path: &Path) -> Result<String, ServiceError> {
        match Entry::new(path)? {
            Entry::File(file) => {
                let mut record = match ImageMeta::convert(file, self.service.inspector()) {
                    Ok(image) => StoredRecord::Image(image),
                    Err(file) => StoredRecord::File(file),
                };

                let warnings = record.populate(self.service.inspector());
                for (field, reason) in warnings.iter() {
                    self.console.info(format!("{field} unavailable: {reason}"));
                }

                pretty(&record)
            }
            Entry::Dir(mut dir) => {
                let warnings = dir.populate();
                for (field, reason) in warnings.iter() {
                    self.console.info(format!("{field} unavailable: {reason}"));
                }

                pretty(&dir)
            }
        }
    }
}

fn pretty<T: Serialize>(value: &T) -> Result<String, ServiceError> {
    Ok(serde_json::to_string_pretty(value).map_err(StoreError::Encoding)?)
}
