//! Leveled file logging.
//!
//! Events are written to an append-only file, one line per event, shaped
//! `LEVEL   [timestamp]: message` with the level name padded to seven
//! columns and an ISO 8601 timestamp carrying the zone offset. The
//! minimum level comes from configuration.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;

use chrono::{Local, SecondsFormat};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, Registry};

use crate::error::LogError;

/// Severity levels in ascending order. `Fatal` ranks above `Error` for
/// filtering; process termination itself is the console's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parses a level name, case-insensitively and ignoring surrounding
    /// whitespace. Unrecognized names map to `Info`.
    pub fn from_name(name: &str) -> LogLevel {
        match name.trim().to_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARNING" => LogLevel::Warning,
            "ERROR" => LogLevel::Error,
            "FATAL" => LogLevel::Fatal,
            _ => LogLevel::Info,
        }
    }

    /// Name as written in log lines.
    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Subscriber filter admitting this level and above. `tracing` has no
    /// fatal level, so `Fatal` admits only error events.
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Fatal => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event formatter producing the single-line log shape.
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = match *event.metadata().level() {
            Level::ERROR => "ERROR",
            Level::WARN => "WARNING",
            Level::INFO => "INFO",
            Level::DEBUG | Level::TRACE => "DEBUG",
        };
        let stamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        write!(writer, "{level:<7} [{stamp}]: ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global subscriber writing to `log_file`, which is opened
/// append-only and created on first use.
pub fn init(level: LogLevel, log_file: &Path) -> Result<(), LogError> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    Registry::default()
        .with(level.to_filter())
        .with(
            tracing_fmt::layer()
                .event_format(LineFormat)
                .with_writer(file),
        )
        .try_init()
        .map_err(|err| LogError::Subscriber(err.to_string()))
}
