//! Console output writers.
//!
//! Four write paths: unconditional lines, debug-gated info lines, error
//! lines carrying a context code, and fatal lines that terminate the
//! process. Library code reports through [`tracing`]; the console is the
//! binary's surface.

use std::fmt;
use std::process;

/// Stdout/stderr writer pair with a debug gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    debug: bool,
}

impl Console {
    pub fn new(debug: bool) -> Console {
        Console { debug }
    }

    /// True when the info writer is enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Writes a line unconditionally.
    pub fn log(&self, message: impl fmt::Display) {
        println!("{message}");
    }

    /// Writes a line only when the debug gate is open.
    pub fn info(&self, message: impl fmt::Display) {
        if self.debug {
            println!("{message}");
        }
    }

    /// Writes an error line prefixed with its context code.
    pub fn error(&self, code: &str, err: impl fmt::Display) {
        eprintln!("ERROR ({code}): {err}");
    }

    /// Writes a fatal line and exits nonzero.
    pub fn fatal(&self, message: impl fmt::Display) -> ! {
        eprintln!("FATAL: {message}");
        process::exit(1);
    }
}
