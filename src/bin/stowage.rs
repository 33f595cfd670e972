//! Stowage CLI Binary
//!
//! Command-line interface for content-addressed archival of file metadata.

use clap::Parser;
use std::process;
use stowage::cli::{Cli, CliContext};
use stowage::console::Console;

fn main() {
    let cli = Cli::parse();
    let console = Console::new(cli.debug);

    // Watch for CTRL+C and terminate cleanly
    if let Err(err) = ctrlc::set_handler(move || {
        console.log("stowage stopped");
        process::exit(0);
    }) {
        console.error("signal handler", err);
    }

    // Create CLI context
    let context = match CliContext::new(cli.debug) {
        Ok(context) => context,
        Err(err) => console.fatal(err),
    };

    // Execute command
    match context.execute(&cli.command) {
        Ok(output) => console.log(output),
        Err(err) => console.fatal(err),
    }
}
