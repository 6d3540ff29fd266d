//! Command-line interface for lazypar
//!
//! This module provides the main CLI structure and command handling.
//! It uses clap for argument parsing.

use anyhow::Result;

mod commands;
mod output;

pub use commands::Cli;
pub use output::Output;

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.quiet);
        let outcome = commands::execute(self.command, self.config.as_deref(), &output);
        if let Err(e) = &outcome {
            output.error(&format!("{e:#}"));
        }
        outcome
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // stderr keeps stdout clean for results
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
