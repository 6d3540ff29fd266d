//! Command implementations for the lazypar CLI
//!
//! Each command lives in its own module. The argument structs sit next to
//! the code that consumes them.

use crate::cli::Output;
use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod config;
pub mod run;
pub mod tasks;

#[derive(Parser)]
#[command(name = "lazypar")]
#[command(about = "Ordered parallel map over worker processes or threads")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress and informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use this configuration file instead of lazypar.toml/lazypar.json
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a built-in task over a list of inputs
    Run(run::RunArgs),
    /// List the built-in tasks
    Tasks,
    /// Inspect the effective configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

pub(crate) fn execute(command: Commands, config_path: Option<&str>, output: &Output) -> Result<()> {
    match command {
        Commands::Run(args) => run::execute(args, config_path, output),
        Commands::Tasks => tasks::execute(output),
        Commands::Config(cmd) => config::execute(cmd, config_path, output),
    }
}
