//! Configuration command implementations
//!
//! Commands for inspecting the layered lazypar configuration.

use crate::cli::Output;
use crate::config::LazyparConfig;
use anyhow::Result;
use clap::{Subcommand, ValueEnum};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
    /// Load the configuration and check the pool settings resolve
    Validate,
}

/// Execute config commands
pub fn execute(cmd: ConfigCommands, config_path: Option<&str>, output: &Output) -> Result<()> {
    let config = LazyparConfig::load_with_custom_config(config_path)?;
    match cmd {
        ConfigCommands::Show { json } => show(&config, json),
        ConfigCommands::Validate => validate(&config, output),
    }
}

fn show(config: &LazyparConfig, json: bool) -> Result<()> {
    let rendered = if json {
        serde_json::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(config)?
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn validate(config: &LazyparConfig, output: &Output) -> Result<()> {
    let resolved = config.pool.resolve(num_cpus::get)?;

    output.success("Configuration is valid");
    output.table_row("Pool mode", &resolved.mode.to_string());
    output.table_row("Workers", &resolved.workers.to_string());
    if let Some(style) = config.progress.style.to_possible_value() {
        output.table_row("Progress", style.get_name());
    }
    output.info(&format!(
        "User configuration: {}",
        LazyparConfig::user_config_path()
    ));
    Ok(())
}
