//! QuorumVault CLI - multi-owner authorization from the command line
//!
//! # Usage
//!
//! ```bash
//! # Check the configured owner set
//! quorumvault --config vault.toml validate
//!
//! # Replay a script against an in-memory vault
//! quorumvault --owner 0x... --owner 0x... --threshold 2 run script.json --fund 1000
//!
//! # Settings from the environment
//! QUORUMVAULT__QUORUM__OWNERS=0x...,0x... QUORUMVAULT__QUORUM__THRESHOLD=2 quorumvault validate
//! ```

mod config;
mod display;
mod script;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quorumvault_core::AuthorizationEngine;
use quorumvault_types::{Address, Amount};

use crate::config::VaultSettings;

// =============================================================================
// CLI Arguments
// =============================================================================

/// QuorumVault - owner quorums for outbound transfers
#[derive(Parser, Debug)]
#[command(name = "quorumvault")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, global = true, env = "QUORUMVAULT_CONFIG")]
    config: Option<String>,

    /// Owner address; repeat for each owner. Replaces configured owners.
    #[arg(long = "owner", global = true)]
    owners: Vec<String>,

    /// Confirmations required to execute
    #[arg(long, global = true)]
    threshold: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "QUORUMVAULT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, global = true, env = "QUORUMVAULT_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the owner set and threshold
    Validate,

    /// Replay a JSON script of vault operations
    Run {
        /// Script file: a JSON array of operations
        script: PathBuf,

        /// Starting balance of the pool
        #[arg(long, default_value_t = 0)]
        fund: u64,

        /// Print the run as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check an address and print its checksummed form
    Address {
        /// `0x`-prefixed, 40 hex digits
        text: String,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = VaultSettings::load(cli.config.as_deref())?;

    // Override with CLI arguments
    if !cli.owners.is_empty() {
        settings.quorum.owners = cli.owners;
    }
    if let Some(threshold) = cli.threshold {
        settings.quorum.threshold = threshold;
    }
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }

    init_logging(&settings.logging)?;

    match cli.command {
        Commands::Validate => validate(&settings),
        Commands::Run { script, fund, json } => run(&settings, script, fund, json).await,
        Commands::Address { text } => address(&text),
    }
}

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    // stdout carries command output
    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true).with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

fn validate(settings: &VaultSettings) -> anyhow::Result<()> {
    let quorum = settings.quorum_config()?;

    display::section("Quorum");
    display::success(&format!(
        "{}-of-{} quorum is valid",
        quorum.threshold(),
        quorum.len()
    ));
    for (index, owner) in quorum.owners().iter().enumerate() {
        display::kv(&format!("owner {}", index), &owner.to_string());
    }
    Ok(())
}

async fn run(settings: &VaultSettings, path: PathBuf, fund: u64, json: bool) -> anyhow::Result<()> {
    let quorum = settings.quorum_config()?;
    let ops = script::load_script(&path)?;

    let (engine, transfer) = AuthorizationEngine::in_memory(quorum, settings.engine_options());
    engine.treasury().credit(Amount::new(fund))?;

    tracing::info!(
        steps = ops.len(),
        owners = engine.owners().len(),
        threshold = engine.threshold(),
        "Replaying script {}",
        path.display()
    );

    let run = script::replay(&engine, &transfer, ops).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        display::script_run(&run);
    }
    Ok(())
}

fn address(text: &str) -> anyhow::Result<()> {
    match Address::parse(text) {
        Ok(address) => {
            display::success(&address.to_checksum());
            Ok(())
        }
        Err(err) => {
            display::error(&err.to_string());
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "quorumvault",
            "--owner",
            "0x0000000000000000000000000000000000000001",
            "--owner",
            "0x0000000000000000000000000000000000000002",
            "--threshold",
            "2",
            "run",
            "script.json",
            "--fund",
            "500",
            "--json",
        ]);

        assert_eq!(cli.owners.len(), 2);
        assert_eq!(cli.threshold, Some(2));
        match cli.command {
            Commands::Run { script, fund, json } => {
                assert_eq!(script, PathBuf::from("script.json"));
                assert_eq!(fund, 500);
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_address_command() {
        assert!(address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_ok());
        assert!(address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD").is_err());
    }
}
