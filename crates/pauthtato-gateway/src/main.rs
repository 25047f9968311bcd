//! Pauthtato - Hash-chained identity registration service.
//!
//! `serve` runs the HTTP API, `verify` audits the configured ledger, and
//! `config` prints the resolved configuration.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pauthtato_config::{Config, ShowFormat};
use pauthtato_gateway::config_bridge;
use pauthtato_ledger::verify_store;

/// Pauthtato - Hash-chained identity registration service
#[derive(Parser)]
#[command(name = "pauthtato")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (default: ./pauthtato.toml if present)
    #[arg(short, long, global = true, env = "PAUTHTATO_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the registration HTTP server
    Serve,

    /// Verify the integrity of the configured ledger
    Verify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration
    Config {
        /// Print as JSON instead of annotated TOML
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let resolved = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let mut log_config = config_bridge::to_log_config(&resolved.config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = pauthtato_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Serve => {
            pauthtato_gateway::run(&resolved.config).await?;
        },
        Commands::Verify { json } => {
            if !verify(&resolved.config, json).await? {
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Config { json } => {
            let format = if json {
                ShowFormat::Json
            } else {
                ShowFormat::Toml
            };
            println!("{}", resolved.show(format)?.trim_end());
        },
    }

    Ok(ExitCode::SUCCESS)
}

/// Print a verification report. Returns whether the chain is intact.
async fn verify(config: &Config, json: bool) -> Result<bool> {
    let store = config_bridge::build_store(config)
        .await
        .context("failed to open ledger store")?;
    let report = verify_store(store.as_ref())
        .await
        .context("failed to read ledger")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &report.violation {
            None => println!("Chain OK: {} blocks verified", report.blocks_verified),
            Some(v) => println!("Chain INVALID at index {}: {}\n  {}", v.index, v.kind, v.detail),
        }
    }

    Ok(report.valid)
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
    fn test_parse_verify_json() {
        let cli = Cli::try_parse_from(["pauthtato", "verify", "--json", "-c", "ledger.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Verify { json: true }));
        assert_eq!(cli.config, Some(PathBuf::from("ledger.toml")));
    }

    #[tokio::test]
    async fn test_verify_empty_memory_ledger() {
        assert!(verify(&Config::default(), true).await.unwrap());
    }
}
