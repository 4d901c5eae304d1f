// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Hive Agent CLI
//!
//! The `hive` binary lets an agent take part in a Hive collective that shares
//! nothing but an object store (a GitHub repository or a plain directory).
//!
//! ## Architecture
//!
//! Every command runs in-process against the store:
//!
//! - **Presence**: each agent overwrites its own heartbeat record
//! - **Leadership**: the smallest normalized id among live agents leads
//! - **UI hosting**: `hive ui cycle` runs periodically on every node; only the
//!   leader keeps a detached `hive ui serve` child alive
//!
//! ## Commands
//!
//! - `hive presence ping|list` - Heartbeats and the liveness scan
//! - `hive leader` - Current leader
//! - `hive ui cycle|serve|status` - UI server lifecycle
//! - `hive submit text|link|file` - Inbox submissions
//! - `hive config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use hive_cli::commands::{self, ConfigCommand, PresenceCommand, SubmitCommand, UiCommand};
use hive_core::domain::hive_config::HiveConfigManifest;

/// Hive agent - presence, leader election and UI hosting over a shared store
#[derive(Parser)]
#[command(name = "hive")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "HIVE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HIVE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Agent heartbeats
    #[command(name = "presence")]
    Presence {
        #[command(subcommand)]
        command: PresenceCommand,
    },

    /// Show the current leader
    #[command(name = "leader")]
    Leader {
        /// Liveness window in seconds (default: spec.presence.ttl_seconds)
        #[arg(long)]
        ttl: Option<u64>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// UI server lifecycle
    #[command(name = "ui")]
    Ui {
        #[command(subcommand)]
        command: UiCommand,
    },

    /// Inbox submissions
    #[command(name = "submit")]
    Submit {
        #[command(subcommand)]
        command: SubmitCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(cli.log_level.as_deref(), cli.config.clone())?;

    match cli.command {
        Commands::Presence { command } => commands::presence::handle_command(command, cli.config).await,
        Commands::Leader { ttl, json } => commands::leader::handle_command(ttl, json, cli.config).await,
        Commands::Ui { command } => commands::ui::handle_command(command, cli.config).await,
        Commands::Submit { command } => commands::submit::handle_command(command, cli.config).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
    }
}

/// Initialize tracing subscriber for logging
///
/// Level precedence: `RUST_LOG`, then `--log-level` / `HIVE_LOG_LEVEL`, then
/// `spec.observability.logging.level`. Logs go to stderr so `--json` output
/// stays parseable.
fn init_logging(cli_level: Option<&str>, config_path: Option<PathBuf>) -> Result<()> {
    let logging = HiveConfigManifest::load_or_default(config_path)
        .ok()
        .and_then(|config| config.spec.observability)
        .and_then(|o| o.logging);

    let level = cli_level
        .map(str::to_string)
        .or_else(|| logging.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let json = logging.as_ref().is_some_and(|l| l.format.eq_ignore_ascii_case("json"));

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
