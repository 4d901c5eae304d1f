// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hive_core::domain::hive_config::{HiveConfigManifest, StoreBackend};

const MINIMAL_TEMPLATE: &str = include_str!("../../templates/config-minimal.yaml");
const FULL_TEMPLATE: &str = include_str!("../../templates/config-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./hive-config.yaml)
        #[arg(short, long, default_value = "./hive-config.yaml")]
        output: PathBuf,

        /// Include every section with comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = HiveConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. HIVE_CONFIG_PATH: {}",
            std::env::var("HIVE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./hive-config.yaml");
        println!("  4. ~/.hive/config.yaml");
        println!("  5. /etc/hive/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Agent:".bold());
    println!("  ID: {}", spec.agent.id);
    println!("  Client: {}", spec.agent.client);
    println!();

    println!("{}", "Store:".bold());
    match spec.store.backend {
        StoreBackend::Github => {
            println!("  Backend: github");
            println!("  Repo: {}", spec.store.repo.as_deref().unwrap_or("(not set)"));
            println!("  Branch: {}", spec.store.branch);
            println!("  API: {}", spec.store.api_url);
            let token_state = if std::env::var(&spec.store.token_env).is_ok() {
                "set".green()
            } else {
                "missing".red()
            };
            println!("  Token: ${} ({})", spec.store.token_env, token_state);
        }
        StoreBackend::Local => {
            println!("  Backend: local");
            println!(
                "  Root: {}",
                spec.store
                    .root
                    .as_ref()
                    .map(|r| r.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
        }
    }
    let encrypted = std::env::var("HIVE_PSK").is_ok() || std::env::var("HIVE_PRIVATE_KEY").is_ok();
    println!("  Encryption: {}", if encrypted { "enabled".green() } else { "disabled".dimmed() });
    println!();

    println!("{}", "Presence:".bold());
    println!("  TTL: {}s", spec.presence.ttl_seconds);
    println!();

    println!("{}", "UI:".bold());
    println!("  Bind: {}:{}", spec.ui.bind, spec.ui.port);
    println!("  Advertised URL: {}", spec.ui.advertised_url());
    println!("  State: {}", spec.ui.resolved_state_path().display());
    println!("  Inline limit: {} bytes", spec.ui.max_inline_bytes);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = HiveConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples { FULL_TEMPLATE } else { MINIMAL_TEMPLATE };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
