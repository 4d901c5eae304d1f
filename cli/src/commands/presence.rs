// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Presence commands
//!
//! Commands: ping, list

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hive_core::domain::leader::select_leader;
use hive_core::domain::presence::LivenessReport;

use crate::output::print_json;
use crate::services::HiveServices;

#[derive(Subcommand)]
pub enum PresenceCommand {
    /// Write this agent's heartbeat to the shared store
    Ping {
        /// Agent id (default: spec.agent.id)
        #[arg(long)]
        agent_id: Option<String>,

        /// Free-form note stored with the heartbeat
        #[arg(long)]
        note: Option<String>,

        /// Print the receipt as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan heartbeats and show the active and stale sets
    List {
        /// Liveness window in seconds (default: spec.presence.ttl_seconds)
        #[arg(long)]
        ttl: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: PresenceCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = HiveServices::load(config_path)?;
    match command {
        PresenceCommand::Ping { agent_id, note, json } => ping(&services, agent_id, note, json).await,
        PresenceCommand::List { ttl, json } => list(&services, ttl, json).await,
    }
}

async fn ping(
    services: &HiveServices,
    agent_id: Option<String>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let agent_id = agent_id.unwrap_or_else(|| services.agent_id().to_string());
    let spec = &services.config.spec;
    let note = note.unwrap_or_else(|| spec.presence.note.clone());

    let receipt = services
        .presence()
        .report_presence(&agent_id, &spec.agent.client, &note)
        .await
        .context("Failed to write presence record")?;

    if json {
        return print_json(&receipt);
    }

    println!(
        "{} {} → {}{}",
        "✓".green(),
        agent_id.bold(),
        receipt.path,
        if receipt.encrypted { " (enc)".dimmed().to_string() } else { String::new() }
    );
    Ok(())
}

async fn list(services: &HiveServices, ttl: Option<u64>, json: bool) -> Result<()> {
    let ttl = ttl.unwrap_or_else(|| services.ttl_seconds());
    let report = services
        .presence()
        .list_active(ttl)
        .await
        .context("Failed to scan presence records")?;

    if json {
        return print_json(&report);
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &LivenessReport) {
    let leader = select_leader(&report.active);

    println!(
        "{} (ttl {}s, {} files)",
        "Presence:".bold(),
        report.ttl_seconds,
        report.total_files
    );
    println!();

    println!("{} {}", "Active:".bold(), report.active_count);
    for entry in &report.active {
        let marker = if leader.as_ref() == Some(&entry.slug()) {
            "★".yellow().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "  {} {:<24} {:<12} {:>6}s ago",
            marker,
            entry.agent_id.green(),
            entry.client,
            entry.age_seconds
        );
    }

    if report.stale_count > 0 {
        println!();
        println!("{} {}", "Stale:".bold(), report.stale_count);
        for entry in &report.stale {
            let who = entry.agent_id.as_deref().unwrap_or(&entry.path);
            match entry.age_seconds {
                Some(age) => println!("    {:<24} {:>6}s ago", who.dimmed(), age),
                None => println!("    {:<24} {}", who.dimmed(), "bad timestamp".red()),
            }
        }
    }

    if report.malformed_count > 0 {
        println!();
        println!(
            "{}",
            format!("{} malformed record(s) skipped", report.malformed_count).yellow()
        );
    }
}
