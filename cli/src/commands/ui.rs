// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! UI hosting commands
//!
//! Commands: cycle, serve, status
//!
//! `cycle` is meant to be run periodically (cron, systemd timer, agent loop)
//! on every node. Only the leader ends up running `serve`.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use tracing::warn;

use hive_core::application::lifecycle::{LifecycleReport, LifecycleStatus};
use hive_core::domain::lifecycle::LifecycleAction;

use crate::daemon;
use crate::output::print_json;
use crate::services::HiveServices;

#[derive(Subcommand)]
pub enum UiCommand {
    /// Evaluate leadership once and start/stop the local UI server
    Cycle {
        /// Write this agent's heartbeat before evaluating
        #[arg(long)]
        ping: bool,

        /// Print the cycle report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the UI server in the foreground
    Serve {
        /// Bind address (default: spec.ui.bind)
        #[arg(long)]
        bind: Option<String>,

        /// Port (default: spec.ui.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show the locally tracked UI server
    Status {
        /// Print status as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: UiCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = HiveServices::load(config_path)?;
    match command {
        UiCommand::Cycle { ping, json } => cycle(&services, ping, json).await,
        UiCommand::Serve { bind, port } => {
            let ui = &services.config.spec.ui;
            let bind = bind.unwrap_or_else(|| ui.bind.clone());
            let port = port.unwrap_or(ui.port);
            daemon::start_ui_server(&services, &bind, port).await
        }
        UiCommand::Status { json } => status(&services, json).await,
    }
}

async fn cycle(services: &HiveServices, ping: bool, json: bool) -> Result<()> {
    if ping {
        let spec = &services.config.spec;
        if let Err(e) = services
            .presence()
            .report_presence(services.agent_id(), &spec.agent.client, &spec.presence.note)
            .await
        {
            warn!(error = %e, "Heartbeat failed; evaluating with the existing records");
        }
    }

    let controller = services.lifecycle_controller()?;
    let report = controller
        .run_cycle()
        .await
        .context("Lifecycle cycle failed")?;

    if json {
        print_json(&report)?;
    } else {
        print_cycle(&report);
    }

    if report.degraded {
        anyhow::bail!(
            "Presence scan failed, stood down: {}",
            report.snapshot.scan_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_cycle(report: &LifecycleReport) {
    let snapshot = &report.snapshot;
    let action = match snapshot.action {
        LifecycleAction::Started => snapshot.action.as_str().green(),
        LifecycleAction::Stopped => snapshot.action.as_str().yellow(),
        LifecycleAction::StartFailed | LifecycleAction::StopFailed => {
            snapshot.action.as_str().red()
        }
        LifecycleAction::Noop => snapshot.action.as_str().dimmed(),
    };

    println!("{} {}", "Action:".bold(), action);
    println!(
        "  Leader: {}",
        snapshot.leader.as_ref().map(|l| l.as_str()).unwrap_or("(none)")
    );
    println!("  Active agents: {}", snapshot.active_count);
    println!("  Should host: {}", snapshot.should_host);
    println!(
        "  Running: {}{}",
        snapshot.running,
        snapshot.pid.map(|pid| format!(" (PID {})", pid)).unwrap_or_default()
    );
    println!("  Bind: {}:{}", snapshot.bind, snapshot.port);
    if report.endpoint_published {
        println!("  Endpoint: {}", "published".green());
    }
    if let Some(err) = &snapshot.scan_error {
        println!("  {} {}", "Scan error:".red(), err);
    }
}

async fn status(services: &HiveServices, json: bool) -> Result<()> {
    let controller = services.lifecycle_controller()?;
    let status = controller
        .status()
        .await
        .context("Failed to read local lifecycle state")?;

    if json {
        return print_json(&status);
    }

    print_status(&status);
    Ok(())
}

fn print_status(status: &LifecycleStatus) {
    match status.pid {
        Some(pid) if status.alive && status.reachable => {
            println!("{}", "✓ UI server is running".green());
            println!("  PID: {}", pid);
        }
        Some(pid) if status.alive => {
            println!("{}", "⚠ UI server process is alive but not reachable".yellow());
            println!("  PID: {}", pid);
        }
        Some(pid) => {
            println!("{}", "✗ UI server is not running (stale PID)".red());
            println!("  PID: {}", pid);
        }
        None => println!("{}", "UI server is not running".yellow()),
    }

    if let Some(last) = &status.last_cycle {
        println!();
        println!("{}", "Last cycle:".bold());
        println!("  At: {}", last.timestamp.to_rfc3339());
        println!("  Action: {}", last.action);
        println!(
            "  Leader: {}",
            last.leader.as_ref().map(|l| l.as_str()).unwrap_or("(none)")
        );
        println!("  Bind: {}:{}", last.bind, last.port);
    }
}
