// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `hive leader` - who should host the UI right now

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

use hive_core::domain::leader::{is_leader, select_leader};

use crate::output::print_json;
use crate::services::HiveServices;

pub async fn handle_command(
    ttl: Option<u64>,
    json: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let services = HiveServices::load(config_path)?;
    let ttl = ttl.unwrap_or_else(|| services.ttl_seconds());

    let report = services
        .presence()
        .list_active(ttl)
        .await
        .context("Failed to scan presence records")?;
    let leader = select_leader(&report.active);
    let local = is_leader(leader.as_ref(), services.agent_id());

    if json {
        return print_json(&json!({
            "leader": leader,
            "active_count": report.active_count,
            "ttl_seconds": ttl,
            "is_local": local,
        }));
    }

    match leader {
        Some(leader) => {
            println!("{} {}", "Leader:".bold(), leader.as_str().green());
            if local {
                println!("  {}", "(this agent)".cyan());
            }
        }
        None => println!("{} {}", "Leader:".bold(), "none (no active agents)".yellow()),
    }
    println!("  Active agents: {} (ttl {}s)", report.active_count, ttl);

    Ok(())
}
