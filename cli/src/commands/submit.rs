// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Inbox submission commands
//!
//! Commands: text, link, file

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hive_core::domain::inbox::{FileUpload, Submission};

use crate::output::print_json;
use crate::services::HiveServices;

#[derive(Subcommand)]
pub enum SubmitCommand {
    /// Submit a block of free text
    Text {
        /// Text to submit; read from stdin when omitted
        text: Option<String>,

        #[command(flatten)]
        common: SubmitOptions,
    },

    /// Submit a URL
    Link {
        url: String,

        #[arg(long, default_value = "")]
        comment: String,

        #[command(flatten)]
        common: SubmitOptions,
    },

    /// Submit a file
    File {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(long, default_value = "")]
        comment: String,

        /// MIME type recorded in the manifest
        #[arg(long)]
        content_type: Option<String>,

        #[command(flatten)]
        common: SubmitOptions,
    },
}

#[derive(clap::Args)]
pub struct SubmitOptions {
    /// Submitting agent (default: spec.agent.id)
    #[arg(long)]
    agent_id: Option<String>,

    /// Print the receipt as JSON
    #[arg(long)]
    json: bool,
}

pub async fn handle_command(command: SubmitCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = HiveServices::load(config_path)?;

    let (submission, common) = match command {
        SubmitCommand::Text { text, common } => {
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };
            (Submission::Text { text }, common)
        }
        SubmitCommand::Link { url, comment, common } => (Submission::Link { url, comment }, common),
        SubmitCommand::File { path, comment, content_type, common } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            let upload = FileUpload {
                filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
                content_type,
                data,
                comment,
            };
            (Submission::File(upload), common)
        }
    };

    let agent_id = common.agent_id.unwrap_or_else(|| services.agent_id().to_string());
    let kind = submission.kind();
    let receipt = services
        .inbox()
        .submit(&agent_id, submission)
        .await
        .with_context(|| format!("Failed to submit {}", kind))?;

    if common.json {
        return print_json(&receipt);
    }

    println!(
        "{} {} → {}{}",
        "✓".green(),
        format!("Submitted {}", kind).bold(),
        receipt.path,
        if receipt.encrypted { " (enc)".dimmed().to_string() } else { String::new() }
    );
    Ok(())
}

fn read_stdin() -> Result<String> {
    use std::io::Read;

    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read text from stdin")?;
    Ok(buf)
}
