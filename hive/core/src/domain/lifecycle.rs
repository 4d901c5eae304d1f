// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! UI Lifecycle Domain Model
//!
//! The hosted UI server is a singleton across the hive: only the current
//! leader should run it. Each agent re-evaluates a two-state machine
//! (`NOT_RUNNING` / `RUNNING`) on every cycle:
//!
//! | should_host | locally_running | action    |
//! |-------------|-----------------|-----------|
//! | true        | false           | `started` |
//! | false       | true            | `stopped` |
//! | otherwise   |                 | `noop`    |
//!
//! There is no lock behind this. Safety is "at most one self-declared leader
//! most of the time": a dead leader's presence ages out and the next smallest
//! id takes over within about one TTL.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Lifecycle transitions, endpoint announcement and snapshot types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::agent::AgentSlug;
use crate::domain::presence::iso_seconds;
use crate::domain::process::ProcessHandle;

/// Well-known key of the endpoint announcement (before codec suffixing).
pub const ENDPOINT_PATH: &str = "logs/ui_endpoint.json";

/// Action taken by one controller cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Noop,
    Started,
    Stopped,
    /// Spawning the server failed
    StartFailed,
    /// Terminating the server failed; it is retried next cycle
    StopFailed,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::StartFailed => "start_failed",
            Self::StopFailed => "stop_failed",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition requested for this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Stop,
    Stay,
}

/// Pure transition rule.
pub fn plan_transition(should_host: bool, locally_running: bool) -> Transition {
    match (should_host, locally_running) {
        (true, false) => Transition::Start,
        (false, true) => Transition::Stop,
        _ => Transition::Stay,
    }
}

/// Local lifecycle state after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    pub should_host: bool,
    pub running: bool,
    pub action: LifecycleAction,
}

impl LifecycleState {
    /// State after applying `action` to a process observed as `was_running`.
    pub fn after(should_host: bool, was_running: bool, action: LifecycleAction) -> Self {
        let running = match action {
            LifecycleAction::Started => true,
            LifecycleAction::Stopped => false,
            LifecycleAction::StartFailed => false,
            LifecycleAction::StopFailed => true,
            LifecycleAction::Noop => was_running,
        };
        Self { should_host, running, action }
    }
}

/// Leader-published discovery record
///
/// Intended to have a single writer, but nothing enforces that. Readers treat
/// it as a hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAnnouncement {
    #[serde(rename = "ts", with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "leader")]
    pub leader_id: AgentSlug,
    pub active_count: usize,
    pub url: String,
    pub bind: String,
    pub port: u16,
}

/// Local record of the last cycle, for inspection only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSnapshot {
    #[serde(rename = "ts", with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub leader: Option<AgentSlug>,
    pub should_host: bool,
    pub running: bool,
    pub bind: String,
    pub port: u16,
    pub action: LifecycleAction,
    pub active_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_error: Option<String>,
}

/// Repository for host-local lifecycle state (process handle + snapshot)
#[async_trait]
pub trait LifecycleStateRepository: Send + Sync {
    async fn load_handle(&self) -> Result<Option<ProcessHandle>, StateError>;

    async fn save_handle(&self, handle: &ProcessHandle) -> Result<(), StateError>;

    async fn clear_handle(&self) -> Result<(), StateError>;

    async fn save_snapshot(&self, snapshot: &LifecycleSnapshot) -> Result<(), StateError>;

    async fn load_snapshot(&self) -> Result<Option<LifecycleSnapshot>, StateError>;
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
