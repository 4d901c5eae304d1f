// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Process Control Capability
//!
//! The lifecycle controller never touches OS process APIs directly. It sees
//! the four operations below, which keeps it portable and lets tests drive it
//! with a scripted fake.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Defines the local process-management port

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Reference to a spawned server process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessHandle {
    pub pid: u32,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }
}

/// How to launch the UI server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLaunch {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// stdout/stderr are appended here
    pub log_path: PathBuf,
    pub working_dir: Option<PathBuf>,
}

#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Start a process detached from the caller. Does not wait for readiness.
    async fn spawn_detached(&self, launch: &ServerLaunch) -> Result<ProcessHandle, ProcessError>;

    async fn is_alive(&self, handle: &ProcessHandle) -> bool;

    /// Terminate the process (and its group where supported).
    async fn terminate(&self, handle: &ProcessHandle) -> Result<(), ProcessError>;

    /// Whether a TCP connection to `host:port` can be opened right now.
    async fn port_reachable(&self, host: &str, port: u16) -> bool;
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("Failed to terminate process {pid}: {reason}")]
    Terminate { pid: u32, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
