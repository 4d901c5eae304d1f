// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! File-backed Lifecycle State
//!
//! Host-local state of the UI lifecycle controller, next to each other on
//! disk:
//!
//! - `<state>.json` - last [`LifecycleSnapshot`] (inspection only)
//! - `<state>.pid`  - PID of the spawned UI server
//! - `<state>.log`  - stdout/stderr of the spawned UI server
//!
//! An unreadable or garbage PID file is treated as "no handle".

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::domain::lifecycle::{LifecycleSnapshot, LifecycleStateRepository, StateError};
use crate::domain::process::ProcessHandle;

pub struct FileLifecycleStateStore {
    snapshot_path: PathBuf,
    pid_path: PathBuf,
}

impl FileLifecycleStateStore {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        let snapshot_path = snapshot_path.into();
        Self { pid_path: snapshot_path.with_extension("pid"), snapshot_path }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    /// Where the spawned server's output goes.
    pub fn log_path(&self) -> PathBuf {
        self.snapshot_path.with_extension("log")
    }

    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl LifecycleStateRepository for FileLifecycleStateStore {
    async fn load_handle(&self) -> Result<Option<ProcessHandle>, StateError> {
        let content = match tokio::fs::read_to_string(&self.pid_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match content.trim().parse::<u32>() {
            Ok(pid) if pid > 0 => Ok(Some(ProcessHandle::new(pid))),
            _ => {
                warn!(path = %self.pid_path.display(), "Ignoring invalid PID file");
                Ok(None)
            }
        }
    }

    async fn save_handle(&self, handle: &ProcessHandle) -> Result<(), StateError> {
        Self::write_atomic(&self.pid_path, handle.pid.to_string().as_bytes()).await?;
        debug!(pid = handle.pid, path = %self.pid_path.display(), "Wrote PID file");
        Ok(())
    }

    async fn clear_handle(&self) -> Result<(), StateError> {
        match tokio::fs::remove_file(&self.pid_path).await {
            Ok(()) => {
                debug!(path = %self.pid_path.display(), "Removed PID file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_snapshot(&self, snapshot: &LifecycleSnapshot) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        Self::write_atomic(&self.snapshot_path, &json).await
    }

    async fn load_snapshot(&self) -> Result<Option<LifecycleSnapshot>, StateError> {
        match tokio::fs::read(&self.snapshot_path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local state, for tests and dry runs
#[derive(Clone, Default)]
pub struct InMemoryLifecycleStateStore {
    handle: Arc<RwLock<Option<ProcessHandle>>>,
    snapshots: Arc<RwLock<Vec<LifecycleSnapshot>>>,
}

impl InMemoryLifecycleStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every snapshot saved so far, oldest first.
    pub fn snapshots(&self) -> Vec<LifecycleSnapshot> {
        self.snapshots.read().unwrap().clone()
    }
}

#[async_trait]
impl LifecycleStateRepository for InMemoryLifecycleStateStore {
    async fn load_handle(&self) -> Result<Option<ProcessHandle>, StateError> {
        Ok(*self.handle.read().unwrap())
    }

    async fn save_handle(&self, handle: &ProcessHandle) -> Result<(), StateError> {
        *self.handle.write().unwrap() = Some(*handle);
        Ok(())
    }

    async fn clear_handle(&self) -> Result<(), StateError> {
        *self.handle.write().unwrap() = None;
        Ok(())
    }

    async fn save_snapshot(&self, snapshot: &LifecycleSnapshot) -> Result<(), StateError> {
        self.snapshots.write().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Option<LifecycleSnapshot>, StateError> {
        Ok(self.snapshots.read().unwrap().last().cloned())
    }
}
