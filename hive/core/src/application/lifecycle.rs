// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lifecycle Controller
//!
//! One call to [`LifecycleController::run_cycle`] is one evaluation of the UI
//! hosting state machine: scan presence, derive the leader, compare with what
//! runs locally, start or stop the server, publish the endpoint when hosting,
//! and record a snapshot. The periodic trigger lives outside this crate.
//!
//! Starting is fire-and-forget. The next cycle's reachability check is the
//! only feedback, so a server that dies during startup is simply started
//! again one cycle later.
//!
//! # Metrics
//!
//! `hive_lifecycle_actions_total{action}` and
//! `hive_endpoint_publish_failures_total` are emitted per cycle, but cycles
//! run in the short-lived `hive ui cycle` process, which installs no
//! recorder. They only become visible when the controller is embedded in a
//! process that installs one. The cycle report and the snapshot file are the
//! durable record of each action.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrates presence, leader selection and process control

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::presence::PresenceService;
use crate::domain::agent::AgentSlug;
use crate::domain::clock::Clock;
use crate::domain::codec::PayloadCodec;
use crate::domain::leader::is_leader;
use crate::domain::lifecycle::{
    plan_transition, EndpointAnnouncement, LifecycleAction, LifecycleSnapshot, LifecycleState,
    LifecycleStateRepository, StateError, Transition, ENDPOINT_PATH,
};
use crate::domain::presence::{truncate_to_seconds, LivenessReport};
use crate::domain::process::{ProcessControl, ProcessHandle, ServerLaunch};
use crate::domain::storage::ObjectStore;

const LOOPBACK: &str = "127.0.0.1";

/// Static inputs of the controller
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub agent_id: String,
    pub ttl_seconds: u64,
    pub bind: String,
    pub port: u16,
    /// URL advertised in the endpoint announcement
    pub public_url: String,
    pub launch: ServerLaunch,
}

/// Result of one cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub snapshot: LifecycleSnapshot,
    pub endpoint_published: bool,
    /// The presence scan failed and the node stood down
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness: Option<LivenessReport>,
}

/// Local view used by `ui status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleStatus {
    pub pid: Option<u32>,
    pub alive: bool,
    pub reachable: bool,
    pub last_cycle: Option<LifecycleSnapshot>,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Local lifecycle state error: {0}")]
    State(#[from] StateError),
}

pub struct LifecycleController {
    presence: Arc<PresenceService>,
    store: Arc<dyn ObjectStore>,
    codec: Arc<dyn PayloadCodec>,
    clock: Arc<dyn Clock>,
    process: Arc<dyn ProcessControl>,
    state: Arc<dyn LifecycleStateRepository>,
    settings: LifecycleSettings,
}

impl LifecycleController {
    pub fn new(
        presence: Arc<PresenceService>,
        store: Arc<dyn ObjectStore>,
        codec: Arc<dyn PayloadCodec>,
        clock: Arc<dyn Clock>,
        process: Arc<dyn ProcessControl>,
        state: Arc<dyn LifecycleStateRepository>,
        settings: LifecycleSettings,
    ) -> Self {
        Self { presence, store, codec, clock, process, state, settings }
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Run one evaluation of the hosting state machine.
    ///
    /// Store failures never abort the cycle: a failed scan stands the node
    /// down and a failed endpoint publish is logged and dropped. Only local
    /// state I/O errors are returned.
    pub async fn run_cycle(&self) -> Result<LifecycleReport, LifecycleError> {
        let (liveness, scan_error) = match self.presence.list_active(self.settings.ttl_seconds).await {
            Ok(report) => (Some(report), None),
            Err(e) => {
                warn!(error = %e, "Presence scan failed; standing down for this cycle");
                (None, Some(e.to_string()))
            }
        };

        let leader = liveness.as_ref().and_then(LivenessReport::leader);
        let active_count = liveness.as_ref().map_or(0, |r| r.active_count);
        let should_host = is_leader(leader.as_ref(), &self.settings.agent_id);

        let mut handle = self.state.load_handle().await?;
        let alive = match &handle {
            Some(h) => self.process.is_alive(h).await,
            None => false,
        };
        let locally_running = alive && self.port_reachable().await;

        debug!(
            leader = ?leader,
            should_host,
            alive,
            locally_running,
            active_count,
            "Evaluating UI lifecycle"
        );

        let action = match plan_transition(should_host, locally_running) {
            Transition::Start => {
                if let Some(stale) = handle.take() {
                    self.discard_handle(stale, alive).await?;
                }
                match self.process.spawn_detached(&self.settings.launch).await {
                    Ok(spawned) => {
                        self.state.save_handle(&spawned).await?;
                        handle = Some(spawned);
                        info!(pid = spawned.pid, port = self.settings.port, "UI server started");
                        LifecycleAction::Started
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to start UI server");
                        LifecycleAction::StartFailed
                    }
                }
            }
            Transition::Stop => {
                // locally_running implies a recorded handle
                match handle {
                    Some(running) => match self.process.terminate(&running).await {
                        Ok(()) => {
                            self.state.clear_handle().await?;
                            handle = None;
                            info!(pid = running.pid, "UI server stopped");
                            LifecycleAction::Stopped
                        }
                        Err(e) => {
                            warn!(pid = running.pid, error = %e, "Failed to stop UI server");
                            LifecycleAction::StopFailed
                        }
                    },
                    None => LifecycleAction::Noop,
                }
            }
            Transition::Stay => {
                if let Some(dead) = handle.filter(|_| !alive) {
                    debug!(pid = dead.pid, "Clearing handle of exited UI server");
                    self.state.clear_handle().await?;
                    handle = None;
                }
                LifecycleAction::Noop
            }
        };

        let state = LifecycleState::after(should_host, locally_running, action);
        metrics::counter!("hive_lifecycle_actions_total", "action" => action.as_str()).increment(1);

        let endpoint_published = match (&leader, should_host) {
            (Some(leader), true) => self.publish_endpoint(leader, active_count).await,
            _ => false,
        };

        let snapshot = LifecycleSnapshot {
            timestamp: truncate_to_seconds(self.clock.now()),
            agent_id: self.settings.agent_id.clone(),
            leader,
            should_host: state.should_host,
            running: state.running,
            bind: self.settings.bind.clone(),
            port: self.settings.port,
            action: state.action,
            active_count,
            pid: handle.map(|h| h.pid),
            scan_error,
        };
        self.state.save_snapshot(&snapshot).await?;

        Ok(LifecycleReport {
            degraded: snapshot.scan_error.is_some(),
            snapshot,
            endpoint_published,
            liveness,
        })
    }

    /// Current local state without changing anything.
    pub async fn status(&self) -> Result<LifecycleStatus, LifecycleError> {
        let handle = self.state.load_handle().await?;
        let alive = match &handle {
            Some(h) => self.process.is_alive(h).await,
            None => false,
        };
        let reachable = self.port_reachable().await;
        Ok(LifecycleStatus {
            pid: handle.map(|h| h.pid),
            alive,
            reachable,
            last_cycle: self.state.load_snapshot().await?,
        })
    }

    async fn port_reachable(&self) -> bool {
        let port = self.settings.port;
        if self.process.port_reachable(LOOPBACK, port).await {
            return true;
        }
        let bind = self.settings.bind.as_str();
        bind != LOOPBACK && self.process.port_reachable(bind, port).await
    }

    /// Drop a recorded handle before respawning. A live process that does not
    /// answer on the port is terminated so the new server can bind.
    async fn discard_handle(&self, stale: ProcessHandle, alive: bool) -> Result<(), LifecycleError> {
        if alive {
            warn!(pid = stale.pid, "UI server is alive but unreachable; terminating before restart");
            if let Err(e) = self.process.terminate(&stale).await {
                warn!(pid = stale.pid, error = %e, "Failed to terminate unreachable UI server");
            }
        }
        self.state.clear_handle().await?;
        Ok(())
    }

    async fn publish_endpoint(&self, leader: &AgentSlug, active_count: usize) -> bool {
        let announcement = EndpointAnnouncement {
            timestamp: truncate_to_seconds(self.clock.now()),
            leader_id: leader.clone(),
            active_count,
            url: self.settings.public_url.clone(),
            bind: self.settings.bind.clone(),
            port: self.settings.port,
        };

        let result = async {
            let bytes = serde_json::to_vec_pretty(&announcement)
                .map_err(|e| e.to_string())?;
            let encoded = self.codec.encode(ENDPOINT_PATH, bytes).map_err(|e| e.to_string())?;
            let mut message = String::from("hive-ui: update endpoint");
            if encoded.encrypted {
                message.push_str(" (enc)");
            }
            self.store
                .put(&encoded.path, &encoded.bytes, &message)
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(()) => {
                debug!(url = %announcement.url, "Endpoint announcement published");
                true
            }
            Err(e) => {
                metrics::counter!("hive_endpoint_publish_failures_total").increment(1);
                warn!(error = %e, "Failed to publish endpoint announcement");
                false
            }
        }
    }
}
