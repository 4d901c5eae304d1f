// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Presence Service
//!
//! Writes this agent's heartbeat and scans everyone else's. Both operations
//! are one-shot: no retries, no caching. A scan reads every visible record
//! under `logs/presence/` on each call, so its cost grows with the number of
//! agents that have ever pinged.
//!
//! # Metrics
//!
//! `hive_presence_pings_total` and `hive_presence_malformed_total` go to
//! whatever recorder the host process installed. Only `hive ui serve`
//! installs one, so only scans served by the UI server are exported.
//! One-shot CLI runs (`hive presence ping`, `hive ui cycle`) record into the
//! no-op recorder and their counts are dropped.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** `report_presence` and `list_active` over the shared store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::agent::AgentSlug;
use crate::domain::clock::Clock;
use crate::domain::codec::{CodecError, PayloadCodec};
use crate::domain::presence::{
    iso_seconds, presence_path, LivenessReport, PresenceRecord, RecordError, ScannedRecord,
    PRESENCE_DIR,
};
use crate::domain::storage::{join_path, ObjectStore, StoreError};

/// Outcome of a heartbeat write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceReceipt {
    pub path: String,
    pub encrypted: bool,
    #[serde(rename = "ts", with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Failed to encode presence record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PresenceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PresenceError::Store(e) if e.is_transient())
    }
}

pub struct PresenceService {
    store: Arc<dyn ObjectStore>,
    codec: Arc<dyn PayloadCodec>,
    clock: Arc<dyn Clock>,
}

impl PresenceService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        codec: Arc<dyn PayloadCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, codec, clock }
    }

    /// Overwrite this agent's presence record with a fresh timestamp.
    ///
    /// Exactly one store write. Store failures are returned as-is.
    pub async fn report_presence(
        &self,
        agent_id: &str,
        client: &str,
        note: &str,
    ) -> Result<PresenceReceipt, PresenceError> {
        let record = PresenceRecord::new(agent_id, client, note, self.clock.now());
        let path = presence_path(&AgentSlug::normalize(agent_id));
        let encoded = self.codec.encode(&path, record.encode()?)?;

        let mut message = format!("hive: presence ping {}", agent_id);
        if encoded.encrypted {
            message.push_str(" (enc)");
        }

        self.store.put(&encoded.path, &encoded.bytes, &message).await?;

        metrics::counter!("hive_presence_pings_total").increment(1);
        info!(agent_id = %agent_id, path = %encoded.path, encrypted = encoded.encrypted, "Presence reported");

        Ok(PresenceReceipt {
            path: encoded.path,
            encrypted: encoded.encrypted,
            timestamp: record.timestamp,
        })
    }

    /// Scan every presence record and partition it by `ttl_seconds`.
    ///
    /// Records that cannot be fetched back, unwrapped or parsed are skipped
    /// and counted; a failing `list` or `get` call aborts the scan.
    pub async fn list_active(&self, ttl_seconds: u64) -> Result<LivenessReport, PresenceError> {
        let entries = self.store.list(PRESENCE_DIR).await?;
        let files: Vec<_> = entries.into_iter().filter(|e| e.is_visible_file()).collect();
        let total_files = files.len();

        let mut scanned = Vec::with_capacity(total_files);
        let mut malformed = 0usize;

        for entry in files {
            let path = join_path(PRESENCE_DIR, &entry.name);
            let Some(bytes) = self.store.get(&path).await? else {
                // Listed but gone: a lagging replica, not a bad record.
                debug!(path = %path, "Presence record vanished between list and get");
                continue;
            };

            let plain = match self.codec.decode(&bytes) {
                Ok(plain) => plain,
                Err(e) => {
                    warn!(path = %path, error = %e, "Skipping unreadable presence record");
                    malformed += 1;
                    continue;
                }
            };

            match PresenceRecord::decode(&plain) {
                Ok(record) => scanned.push(ScannedRecord::Parsed { path, record }),
                Err(RecordError::BadTimestamp { agent_id, client, raw }) => {
                    warn!(path = %path, raw_ts = ?raw, "Presence record has an unparsable timestamp");
                    scanned.push(ScannedRecord::BadTimestamp {
                        path,
                        agent_id,
                        client,
                        raw_timestamp: raw,
                    });
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Skipping malformed presence record");
                    malformed += 1;
                }
            }
        }

        if malformed > 0 {
            metrics::counter!("hive_presence_malformed_total").increment(malformed as u64);
        }

        let report =
            LivenessReport::classify(scanned, ttl_seconds, self.clock.now(), total_files, malformed);
        debug!(
            active = report.active_count,
            stale = report.stale_count,
            malformed = report.malformed_count,
            ttl_seconds,
            "Presence scan complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::presence::StaleReason;
    use crate::infrastructure::codec::EnvelopeCodec;
    use crate::infrastructure::storage::memory::InMemoryObjectStore;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn service(store: Arc<InMemoryObjectStore>, clock: Arc<FixedClock>) -> PresenceService {
        PresenceService::new(store, Arc::new(EnvelopeCodec::disabled()), clock)
    }

    #[tokio::test]
    async fn test_report_presence_writes_one_record() {
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(FixedClock::new(t0()));
        let svc = service(store.clone(), clock);

        let receipt = svc.report_presence("Main Agent", "openclaw", "hi").await.unwrap();
        assert_eq!(receipt.path, "logs/presence/agent-main-agent.json");
        assert!(!receipt.encrypted);
        assert_eq!(receipt.timestamp, t0());

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].message, "hive: presence ping Main Agent");
    }

    #[tokio::test]
    async fn test_ping_is_idempotent_per_agent() {
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(FixedClock::new(t0()));
        let svc = service(store.clone(), clock.clone());

        svc.report_presence("a", "c", "").await.unwrap();
        clock.advance(Duration::seconds(30));
        svc.report_presence("a", "c", "").await.unwrap();

        let report = svc.list_active(900).await.unwrap();
        assert_eq!(report.total_files, 1);
        assert_eq!(report.active_count, 1);
        assert_eq!(report.active[0].timestamp, t0() + Duration::seconds(30));
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let store = Arc::new(InMemoryObjectStore::new());
        let svc = service(store, Arc::new(FixedClock::new(t0())));
        let report = svc.list_active(900).await.unwrap();
        assert_eq!(report.total_files, 0);
        assert!(report.active.is_empty());
        assert!(report.stale.is_empty());
    }

    #[tokio::test]
    async fn test_scan_skips_hidden_dirs_and_malformed() {
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(FixedClock::new(t0()));
        let svc = service(store.clone(), clock);

        svc.report_presence("good", "c", "").await.unwrap();
        store.insert("logs/presence/.gitkeep", b"");
        store.insert("logs/presence/archive/agent-old.json", b"{}");
        store.insert("logs/presence/agent-junk.json", b"not json at all");
        store.insert(
            "logs/presence/agent-skewed.json",
            br#"{"ts":"not-a-date","agent_id":"skewed","client":"c"}"#,
        );

        let report = svc.list_active(900).await.unwrap();
        assert_eq!(report.total_files, 3);
        assert_eq!(report.active_count, 1);
        assert_eq!(report.active[0].agent_id, "good");
        assert_eq!(report.malformed_count, 1);
        assert_eq!(report.stale_count, 1);
        assert_eq!(report.stale[0].reason, StaleReason::BadTimestamp);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.fail_reads(true);
        let svc = service(store, Arc::new(FixedClock::new(t0())));
        let err = svc.list_active(900).await.unwrap_err();
        assert!(matches!(err, PresenceError::Store(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.fail_writes(true);
        let svc = service(store.clone(), Arc::new(FixedClock::new(t0())));
        assert!(svc.report_presence("a", "c", "").await.is_err());
        assert!(store.writes().is_empty());
    }
}
