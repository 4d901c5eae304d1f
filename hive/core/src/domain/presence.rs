// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Presence Domain Model
//!
//! Presence records are per-agent heartbeats kept under `logs/presence/`. Each
//! agent overwrites its own record on every ping; nothing ever deletes one.
//! A record is *active* for a reader while its age is within that reader's
//! TTL, and becomes *stale* implicitly afterwards.
//!
//! This module holds the record format and the pure classification step of
//! the liveness scan. Store access lives in
//! [`PresenceService`](crate::application::presence::PresenceService).
//!
//! # Clock skew
//!
//! Ages are never corrected for skew between agents. A record stamped in the
//! future (remote clock ahead) has its age clamped to zero and is classified
//! active, so negative ages never leak into sort order.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Presence record codec and active/stale partitioning

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::agent::AgentSlug;

/// Directory holding one presence record per agent.
pub const PRESENCE_DIR: &str = "logs/presence";

/// Default TTL: 15 minutes.
pub const DEFAULT_TTL_SECONDS: u64 = 900;

/// Maximum note length in characters.
pub const MAX_NOTE_CHARS: usize = 200;

/// Storage key for an agent's presence record (before codec suffixing).
pub fn presence_path(slug: &AgentSlug) -> String {
    format!("{}/agent-{}.json", PRESENCE_DIR, slug)
}

/// Per-agent heartbeat record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    #[serde(rename = "ts", alias = "timestamp", with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub note: String,
}

impl PresenceRecord {
    /// Build a record, truncating the timestamp to whole seconds and capping
    /// the note.
    pub fn new(
        agent_id: impl Into<String>,
        client: impl Into<String>,
        note: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: truncate_to_seconds(at),
            agent_id: agent_id.into(),
            client: client.into(),
            note: note.chars().take(MAX_NOTE_CHARS).collect(),
        }
    }

    pub fn slug(&self) -> AgentSlug {
        AgentSlug::normalize(&self.agent_id)
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Parse a stored record.
    ///
    /// A structurally valid record whose timestamp cannot be read yields
    /// [`RecordError::BadTimestamp`] rather than `Malformed`, so the scan can
    /// keep it visible in the stale bucket.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let raw: RawPresenceRecord =
            serde_json::from_slice(bytes).map_err(|e| RecordError::Malformed(e.to_string()))?;

        let agent_id = raw
            .agent_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| RecordError::Malformed("missing agent_id".to_string()))?;

        let raw_ts = raw.ts.or(raw.timestamp);
        let timestamp = match raw_ts.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp) {
            Some(ts) => ts,
            None => {
                return Err(RecordError::BadTimestamp {
                    agent_id: Some(agent_id),
                    client: raw.client,
                    raw: raw_ts.map(|v| match v {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    }),
                })
            }
        };

        Ok(Self {
            timestamp,
            agent_id,
            client: raw.client.unwrap_or_default(),
            note: raw.note.unwrap_or_default(),
        })
    }

    /// Age at `now` in milliseconds, clamped at zero.
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_milliseconds().max(0)
    }
}

/// Lenient on-the-wire shape used for decoding
#[derive(Debug, Deserialize)]
struct RawPresenceRecord {
    #[serde(default)]
    ts: Option<serde_json::Value>,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    client: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed presence record: {0}")]
    Malformed(String),

    #[error("presence record has missing or unparsable timestamp: {raw:?}")]
    BadTimestamp {
        agent_id: Option<String>,
        client: Option<String>,
        raw: Option<String>,
    },
}

/// Parse ISO-8601 with an explicit offset, or a naive timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// ISO-8601, second precision, `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

pub(crate) mod iso_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

// ---------------------------------------------------------------------------
// Liveness classification
// ---------------------------------------------------------------------------

/// Record read during a scan, before classification
#[derive(Debug, Clone)]
pub enum ScannedRecord {
    Parsed { path: String, record: PresenceRecord },
    BadTimestamp {
        path: String,
        agent_id: Option<String>,
        client: Option<String>,
        raw_timestamp: Option<String>,
    },
}

/// Member of the active set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEntry {
    pub agent_id: String,
    pub client: String,
    #[serde(rename = "ts", with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "age_s")]
    pub age_seconds: i64,
    pub path: String,
}

impl ActiveEntry {
    pub fn slug(&self) -> AgentSlug {
        AgentSlug::normalize(&self.agent_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    Expired,
    BadTimestamp,
}

/// Member of the stale set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(rename = "ts", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "age_s", skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<i64>,
    pub reason: StaleReason,
}

/// Outcome of one liveness scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessReport {
    pub ttl_seconds: u64,
    /// Freshest first
    pub active: Vec<ActiveEntry>,
    /// Freshest first; unparsable timestamps last
    pub stale: Vec<StaleEntry>,
    pub active_count: usize,
    pub stale_count: usize,
    /// Records skipped because they could not be decoded or parsed
    pub malformed_count: usize,
    /// Visible files found under the presence directory
    pub total_files: usize,
}

impl LivenessReport {
    /// Partition scanned records by TTL.
    ///
    /// A record is active iff its (clamped) age is `<= ttl_seconds`; the
    /// boundary is inclusive. Ages are compared at millisecond resolution and
    /// reported in whole seconds.
    ///
    /// An agent that toggled encryption leaves one record under each path
    /// variant; only the freshest record per normalized id is classified.
    pub fn classify(
        records: Vec<ScannedRecord>,
        ttl_seconds: u64,
        now: DateTime<Utc>,
        total_files: usize,
        malformed_count: usize,
    ) -> Self {
        let ttl_millis = i64::try_from(ttl_seconds)
            .ok()
            .and_then(|s| s.checked_mul(1000))
            .unwrap_or(i64::MAX);

        let mut active: Vec<(i64, ActiveEntry)> = Vec::new();
        let mut stale: Vec<(Option<i64>, StaleEntry)> = Vec::new();

        for scanned in freshest_per_agent(records, now) {
            match scanned {
                ScannedRecord::Parsed { path, record } => {
                    let age_millis = record.age_millis(now);
                    let age_seconds = age_millis / 1000;
                    if age_millis <= ttl_millis {
                        active.push((
                            age_millis,
                            ActiveEntry {
                                agent_id: record.agent_id,
                                client: record.client,
                                timestamp: record.timestamp,
                                age_seconds,
                                path,
                            },
                        ));
                    } else {
                        stale.push((
                            Some(age_millis),
                            StaleEntry {
                                path,
                                agent_id: Some(record.agent_id),
                                client: Some(record.client),
                                timestamp: Some(format_timestamp(record.timestamp)),
                                age_seconds: Some(age_seconds),
                                reason: StaleReason::Expired,
                            },
                        ));
                    }
                }
                ScannedRecord::BadTimestamp { path, agent_id, client, raw_timestamp } => {
                    stale.push((
                        None,
                        StaleEntry {
                            path,
                            agent_id,
                            client,
                            timestamp: raw_timestamp,
                            age_seconds: None,
                            reason: StaleReason::BadTimestamp,
                        },
                    ));
                }
            }
        }

        active.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path.cmp(&b.1.path)));
        stale.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.1.path.cmp(&b.1.path)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let active: Vec<ActiveEntry> = active.into_iter().map(|(_, e)| e).collect();
        let stale: Vec<StaleEntry> = stale.into_iter().map(|(_, e)| e).collect();

        Self {
            ttl_seconds,
            active_count: active.len(),
            stale_count: stale.len(),
            active,
            stale,
            malformed_count,
            total_files,
        }
    }

    /// Leader derived from this report's active set.
    pub fn leader(&self) -> Option<AgentSlug> {
        crate::domain::leader::select_leader(&self.active)
    }
}

/// Keep at most one record per normalized agent id.
///
/// A parsed record beats any unparsable one; among parsed records the
/// youngest wins, then the smallest path. Unparsable records that name no
/// agent are all kept.
fn freshest_per_agent(records: Vec<ScannedRecord>, now: DateTime<Utc>) -> Vec<ScannedRecord> {
    let mut parsed: BTreeMap<AgentSlug, (i64, String, ScannedRecord)> = BTreeMap::new();
    let mut unparsable: BTreeMap<AgentSlug, (String, ScannedRecord)> = BTreeMap::new();
    let mut anonymous = Vec::new();

    for scanned in records {
        let key = match &scanned {
            ScannedRecord::Parsed { path, record } => {
                Some((record.slug(), Some(record.age_millis(now)), path.clone()))
            }
            ScannedRecord::BadTimestamp { path, agent_id: Some(id), .. } => {
                Some((AgentSlug::normalize(id), None, path.clone()))
            }
            ScannedRecord::BadTimestamp { agent_id: None, .. } => None,
        };
        let Some((slug, age, path)) = key else {
            anonymous.push(scanned);
            continue;
        };

        match age {
            Some(age) => {
                let keep_existing = parsed
                    .get(&slug)
                    .is_some_and(|(a, p, _)| (*a, p.as_str()) <= (age, path.as_str()));
                if !keep_existing {
                    parsed.insert(slug, (age, path, scanned));
                }
            }
            None => {
                let keep_existing =
                    unparsable.get(&slug).is_some_and(|(p, _)| p.as_str() <= path.as_str());
                if !keep_existing {
                    unparsable.insert(slug, (path, scanned));
                }
            }
        }
    }

    unparsable.retain(|slug, _| !parsed.contains_key(slug));
    parsed
        .into_values()
        .map(|(_, _, scanned)| scanned)
        .chain(unparsable.into_values().map(|(_, scanned)| scanned))
        .chain(anonymous)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn parsed(agent: &str, ts: DateTime<Utc>) -> ScannedRecord {
        ScannedRecord::Parsed {
            path: format!("{}/agent-{}.json", PRESENCE_DIR, agent),
            record: PresenceRecord::new(agent, "test", "", ts),
        }
    }

    #[test]
    fn test_record_roundtrip() {
        let record = PresenceRecord::new("Main Agent", "openclaw", "hello", t0());
        let decoded = PresenceRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded, record);

        let empty_note = PresenceRecord::new("a", "", "", t0());
        assert_eq!(PresenceRecord::decode(&empty_note.encode().unwrap()).unwrap(), empty_note);
    }

    #[test]
    fn test_record_wire_format() {
        let record = PresenceRecord::new("main", "openclaw", "", t0() + Duration::milliseconds(750));
        let json: serde_json::Value = serde_json::from_slice(&record.encode().unwrap()).unwrap();
        assert_eq!(json["ts"], "2026-03-01T12:00:00Z");
        assert_eq!(json["agent_id"], "main");
        assert_eq!(json["client"], "openclaw");
        assert_eq!(json["note"], "");
    }

    #[test]
    fn test_note_is_capped() {
        let long = "n".repeat(500);
        let record = PresenceRecord::new("a", "c", &long, t0());
        assert_eq!(record.note.chars().count(), MAX_NOTE_CHARS);
    }

    #[test]
    fn test_decode_accepts_legacy_shapes() {
        let bytes = br#"{"timestamp":"2026-03-01T12:00:00+00:00","agent_id":"x"}"#;
        let record = PresenceRecord::decode(bytes).unwrap();
        assert_eq!(record.timestamp, t0());
        assert_eq!(record.client, "");

        let naive = br#"{"ts":"2026-03-01T12:00:00","agent_id":"x","client":"c"}"#;
        assert_eq!(PresenceRecord::decode(naive).unwrap().timestamp, t0());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(PresenceRecord::decode(b"not json"), Err(RecordError::Malformed(_))));
        assert!(matches!(
            PresenceRecord::decode(br#"{"ts":"2026-03-01T12:00:00Z"}"#),
            Err(RecordError::Malformed(_))
        ));
        match PresenceRecord::decode(br#"{"ts":"yesterday","agent_id":"x"}"#) {
            Err(RecordError::BadTimestamp { agent_id, raw, .. }) => {
                assert_eq!(agent_id.as_deref(), Some("x"));
                assert_eq!(raw.as_deref(), Some("yesterday"));
            }
            other => panic!("expected BadTimestamp, got {:?}", other),
        }
        assert!(matches!(
            PresenceRecord::decode(br#"{"agent_id":"x"}"#),
            Err(RecordError::BadTimestamp { raw: None, .. })
        ));
        assert!(matches!(
            PresenceRecord::decode(br#"{"ts":12345,"agent_id":"x"}"#),
            Err(RecordError::BadTimestamp { .. })
        ));
    }

    #[test]
    fn test_ttl_boundary_is_inclusive() {
        let now = t0();
        let records = vec![
            parsed("edge", now - Duration::seconds(60)),
            parsed("over", now - Duration::seconds(61)),
        ];
        let report = LivenessReport::classify(records, 60, now, 2, 0);
        assert_eq!(report.active_count, 1);
        assert_eq!(report.active[0].agent_id, "edge");
        assert_eq!(report.active[0].age_seconds, 60);
        assert_eq!(report.stale[0].agent_id.as_deref(), Some("over"));
        assert_eq!(report.stale[0].reason, StaleReason::Expired);
    }

    #[test]
    fn test_ttl_zero() {
        let now = t0();
        let records = vec![parsed("now", now), parsed("second-ago", now - Duration::seconds(1))];
        let report = LivenessReport::classify(records, 0, now, 2, 0);
        assert_eq!(report.active_count, 1);
        assert_eq!(report.active[0].agent_id, "now");
        assert_eq!(report.stale_count, 1);
    }

    #[test]
    fn test_future_timestamp_clamped_active() {
        let now = t0();
        let report =
            LivenessReport::classify(vec![parsed("ahead", now + Duration::seconds(300))], 0, now, 1, 0);
        assert_eq!(report.active_count, 1);
        assert_eq!(report.active[0].age_seconds, 0);
    }

    #[test]
    fn test_sorting_and_bad_timestamps_last() {
        let now = t0();
        let records = vec![
            ScannedRecord::BadTimestamp {
                path: "logs/presence/agent-bad.json".into(),
                agent_id: Some("bad".into()),
                client: None,
                raw_timestamp: Some("??".into()),
            },
            parsed("old", now - Duration::seconds(5000)),
            parsed("mid", now - Duration::seconds(30)),
            parsed("older", now - Duration::seconds(2000)),
            parsed("fresh", now - Duration::seconds(1)),
        ];
        let report = LivenessReport::classify(records, 100, now, 5, 0);

        let active: Vec<&str> = report.active.iter().map(|e| e.agent_id.as_str()).collect();
        assert_eq!(active, vec!["fresh", "mid"]);

        let stale: Vec<Option<&str>> =
            report.stale.iter().map(|e| e.agent_id.as_deref()).collect();
        assert_eq!(stale, vec![Some("older"), Some("old"), Some("bad")]);
        assert_eq!(report.stale[2].reason, StaleReason::BadTimestamp);
        assert_eq!(report.stale[2].age_seconds, None);
    }

    #[test]
    fn test_bad_timestamp_never_active_even_with_huge_ttl() {
        let records = vec![ScannedRecord::BadTimestamp {
            path: "p".into(),
            agent_id: Some("a".into()),
            client: None,
            raw_timestamp: None,
        }];
        let report = LivenessReport::classify(records, u64::MAX, t0(), 1, 0);
        assert_eq!(report.active_count, 0);
        assert_eq!(report.stale_count, 1);
    }

    #[test]
    fn test_empty_scan() {
        let report = LivenessReport::classify(vec![], 900, t0(), 0, 0);
        assert!(report.active.is_empty());
        assert!(report.stale.is_empty());
        assert_eq!(report.leader(), None);
    }

    #[test]
    fn test_one_entry_per_normalized_agent() {
        let now = t0();
        let records = vec![
            ScannedRecord::Parsed {
                path: "logs/presence/agent-a.json".into(),
                record: PresenceRecord::new("a", "test", "", now - Duration::seconds(600)),
            },
            ScannedRecord::Parsed {
                path: "logs/presence/agent-a.json.enc".into(),
                record: PresenceRecord::new("A", "test", "", now - Duration::seconds(10)),
            },
            ScannedRecord::BadTimestamp {
                path: "logs/presence/agent-a.old".into(),
                agent_id: Some("a".into()),
                client: None,
                raw_timestamp: None,
            },
            parsed("b", now - Duration::seconds(2000)),
            parsed("b", now - Duration::seconds(3000)),
        ];
        let report = LivenessReport::classify(records, 900, now, 5, 0);

        assert_eq!(report.active_count, 1);
        assert_eq!(report.active[0].path, "logs/presence/agent-a.json.enc");
        assert_eq!(report.active[0].age_seconds, 10);
        assert_eq!(report.stale_count, 1);
        assert_eq!(report.stale[0].age_seconds, Some(2000));
        assert_eq!(report.total_files, 5);
    }
}
