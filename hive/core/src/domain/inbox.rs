// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Inbox Items
//!
//! Raw submissions (text, links, files) queued under `inbox/` for the
//! ingestion worker. Items are write-once markdown documents; nothing here
//! updates or deletes them.
//!
//! Keys are `inbox/<ts>__raw__agent-<slug>__<kind>.md`. Uniqueness rests on
//! second-resolution time plus agent plus kind, which is enough at
//! human submission rates.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Inbox key naming and envelope rendering

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::domain::agent::AgentSlug;

pub const INBOX_DIR: &str = "inbox";

pub const MAX_TEXT_CHARS: usize = 16_000;
pub const MAX_URL_CHARS: usize = 2_000;
pub const MAX_LINK_COMMENT_CHARS: usize = 4_000;
pub const MAX_FILE_COMMENT_CHARS: usize = 400;
pub const MAX_FILENAME_CHARS: usize = 255;
pub const MAX_CONTENT_TYPE_CHARS: usize = 255;

pub const DEFAULT_MAX_INLINE_BYTES: usize = 200_000;
pub const DEFAULT_SAMPLE_BYTES: usize = 4_096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxKind {
    Text,
    Link,
    File,
}

impl InboxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::File => "file",
        }
    }
}

impl fmt::Display for InboxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uploaded file as received by the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub comment: String,
}

/// A submission waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Text { text: String },
    Link { url: String, comment: String },
    File(FileUpload),
}

impl Submission {
    pub fn kind(&self) -> InboxKind {
        match self {
            Self::Text { .. } => InboxKind::Text,
            Self::Link { .. } => InboxKind::Link,
            Self::File(_) => InboxKind::File,
        }
    }
}

/// Size gates for file envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboxLimits {
    /// Files up to this size are inlined in full
    pub max_inline_bytes: usize,
    /// Leading bytes always sampled
    pub sample_bytes: usize,
}

impl Default for InboxLimits {
    fn default() -> Self {
        Self {
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
            sample_bytes: DEFAULT_SAMPLE_BYTES,
        }
    }
}

/// Metadata block embedded in file envelopes
///
/// Every field is bounded on its own, so the rendered JSON is never cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileManifest {
    pub filename: String,
    pub content_type: Option<String>,
    pub size: usize,
    pub sha256: String,
    pub comment: String,
    pub inline_b64: Option<String>,
    pub sample_b64: String,
}

impl FileManifest {
    pub fn build(upload: &FileUpload, limits: InboxLimits) -> Self {
        let size = upload.data.len();
        let sample = &upload.data[..size.min(limits.sample_bytes)];
        Self {
            filename: upload
                .filename
                .clone()
                .filter(|name| !name.trim().is_empty())
                .map(|name| clamp_text(&name, MAX_FILENAME_CHARS))
                .unwrap_or_else(|| "upload".to_string()),
            content_type: upload
                .content_type
                .as_deref()
                .map(|ct| clamp_text(ct, MAX_CONTENT_TYPE_CHARS)),
            size,
            sha256: sha256_hex(&upload.data),
            comment: upload.comment.chars().take(MAX_FILE_COMMENT_CHARS).collect(),
            inline_b64: (size <= limits.max_inline_bytes).then(|| STANDARD.encode(&upload.data)),
            sample_b64: STANDARD.encode(sample),
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Inbox timestamp: `YYYY-MM-DDTHH-MM-SSZ` (colons are not key-safe).
pub fn inbox_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%SZ").to_string()
}

/// Storage key for a submission (before codec suffixing).
pub fn inbox_path(at: DateTime<Utc>, agent_id: &str, kind: InboxKind) -> String {
    format!(
        "{}/{}__raw__agent-{}__{}.md",
        INBOX_DIR,
        inbox_timestamp(at),
        AgentSlug::normalize(agent_id),
        kind
    )
}

/// Cap text at `max_chars` characters and drop NULs.
pub fn clamp_text(text: &str, max_chars: usize) -> String {
    text.chars().filter(|c| *c != '\0').take(max_chars).collect()
}

/// Render the markdown envelope for a submission.
pub fn render_envelope(agent_id: &str, submission: &Submission, limits: InboxLimits) -> String {
    match submission {
        Submission::Text { text } => format!(
            "# RAW (text)\n\nAgent: {}\n\n{}\n",
            agent_id,
            clamp_text(text, MAX_TEXT_CHARS)
        ),
        Submission::Link { url, comment } => format!(
            "# RAW (link)\n\nAgent: {}\n\nURL: {}\n\nComment: {}\n",
            agent_id,
            clamp_text(url.trim(), MAX_URL_CHARS),
            clamp_text(comment, MAX_LINK_COMMENT_CHARS)
        ),
        Submission::File(upload) => {
            let manifest = FileManifest::build(upload, limits);
            // Serializing a struct of strings and integers cannot fail.
            let json = serde_json::to_string_pretty(&manifest).unwrap_or_default();
            format!("# RAW (file)\n\nAgent: {}\n\n```json\n{}\n```\n", agent_id, json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap()
    }

    #[test]
    fn test_inbox_path() {
        assert_eq!(
            inbox_path(at(), "Main Agent", InboxKind::Link),
            "inbox/2026-03-01T09-05-07Z__raw__agent-main-agent__link.md"
        );
    }

    #[test]
    fn test_text_envelope() {
        let body = render_envelope(
            "main",
            &Submission::Text { text: "hello\0 hive".to_string() },
            InboxLimits::default(),
        );
        assert_eq!(body, "# RAW (text)\n\nAgent: main\n\nhello hive\n");
    }

    #[test]
    fn test_text_is_capped() {
        let body = render_envelope(
            "main",
            &Submission::Text { text: "x".repeat(MAX_TEXT_CHARS + 50) },
            InboxLimits::default(),
        );
        assert_eq!(body.matches('x').count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_link_envelope() {
        let body = render_envelope(
            "main",
            &Submission::Link {
                url: "  https://example.org/a  ".to_string(),
                comment: "read later".to_string(),
            },
            InboxLimits::default(),
        );
        assert!(body.starts_with("# RAW (link)\n"));
        assert!(body.contains("URL: https://example.org/a\n"));
        assert!(body.contains("Comment: read later\n"));
    }

    #[test]
    fn test_file_manifest_inline_under_threshold() {
        let upload = FileUpload {
            filename: Some("notes.txt".to_string()),
            content_type: Some("text/plain".to_string()),
            data: b"abc".to_vec(),
            comment: String::new(),
        };
        let manifest = FileManifest::build(&upload, InboxLimits::default());
        assert_eq!(manifest.size, 3);
        assert_eq!(
            manifest.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(manifest.inline_b64.as_deref(), Some("YWJj"));
        assert_eq!(manifest.sample_b64, "YWJj");
    }

    #[test]
    fn test_file_manifest_sample_only_over_threshold() {
        let upload = FileUpload {
            filename: None,
            content_type: None,
            data: vec![7u8; 64],
            comment: "c".repeat(1000),
        };
        let limits = InboxLimits { max_inline_bytes: 16, sample_bytes: 8 };
        let manifest = FileManifest::build(&upload, limits);
        assert_eq!(manifest.filename, "upload");
        assert!(manifest.inline_b64.is_none());
        assert_eq!(STANDARD.decode(&manifest.sample_b64).unwrap(), vec![7u8; 8]);
        assert_eq!(manifest.comment.len(), MAX_FILE_COMMENT_CHARS);
    }

    #[test]
    fn test_file_envelope_embeds_json() {
        let upload = FileUpload {
            filename: Some("a.bin".to_string()),
            content_type: None,
            data: vec![1, 2, 3],
            comment: String::new(),
        };
        let body = render_envelope("main", &Submission::File(upload), InboxLimits::default());
        let json = body
            .split("```json\n")
            .nth(1)
            .and_then(|rest| rest.split("\n```").next())
            .unwrap();
        let manifest: FileManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.filename, "a.bin");
        assert_eq!(manifest.size, 3);
    }

    #[test]
    fn test_inline_file_near_threshold_stays_parseable() {
        let data: Vec<u8> = (0..180_000u32).map(|i| (i % 256) as u8).collect();
        let upload = FileUpload {
            filename: Some("x".repeat(1_000)),
            content_type: Some("application/octet-stream".to_string()),
            data: data.clone(),
            comment: String::new(),
        };
        let body = render_envelope("main", &Submission::File(upload), InboxLimits::default());
        let json = body
            .split("```json\n")
            .nth(1)
            .and_then(|rest| rest.split("\n```").next())
            .unwrap();
        let manifest: FileManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.size, 180_000);
        assert_eq!(manifest.filename.chars().count(), MAX_FILENAME_CHARS);
        assert_eq!(STANDARD.decode(manifest.inline_b64.unwrap()).unwrap(), data);
    }
}
