// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Inbox Service
//!
//! Turns a raw submission into a markdown envelope and writes it once under
//! `inbox/`. There is no dedup, no retry and no read path here.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** `submit` for text, link and file submissions

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::domain::clock::Clock;
use crate::domain::codec::{CodecError, PayloadCodec};
use crate::domain::inbox::{inbox_path, render_envelope, InboxLimits, Submission};
use crate::domain::storage::{ObjectStore, StoreError};

/// Where a submission landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxReceipt {
    pub path: String,
    pub encrypted: bool,
}

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Submission rejected: {0}")]
    InvalidSubmission(String),

    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

pub struct InboxService {
    store: Arc<dyn ObjectStore>,
    codec: Arc<dyn PayloadCodec>,
    clock: Arc<dyn Clock>,
    limits: InboxLimits,
}

impl InboxService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        codec: Arc<dyn PayloadCodec>,
        clock: Arc<dyn Clock>,
        limits: InboxLimits,
    ) -> Self {
        Self { store, codec, clock, limits }
    }

    pub async fn submit(
        &self,
        agent_id: &str,
        submission: Submission,
    ) -> Result<InboxReceipt, InboxError> {
        validate(&submission)?;

        let kind = submission.kind();
        let path = inbox_path(self.clock.now(), agent_id, kind);
        let body = render_envelope(agent_id, &submission, self.limits);
        let encoded = self.codec.encode(&path, body.into_bytes())?;

        let mut message = format!("hive-ui: submit raw ({})", kind);
        if encoded.encrypted {
            message.push_str(" (enc)");
        }

        self.store.put(&encoded.path, &encoded.bytes, &message).await?;

        metrics::counter!("hive_inbox_submissions_total", "kind" => kind.as_str()).increment(1);
        info!(agent_id = %agent_id, kind = %kind, path = %encoded.path, "Inbox item written");

        Ok(InboxReceipt { path: encoded.path, encrypted: encoded.encrypted })
    }
}

fn validate(submission: &Submission) -> Result<(), InboxError> {
    match submission {
        Submission::Text { text } if text.trim().is_empty() => {
            Err(InboxError::InvalidSubmission("text is empty".to_string()))
        }
        Submission::Link { url, .. } if url.trim().is_empty() => {
            Err(InboxError::InvalidSubmission("url is empty".to_string()))
        }
        _ => Ok(()),
    }
}
