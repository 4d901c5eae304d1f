// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Payload Codec
//!
//! Optional, configuration-gated wrapping of payload bytes around store I/O.
//! The contract is tri-state from the caller's point of view:
//!
//! - **disabled**: `encode` passes bytes and path through untouched
//! - **enabled**: `encode` wraps the bytes and may suffix the path
//! - `decode` is always safe to call and must recognise unwrapped input
//!
//! Callers always pair every read with `decode`, so records written by agents
//! running with a different setting are still readable (or cleanly rejected).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Defines the encryption capability consumed by store writers

use thiserror::Error;

/// Result of encoding a payload for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Path the payload must be written to (possibly suffixed)
    pub path: String,
    pub bytes: Vec<u8>,
    /// Whether the payload was actually wrapped
    pub encrypted: bool,
}

pub trait PayloadCodec: Send + Sync {
    /// Whether key material is configured.
    fn is_enabled(&self) -> bool;

    fn encode(&self, path: &str, bytes: Vec<u8>) -> Result<Encoded, CodecError>;

    /// Unwrap a payload read from the store. Plain payloads are returned as-is.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Codec errors
///
/// `Rejected` deliberately does not say whether the key was wrong or the
/// payload corrupt.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is sealed but no key material is configured")]
    KeyUnavailable,

    #[error("sealed payload rejected")]
    Rejected,

    #[error("failed to seal payload: {0}")]
    Seal(String),
}
