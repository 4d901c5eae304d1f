// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Identity
//!
//! Agents identify themselves with arbitrary free-text ids. Everything that
//! lands in the shared store is keyed by the normalized [`AgentSlug`] instead,
//! so two spellings of the same id ("Main", "main ") collapse onto one record
//! and every key is safe for a file path.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Normalizes agent ids into storage-safe slugs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 80;

/// Placeholder used when normalization leaves nothing behind.
pub const UNKNOWN_AGENT: &str = "unknown";

/// Filesystem-safe, normalized agent identifier.
///
/// Slugs only contain lowercase ASCII alphanumerics, `-` and `_`, never start
/// or end with `-`, and are at most [`MAX_SLUG_LEN`] characters long. Ordering
/// is plain lexicographic byte order, which is what leader selection relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentSlug(String);

impl AgentSlug {
    /// Normalize an arbitrary agent id.
    ///
    /// # Examples
    /// ```
    /// use hive_core::domain::agent::AgentSlug;
    ///
    /// assert_eq!(AgentSlug::normalize("Main Agent").as_str(), "main-agent");
    /// assert_eq!(AgentSlug::normalize("ñandú/01").as_str(), "and-01");
    /// assert_eq!(AgentSlug::normalize("   ").as_str(), "unknown");
    /// ```
    pub fn normalize(raw: &str) -> Self {
        Self(slugify(raw, MAX_SLUG_LEN).unwrap_or_else(|| UNKNOWN_AGENT.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AgentSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentSlug {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

/// Lowercase, replace every run of characters outside `[a-z0-9_]` with a
/// single `-`, trim dashes and cap the length. Returns `None` when the input
/// has no usable characters.
///
/// Also used for inbox kind tags, which share the same key alphabet.
pub fn slugify(raw: &str, max_len: usize) -> Option<String> {
    let mut out = String::with_capacity(raw.len().min(max_len));
    let mut pending_dash = false;

    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
        if out.len() >= max_len {
            break;
        }
    }

    out.truncate(max_len);
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
