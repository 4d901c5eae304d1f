// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Object Store Trait - Anti-Corruption Layer for the shared repository
//!
//! The shared store is a version-controlled file repository reached through
//! three calls: `get`, `list` and `put`. It offers no compare-and-swap, no
//! transactions and only approximate read-after-write consistency across
//! agents, and every coordination primitive in this crate is built to live
//! with that.
//!
//! Every service takes the store as an injected `Arc<dyn ObjectStore>`; it is
//! never reached through global state, which lets tests substitute
//! [`InMemoryObjectStore`](crate::infrastructure::storage::memory::InMemoryObjectStore).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entry type reported by `list`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
    /// Anything else the backend reports (symlinks, submodules)
    #[serde(other)]
    Other,
}

/// Directory entry
///
/// Represents a single entry directly under a listed directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreEntry {
    /// File/directory name (not including the directory path)
    pub name: String,
    /// Entry type
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

impl StoreEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self { name: name.into(), entry_type: EntryType::File }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self { name: name.into(), entry_type: EntryType::Dir }
    }

    /// Regular, non-hidden file.
    pub fn is_visible_file(&self) -> bool {
        self.entry_type == EntryType::File && !self.name.is_empty() && !self.name.starts_with('.')
    }
}

/// Shared object store trait
///
/// Paths are `/`-separated and relative to the repository root
/// (e.g. `logs/presence/agent-main.json`).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` - Object content
    /// * `Ok(None)` - No object at `path`
    /// * `Err(StoreError)` if the backend could not be reached
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// List entries directly under a directory
    ///
    /// A missing directory lists as empty.
    async fn list(&self, dir: &str) -> Result<Vec<StoreEntry>, StoreError>;

    /// Create or overwrite an object as a single commit
    ///
    /// # Arguments
    /// * `path` - Object path
    /// * `bytes` - Full new content
    /// * `message` - Commit message recorded by versioned backends
    async fn put(&self, path: &str, bytes: &[u8], message: &str) -> Result<(), StoreError>;
}

/// Object store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout while communicating with object store")]
    Timeout,

    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Write conflict on {0}")]
    Conflict(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown store error: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Whether a later cycle can reasonably expect the same call to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_)
                | StoreError::Timeout
                | StoreError::Unavailable(_)
                | StoreError::Conflict(_)
        )
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_connect() || err.is_request() {
            StoreError::Network(err.to_string())
        } else if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else {
            StoreError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::IoError(err.to_string())
    }
}

/// Reject paths that could escape the repository root.
pub fn validate_object_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    if path.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Join a directory and an entry name into an object path.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_file_filter() {
        assert!(StoreEntry::file("agent-main.json").is_visible_file());
        assert!(!StoreEntry::file(".gitkeep").is_visible_file());
        assert!(!StoreEntry::dir("archive").is_visible_file());
        assert!(!StoreEntry::file("").is_visible_file());
    }

    #[test]
    fn test_entry_type_deserializes_unknown_as_other() {
        let entry: StoreEntry =
            serde_json::from_str(r#"{"name":"sub","type":"submodule"}"#).unwrap();
        assert_eq!(entry.entry_type, EntryType::Other);
    }

    #[test]
    fn test_validate_object_path() {
        assert!(validate_object_path("logs/presence/agent-a.json").is_ok());
        assert!(validate_object_path("/etc/passwd").is_err());
        assert!(validate_object_path("logs/../secrets").is_err());
        assert!(validate_object_path("logs//x").is_err());
        assert!(validate_object_path("").is_err());
        assert!(validate_object_path("a\\b").is_err());
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("logs/presence", "a.json"), "logs/presence/a.json");
        assert_eq!(join_path("logs/presence/", "a.json"), "logs/presence/a.json");
        assert_eq!(join_path("", "a.json"), "a.json");
    }

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Timeout.is_transient());
        assert!(StoreError::Conflict("x".into()).is_transient());
        assert!(!StoreError::PermissionDenied("x".into()).is_transient());
        assert!(!StoreError::InvalidPath("x".into()).is_transient());
    }
}
