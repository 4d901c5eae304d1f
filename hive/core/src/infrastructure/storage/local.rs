// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Directory Object Store
//!
//! Filesystem-backed [`ObjectStore`] for single-host and offline use. Object
//! paths map onto files below a root directory; commit messages are only
//! logged.
//!
//! **Limitations:**
//! - No history (an overwrite replaces the file)
//! - Shared only by processes that see the same directory
//!
//! Writes go to a hidden temp file in the target directory and are renamed
//! into place, so readers never observe a partial record.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use crate::domain::storage::{validate_object_path, ObjectStore, StoreEntry, StoreError};

pub struct LocalObjectStore {
    /// Root directory (e.g., "/srv/hive-store")
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StoreError::IoError(format!(
                "Failed to create store root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        validate_object_path(path)?;
        Ok(path.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg)))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, dir: &str) -> Result<Vec<StoreEntry>, StoreError> {
        let full = self.resolve(dir.trim_end_matches('/'))?;
        let mut reader = match tokio::fs::read_dir(&full).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                entries.push(StoreEntry::dir(name));
            } else if file_type.is_file() {
                entries.push(StoreEntry::file(name));
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn put(&self, path: &str, bytes: &[u8], message: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        let parent = full
            .parent()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        tokio::fs::create_dir_all(parent).await?;

        let file_name = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let tmp = parent.join(format!(".{}.tmp-{}", file_name, std::process::id()));

        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &full).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %path, message = %message, bytes = bytes.len(), "Object written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::EntryType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path()).unwrap();

        store.put("logs/presence/agent-a.json", b"{\"a\":1}", "ping").await.unwrap();
        let bytes = store.get("logs/presence/agent-a.json").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"{\"a\":1}"[..]));

        store.put("logs/presence/agent-a.json", b"{}", "ping").await.unwrap();
        assert_eq!(store.get("logs/presence/agent-a.json").await.unwrap(), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_is_none_and_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.get("logs/nothing.json").await.unwrap(), None);
        assert!(store.list("logs/presence").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_reports_files_and_dirs_without_temp_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path()).unwrap();
        store.put("inbox/a.md", b"a", "m").await.unwrap();
        store.put("inbox/sub/b.md", b"b", "m").await.unwrap();

        let entries = store.list("inbox").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], StoreEntry::file("a.md"));
        assert_eq!(entries[1].entry_type, EntryType::Dir);
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path()).unwrap();
        assert!(matches!(
            store.put("../escape.txt", b"x", "m").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(store.get("/etc/passwd").await.is_err());
    }
}
