// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-Memory Object Store
//!
//! Process-local implementation of [`ObjectStore`] for tests and dry runs.
//! Keeps a log of every successful `put` (path and commit message) and can be
//! told to fail reads or writes to exercise store-outage paths.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::storage::{validate_object_path, ObjectStore, StoreEntry, StoreError};

/// One successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub path: String,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    writes: Arc<RwLock<Vec<WriteRecord>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a write.
    pub fn insert(&self, path: &str, bytes: &[u8]) {
        self.objects.write().unwrap().insert(path.to_string(), bytes.to_vec());
    }

    pub fn get_bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().unwrap().get(path).cloned()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.read().unwrap().clone()
    }

    pub fn writes_to(&self, path: &str) -> usize {
        self.writes.read().unwrap().iter().filter(|w| w.path == path).count()
    }

    /// Make every `get` and `list` fail with `Unavailable`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `put` fail with `Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_reads()?;
        validate_object_path(path)?;
        Ok(self.get_bytes(path))
    }

    async fn list(&self, dir: &str) -> Result<Vec<StoreEntry>, StoreError> {
        self.check_reads()?;
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let objects = self.objects.read().unwrap();

        let mut files = BTreeSet::new();
        let mut dirs = BTreeSet::new();
        for key in objects.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((sub, _)) => {
                    dirs.insert(sub.to_string());
                }
                None => {
                    files.insert(rest.to_string());
                }
            }
        }

        Ok(dirs
            .into_iter()
            .map(StoreEntry::dir)
            .chain(files.into_iter().map(StoreEntry::file))
            .collect())
    }

    async fn put(&self, path: &str, bytes: &[u8], message: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        validate_object_path(path)?;
        self.objects.write().unwrap().insert(path.to_string(), bytes.to_vec());
        self.writes.write().unwrap().push(WriteRecord {
            path: path.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}
