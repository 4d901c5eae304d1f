// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Store Factory - Application Layer
//!
//! Creates the concrete object store and payload codec selected by the hive
//! configuration. Domain code only ever sees `Arc<dyn ObjectStore>` and
//! `Arc<dyn PayloadCodec>`.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wires configuration to infrastructure adapters

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::codec::PayloadCodec;
use crate::domain::hive_config::{StoreBackend, StoreConfig};
use crate::domain::storage::{ObjectStore, StoreError};
use crate::infrastructure::codec::EnvelopeCodec;
use crate::infrastructure::storage::github::GitHubContentsStore;
use crate::infrastructure::storage::local::LocalObjectStore;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Store configuration incomplete: {0}")]
    Incomplete(String),

    #[error("Failed to initialise object store: {0}")]
    Store(#[from] StoreError),
}

/// Creates an ObjectStore implementation based on the configured backend
pub fn create_object_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, FactoryError> {
    create_object_store_with(config, |key| std::env::var(key).ok())
}

/// Same as [`create_object_store`] with an explicit environment lookup.
pub fn create_object_store_with<F>(
    config: &StoreConfig,
    env: F,
) -> Result<Arc<dyn ObjectStore>, FactoryError>
where
    F: Fn(&str) -> Option<String>,
{
    match config.backend {
        StoreBackend::Github => {
            let repo = config
                .repo
                .clone()
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| FactoryError::Incomplete("store.repo is not set".to_string()))?;
            let token = env(&config.token_env)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    FactoryError::Incomplete(format!("{} is not set", config.token_env))
                })?;
            let store = GitHubContentsStore::new(
                &config.api_url,
                repo,
                config.branch.clone(),
                token,
                Duration::from_millis(config.timeout_ms),
            )?;
            Ok(Arc::new(store))
        }
        StoreBackend::Local => {
            let root = config.root.clone().ok_or_else(|| {
                FactoryError::Incomplete("store.root is required for the local backend".to_string())
            })?;
            Ok(Arc::new(LocalObjectStore::new(root)?))
        }
    }
}

/// Creates the payload codec from `HIVE_PSK` / `HIVE_PRIVATE_KEY`
pub fn create_codec() -> Arc<dyn PayloadCodec> {
    Arc::new(EnvelopeCodec::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_factory_local() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Local,
            root: Some(temp_dir.path().to_path_buf()),
            ..StoreConfig::default()
        };
        let store = create_object_store_with(&config, |_| None).unwrap();
        assert!(Arc::strong_count(&store) == 1);
    }

    #[test]
    fn test_factory_github_requires_token() {
        let config = StoreConfig { repo: Some("acme/hive".into()), ..StoreConfig::default() };
        let err = create_object_store_with(&config, |_| None).err().unwrap();
        assert!(err.to_string().contains("GITHUB_TOKEN"));

        let store = create_object_store_with(&config, |key| {
            (key == "GITHUB_TOKEN").then(|| "ghp_test".to_string())
        });
        assert!(store.is_ok());
    }

    #[test]
    fn test_factory_github_requires_repo() {
        let config = StoreConfig::default();
        let err = create_object_store_with(&config, |_| Some("t".into())).err().unwrap();
        assert!(matches!(err, FactoryError::Incomplete(_)));
    }
}
