// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-process service wiring
//!
//! Every command runs against the shared store directly; there is no
//! long-lived daemon to delegate to. This module turns the loaded
//! configuration into the services the commands call.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hive_core::{
    application::{
        inbox::InboxService,
        lifecycle::{LifecycleController, LifecycleSettings},
        presence::PresenceService,
        store_factory::{create_codec, create_object_store},
    },
    domain::{
        clock::{Clock, SystemClock},
        codec::PayloadCodec,
        hive_config::HiveConfigManifest,
        inbox::InboxLimits,
        process::ServerLaunch,
        storage::ObjectStore,
    },
    infrastructure::{FileLifecycleStateStore, OsProcessControl},
};

pub struct HiveServices {
    pub config: HiveConfigManifest,
    config_path: Option<PathBuf>,
    store: Arc<dyn ObjectStore>,
    codec: Arc<dyn PayloadCodec>,
    clock: Arc<dyn Clock>,
    presence: Arc<PresenceService>,
}

impl HiveServices {
    /// Load, validate and wire the configuration found at `config_path` (or
    /// through discovery).
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = HiveConfigManifest::load_or_default(config_path.clone())
            .context("Failed to load configuration")?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Self::from_config(config, config_path)
    }

    pub fn from_config(config: HiveConfigManifest, config_path: Option<PathBuf>) -> Result<Self> {
        let store = create_object_store(&config.spec.store)
            .context("Failed to initialise the object store")?;
        let codec = create_codec();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let presence = Arc::new(PresenceService::new(store.clone(), codec.clone(), clock.clone()));

        tracing::debug!(
            agent_id = %config.spec.agent.id,
            backend = ?config.spec.store.backend,
            encrypted = codec.is_enabled(),
            "Services initialised"
        );

        Ok(Self { config, config_path, store, codec, clock, presence })
    }

    pub fn agent_id(&self) -> &str {
        &self.config.spec.agent.id
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.config.spec.presence.ttl_seconds
    }

    pub fn presence(&self) -> Arc<PresenceService> {
        self.presence.clone()
    }

    pub fn inbox(&self) -> Arc<InboxService> {
        let limits = InboxLimits {
            max_inline_bytes: self.config.spec.ui.max_inline_bytes,
            sample_bytes: self.config.spec.ui.sample_bytes,
        };
        Arc::new(InboxService::new(
            self.store.clone(),
            self.codec.clone(),
            self.clock.clone(),
            limits,
        ))
    }

    /// Host-local lifecycle state next to the configured snapshot path.
    pub fn state_store(&self) -> Arc<FileLifecycleStateStore> {
        Arc::new(FileLifecycleStateStore::new(self.config.spec.ui.resolved_state_path()))
    }

    /// Controller that re-executes this binary as `hive ui serve` when the
    /// node has to host.
    pub fn lifecycle_controller(&self) -> Result<LifecycleController> {
        let state = self.state_store();
        let launch = self.server_launch(&state.log_path())?;
        let ui = &self.config.spec.ui;

        let settings = LifecycleSettings {
            agent_id: self.agent_id().to_string(),
            ttl_seconds: self.ttl_seconds(),
            bind: ui.bind.clone(),
            port: ui.port,
            public_url: ui.advertised_url(),
            launch,
        };

        Ok(LifecycleController::new(
            self.presence.clone(),
            self.store.clone(),
            self.codec.clone(),
            self.clock.clone(),
            Arc::new(OsProcessControl::new()),
            state,
            settings,
        ))
    }

    fn server_launch(&self, log_path: &Path) -> Result<ServerLaunch> {
        let program = std::env::current_exe().context("Failed to resolve the hive executable")?;
        let ui = &self.config.spec.ui;

        let mut args = Vec::new();
        if let Some(path) = &self.config_path {
            args.push("--config".to_string());
            args.push(path.display().to_string());
        }
        args.extend([
            "ui".to_string(),
            "serve".to_string(),
            "--bind".to_string(),
            ui.bind.clone(),
            "--port".to_string(),
            ui.port.to_string(),
        ]);

        Ok(ServerLaunch {
            program,
            args,
            log_path: log_path.to_path_buf(),
            working_dir: std::env::current_dir().ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::domain::hive_config::StoreBackend;
    use tempfile::TempDir;

    fn local_config(dir: &TempDir) -> HiveConfigManifest {
        let mut config = HiveConfigManifest::default();
        config.spec.store.backend = StoreBackend::Local;
        config.spec.store.root = Some(dir.path().join("store"));
        config.spec.ui.state_path = Some(dir.path().join("state").join("ui_state.json"));
        config.spec.ui.port = 49001;
        config
    }

    #[test]
    fn test_server_launch_re_execs_ui_serve() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("hive-config.yaml");
        let services =
            HiveServices::from_config(local_config(&dir), Some(config_path.clone())).unwrap();

        let launch = services.server_launch(Path::new("/tmp/ui.log")).unwrap();
        assert_eq!(
            launch.args,
            vec![
                "--config".to_string(),
                config_path.display().to_string(),
                "ui".into(),
                "serve".into(),
                "--bind".into(),
                "127.0.0.1".into(),
                "--port".into(),
                "49001".into(),
            ]
        );
        assert_eq!(launch.log_path, PathBuf::from("/tmp/ui.log"));
    }

    #[test]
    fn test_controller_uses_configured_settings() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir);
        config.spec.agent.id = "Scout".into();
        config.spec.presence.ttl_seconds = 120;
        config.spec.ui.public_url = Some("https://hive.example.org/".into());
        let services = HiveServices::from_config(config, None).unwrap();

        let controller = services.lifecycle_controller().unwrap();
        let settings = controller.settings();
        assert_eq!(settings.agent_id, "Scout");
        assert_eq!(settings.ttl_seconds, 120);
        assert_eq!(settings.public_url, "https://hive.example.org/");
        assert_eq!(settings.launch.log_path, dir.path().join("state").join("ui_state.log"));
        assert!(!settings.launch.args.contains(&"--config".to_string()));
    }
}
