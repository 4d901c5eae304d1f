// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Hive Configuration Types
//
// Defines the configuration schema for a Hive agent host, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Agent identity
// - Shared object store backend (GitHub contents API or local directory)
// - Presence TTL and UI hosting parameters
// - Observability settings
//
// Secrets (store token, payload key material) are never read from the file;
// the manifest only names the environment variables that carry them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::inbox::{DEFAULT_MAX_INLINE_BYTES, DEFAULT_SAMPLE_BYTES};
use crate::domain::presence::DEFAULT_TTL_SECONDS;

pub const API_VERSION: &str = "hive/v1";
pub const KIND: &str = "HiveConfig";

/// Top-level Kubernetes-style hive configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfigManifest {
    /// API version (must be "hive/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "HiveConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: HiveConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable host name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HiveConfigSpec {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub presence: PresenceConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent id advertised in presence records (free text; normalized for keys)
    #[serde(default = "default_agent_id")]
    pub id: String,

    /// Label of the reporting software
    #[serde(default = "default_client")]
    pub client: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// GitHub repository contents API
    Github,
    /// Plain directory tree (single host / offline)
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// `owner/name` of the shared repository (github backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Root directory (local backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,

    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_ui_port")]
    pub port: u16,

    /// URL advertised in the endpoint announcement (default `http://bind:port/`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Local snapshot file; PID and log files live next to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,

    #[serde(default = "default_max_inline_bytes")]
    pub max_inline_bytes: usize,

    #[serde(default = "default_sample_bytes")]
    pub sample_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics exposition
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_agent_id() -> String {
    "main".to_string()
}

fn default_client() -> String {
    "hive-cli".to_string()
}

fn default_backend() -> StoreBackend {
    StoreBackend::Github
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_ttl() -> u64 {
    DEFAULT_TTL_SECONDS
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_ui_port() -> u16 {
    48765
}

fn default_max_inline_bytes() -> usize {
    DEFAULT_MAX_INLINE_BYTES
}

fn default_sample_bytes() -> usize {
    DEFAULT_SAMPLE_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { id: default_agent_id(), client: default_client() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            repo: None,
            branch: default_branch(),
            api_url: default_api_url(),
            token_env: default_token_env(),
            root: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self { ttl_seconds: default_ttl(), note: String::new() }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_ui_port(),
            public_url: None,
            state_path: None,
            max_inline_bytes: default_max_inline_bytes(),
            sample_bytes: default_sample_bytes(),
        }
    }
}

impl Default for HiveConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "hive-agent".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: HiveConfigSpec::default(),
        }
    }
}

impl UiConfig {
    /// URL published in the endpoint announcement.
    pub fn advertised_url(&self) -> String {
        self.public_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| format!("http://{}:{}/", self.bind, self.port))
    }

    /// Snapshot file location.
    ///
    /// Falls back to `<data_local_dir>/hive/ui_state.json`, or
    /// `./.hive/ui_state.json` when the platform has no data directory.
    pub fn resolved_state_path(&self) -> PathBuf {
        if let Some(path) = &self.state_path {
            return path.clone();
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("hive"))
            .unwrap_or_else(|| PathBuf::from(".hive"))
            .join("ui_state.json")
    }
}

impl HiveConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. HIVE_CONFIG_PATH environment variable
    /// 2. ./hive-config.yaml (working directory)
    /// 3. ~/.hive/config.yaml (user home)
    /// 4. /etc/hive/config.yaml (system, Unix) or C:\ProgramData\Hive\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HIVE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./hive-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hive").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/hive/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Hive\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // 1. Explicit CLI path (Fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        // 2. Discovery (Env -> Cwd -> Home -> System)
        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (env in production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(val) = get("HIVE_AGENT_ID") {
            self.spec.agent.id = val;
        }
        if let Some(val) = get("HIVE_REPO") {
            self.spec.store.repo = Some(val);
        }
        if let Some(val) = get("HIVE_BRANCH") {
            self.spec.store.branch = val;
        }
        if let Some(val) = get("HIVE_STORE_ROOT") {
            self.spec.store.backend = StoreBackend::Local;
            self.spec.store.root = Some(PathBuf::from(val));
        }
        if let Some(val) = get("HIVE_UI_BIND") {
            self.spec.ui.bind = val;
        }
        if let Some(val) = get("HIVE_UI_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.spec.ui.port = port,
                Err(_) => tracing::warn!(
                    "Invalid value for HIVE_UI_PORT: '{}'. Expected a port number. Ignoring.",
                    val
                ),
            }
        }
        if let Some(val) = get("HIVE_UI_PUBLIC_URL") {
            self.spec.ui.public_url = Some(val);
        }
        if let Some(val) = get("HIVE_UI_MAX_INLINE_BYTES") {
            match val.parse::<usize>() {
                Ok(bytes) => self.spec.ui.max_inline_bytes = bytes,
                Err(_) => tracing::warn!(
                    "Invalid value for HIVE_UI_MAX_INLINE_BYTES: '{}'. Expected a byte count. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.agent.id.trim().is_empty() {
            anyhow::bail!("spec.agent.id cannot be empty");
        }

        match self.spec.store.backend {
            StoreBackend::Github => {
                let repo = self.spec.store.repo.as_deref().unwrap_or_default();
                let mut parts = repo.split('/');
                let valid = matches!(
                    (parts.next(), parts.next(), parts.next()),
                    (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
                );
                if !valid {
                    anyhow::bail!(
                        "spec.store.repo must be 'owner/name' for the github backend (got '{}')",
                        repo
                    );
                }
                if self.spec.store.branch.is_empty() {
                    anyhow::bail!("spec.store.branch cannot be empty");
                }
            }
            StoreBackend::Local => {
                if self.spec.store.root.is_none() {
                    anyhow::bail!("spec.store.root is required for the local backend");
                }
            }
        }

        if self.spec.store.timeout_ms == 0 {
            anyhow::bail!("spec.store.timeout_ms must be greater than zero");
        }

        if self.spec.ui.port == 0 {
            anyhow::bail!("spec.ui.port must be greater than zero");
        }

        if self.spec.ui.max_inline_bytes == 0 || self.spec.ui.sample_bytes == 0 {
            anyhow::bail!("spec.ui.max_inline_bytes and spec.ui.sample_bytes must be greater than zero");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn github_manifest() -> HiveConfigManifest {
        let mut manifest = HiveConfigManifest::default();
        manifest.spec.store.repo = Some("acme/hive".to_string());
        manifest
    }

    #[test]
    fn test_default_manifest() {
        let manifest = HiveConfigManifest::default();
        assert_eq!(manifest.api_version, "hive/v1");
        assert_eq!(manifest.kind, "HiveConfig");
        assert_eq!(manifest.spec.presence.ttl_seconds, 900);
        assert_eq!(manifest.spec.ui.port, 48765);
        assert_eq!(manifest.spec.store.backend, StoreBackend::Github);
    }

    #[test]
    fn test_yaml_minimal_spec_uses_defaults() {
        let yaml = r#"
apiVersion: hive/v1
kind: HiveConfig
metadata:
  name: laptop
spec:
  agent:
    id: Main
  store:
    repo: acme/hive
"#;
        let manifest = HiveConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.agent.id, "Main");
        assert_eq!(manifest.spec.agent.client, "hive-cli");
        assert_eq!(manifest.spec.store.branch, "main");
        assert_eq!(manifest.spec.ui.bind, "127.0.0.1");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut manifest = github_manifest();
        manifest.spec.ui.public_url = Some("https://hive.example.org/".to_string());
        manifest.spec.observability = Some(ObservabilityConfig {
            logging: Some(LoggingConfig { level: "debug".into(), format: "json".into() }),
            metrics: None,
        });

        let yaml = serde_yaml::to_string(&manifest).unwrap();
        let parsed = HiveConfigManifest::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.spec.store.repo.as_deref(), Some("acme/hive"));
        assert_eq!(parsed.spec.ui.public_url.as_deref(), Some("https://hive.example.org/"));
        assert_eq!(
            parsed.spec.observability.unwrap().logging.unwrap().format,
            "json"
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("HIVE_AGENT_ID", "worker-2"),
            ("HIVE_REPO", "acme/other"),
            ("HIVE_UI_PORT", "9000"),
            ("HIVE_UI_MAX_INLINE_BYTES", "not-a-number"),
            ("HIVE_BRANCH", "   "),
        ]);
        let mut manifest = HiveConfigManifest::default();
        manifest.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(manifest.spec.agent.id, "worker-2");
        assert_eq!(manifest.spec.store.repo.as_deref(), Some("acme/other"));
        assert_eq!(manifest.spec.ui.port, 9000);
        assert_eq!(manifest.spec.ui.max_inline_bytes, DEFAULT_MAX_INLINE_BYTES);
        assert_eq!(manifest.spec.store.branch, "main");
    }

    #[test]
    fn test_store_root_override_switches_backend() {
        let mut manifest = HiveConfigManifest::default();
        manifest.apply_overrides(|key| (key == "HIVE_STORE_ROOT").then(|| "/srv/hive".to_string()));
        assert_eq!(manifest.spec.store.backend, StoreBackend::Local);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut manifest = github_manifest();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "WrongKind".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.store.repo = Some("no-slash".to_string());
        assert!(manifest.validate().is_err());
        manifest.spec.store.repo = Some("acme/hive".to_string());

        manifest.spec.ui.port = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.ui.port = 48765;

        manifest.spec.store.backend = StoreBackend::Local;
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_advertised_url() {
        let mut ui = UiConfig::default();
        assert_eq!(ui.advertised_url(), "http://127.0.0.1:48765/");
        ui.public_url = Some("https://hive.example.org/".to_string());
        assert_eq!(ui.advertised_url(), "https://hive.example.org/");
    }

    #[test]
    fn test_state_path_override() {
        let ui = UiConfig { state_path: Some(PathBuf::from("/tmp/x.json")), ..UiConfig::default() };
        assert_eq!(ui.resolved_state_path(), PathBuf::from("/tmp/x.json"));
        assert!(UiConfig::default().resolved_state_path().ends_with("ui_state.json"));
    }
}
