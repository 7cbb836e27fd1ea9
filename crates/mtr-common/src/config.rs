//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Shared primitives and utilities for the core runtime."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Host of the tenant management service when nothing else is configured.
pub const DEFAULT_MANAGEMENT_HOST: &str = "tenant-management";
/// Port of the tenant management service when nothing else is configured.
pub const DEFAULT_MANAGEMENT_PORT: u16 = 9000;

fn default_management_host() -> String {
    DEFAULT_MANAGEMENT_HOST.to_owned()
}

fn default_management_port() -> u16 {
    DEFAULT_MANAGEMENT_PORT
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_ready_marker() -> PathBuf {
    PathBuf::from("configs/ready")
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_tenants_root() -> PathBuf {
    PathBuf::from("configs/tenants")
}

fn default_registry_shards() -> usize {
    16
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the multitenant runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub management: ManagementConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub tenants: TenantsConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "MTR_CONFIG";

    /// Load configuration from disk, respecting the `MTR_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.management.validate()?;
        self.registry.validate()?;
        self.tenants.validate()?;
        if let Some(timeout) = self.readiness.timeout {
            if timeout.is_zero() {
                return Err(anyhow!("readiness timeout must be greater than zero"));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Location of the tenant management service.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementConfig {
    #[serde(default = "default_management_host")]
    pub host: String,
    #[serde(default = "default_management_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub connect_timeout: Duration,
}

impl ManagementConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("management host cannot be empty"));
        }
        if self.port == 0 {
            return Err(anyhow!("management port must be non-zero"));
        }
        Ok(())
    }
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            host: default_management_host(),
            port: default_management_port(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Controls how long the orchestrator waits for tenant configuration to settle.
///
/// A missing `timeout` keeps the wait unbounded.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_ready_marker")]
    pub marker: PathBuf,
    #[serde(default)]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
    #[serde(default = "default_poll_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            marker: default_ready_marker(),
            timeout: None,
            poll_interval: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantsConfig {
    /// Directory whose subfolders each describe one tenant.
    #[serde(default = "default_tenants_root")]
    pub root: PathBuf,
    /// Tenants declared inline; used instead of `root` when non-empty.
    #[serde(default, rename = "static")]
    pub static_tenants: Vec<StaticTenantConfig>,
}

impl TenantsConfig {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for tenant in &self.static_tenants {
            if tenant.id.trim().is_empty() {
                return Err(anyhow!("static tenant id cannot be empty"));
            }
            if !seen.insert(tenant.id.as_str()) {
                return Err(anyhow!("static tenant '{}' declared twice", tenant.id));
            }
        }
        Ok(())
    }
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            root: default_tenants_root(),
            static_tenants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticTenantConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_shards")]
    pub shards: usize,
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(anyhow!("registry must use at least one shard"));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            shards: default_registry_shards(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
