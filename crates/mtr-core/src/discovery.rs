//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use mtr_common::TenantsConfig;
use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::engine::TenantDescriptor;

/// File inside a tenant directory carrying optional metadata.
pub const TENANT_MANIFEST: &str = "tenant.toml";

/// Source of the tenants an orchestrator should host.
#[async_trait]
pub trait TenantDiscovery: Send + Sync {
    async fn discover_tenant_configurations(&self) -> Result<Vec<TenantDescriptor>>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TenantManifest {
    name: Option<String>,
    labels: IndexMap<String, String>,
}

/// Treats every subdirectory of `root` as a tenant, ordered by directory name.
#[derive(Debug, Clone)]
pub struct DirectoryTenantDiscovery {
    root: PathBuf,
}

impl DirectoryTenantDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan(root: &Path) -> Result<Vec<TenantDescriptor>> {
        if !root.is_dir() {
            bail!("tenant root {} is not a directory", root.display());
        }
        let mut tenants = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(tenant_id) = entry.file_name().to_str() else {
                debug!(path = %entry.path().display(), "skipping non-utf8 tenant directory");
                continue;
            };
            if tenant_id.starts_with('.') {
                continue;
            }
            tenants.push(Self::describe(tenant_id, entry.path())?);
        }
        Ok(tenants)
    }

    fn describe(tenant_id: &str, dir: &Path) -> Result<TenantDescriptor> {
        let mut descriptor = TenantDescriptor::new(tenant_id).with_config_root(dir);
        let manifest_path = dir.join(TENANT_MANIFEST);
        if manifest_path.is_file() {
            let raw = fs::read_to_string(&manifest_path)
                .with_context(|| format!("failed to read {}", manifest_path.display()))?;
            let manifest: TenantManifest = toml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", manifest_path.display()))?;
            if let Some(name) = manifest.name {
                descriptor.name = name;
            }
            descriptor.labels = manifest.labels;
        }
        Ok(descriptor)
    }
}

#[async_trait]
impl TenantDiscovery for DirectoryTenantDiscovery {
    async fn discover_tenant_configurations(&self) -> Result<Vec<TenantDescriptor>> {
        let root = self.root.clone();
        let tenants = tokio::task::spawn_blocking(move || Self::scan(&root))
            .await
            .context("tenant directory scan panicked")??;
        info!(root = %self.root.display(), tenants = tenants.len(), "tenant directories discovered");
        Ok(tenants)
    }
}

/// Fixed tenant list, typically from the `[tenants]` config table.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantDiscovery {
    tenants: Vec<TenantDescriptor>,
}

impl StaticTenantDiscovery {
    pub fn new(tenants: Vec<TenantDescriptor>) -> Self {
        Self { tenants }
    }

    pub fn from_config(config: &TenantsConfig) -> Self {
        let tenants = config
            .static_tenants
            .iter()
            .map(|tenant| {
                let mut descriptor = TenantDescriptor::new(tenant.id.clone());
                if let Some(name) = &tenant.name {
                    descriptor.name = name.clone();
                }
                descriptor.labels = tenant.labels.clone();
                descriptor
            })
            .collect();
        Self { tenants }
    }
}

#[async_trait]
impl TenantDiscovery for StaticTenantDiscovery {
    async fn discover_tenant_configurations(&self) -> Result<Vec<TenantDescriptor>> {
        Ok(self.tenants.clone())
    }
}

/// Static tenants when any are configured, otherwise the tenant directory tree.
pub fn discovery_from_config(config: &TenantsConfig) -> Box<dyn TenantDiscovery> {
    if config.static_tenants.is_empty() {
        Box::new(DirectoryTenantDiscovery::new(config.root.clone()))
    } else {
        Box::new(StaticTenantDiscovery::from_config(config))
    }
}
