//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::path::PathBuf;

use indexmap::IndexMap;
use mtr_lifecycle::LifecycleComponent;

/// Everything the orchestrator knows about a tenant before its engine exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDescriptor {
    pub tenant_id: String,
    pub name: String,
    /// Directory holding the tenant's configuration, when it came from disk.
    pub config_root: Option<PathBuf>,
    pub labels: IndexMap<String, String>,
}

impl TenantDescriptor {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        let tenant_id = tenant_id.into();
        Self {
            name: tenant_id.clone(),
            tenant_id,
            config_root: None,
            labels: IndexMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config_root = Some(root.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Per-tenant lifecycle component hosted by the orchestrator.
pub trait TenantEngine: LifecycleComponent + 'static {
    fn tenant_id(&self) -> &str;
}
