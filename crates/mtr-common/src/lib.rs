//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Shared primitives and utilities for the core runtime."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
//! Core shared primitives for the multitenant runtime workspace.
//! This crate exposes configuration loading and logging setup consumed
//! by the orchestrator crates and the daemon.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, LoadedAppConfig, LoggingConfig, ManagementConfig, ReadinessConfig,
    RegistryConfig, StaticTenantConfig, TenantsConfig,
};
pub use logging::{init_tracing, resolve_filter, FilterSource, LogFormat, TracingInit};
