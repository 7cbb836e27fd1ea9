//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
//! Core orchestration for the multitenant runtime: the tenant engine registry, the
//! management channel, readiness gates, tenant discovery, and the orchestrator that
//! sequences them.

pub mod channel;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod readiness;
pub mod registry;

pub use channel::{ManagementChannel, TcpManagementChannel, MANAGEMENT_CHANNEL_NAME};
pub use discovery::{
    discovery_from_config, DirectoryTenantDiscovery, StaticTenantDiscovery, TenantDiscovery,
    TENANT_MANIFEST,
};
pub use engine::{TenantDescriptor, TenantEngine};
pub use error::{OrchestratorError, RegistryError};
pub use orchestrator::{
    MultitenantHooks, MultitenantOrchestrator, OrchestratorBuilder, OrchestratorState,
    PhaseReport, TerminationFailure, TerminationReport,
};
pub use readiness::{ConfigurationGate, GateError, MarkerFileGate, ReadyGate, WatchGate};
pub use registry::{TenantEngineRegistry, DEFAULT_SHARDS};
