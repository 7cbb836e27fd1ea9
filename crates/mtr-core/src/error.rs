//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::time::Duration;

use mtr_lifecycle::{LifecycleError, LifecycleState};
use thiserror::Error;

use crate::orchestrator::OrchestratorState;

/// Errors surfaced synchronously by the tenant engine registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tenant engine already registered for tenant '{0}'")]
    DuplicateTenantEngine(String),
    #[error("no tenant engine registered for tenant '{0}'")]
    TenantEngineNotFound(String),
}

/// Errors raised by the multitenant orchestrator phases.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Step(#[from] LifecycleError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("tenant configuration was not ready after {waited:?}")]
    ConfigurationTimeout { waited: Duration },
    #[error("wait for tenant configuration readiness was cancelled")]
    ConfigurationCancelled,
    #[error("tenant configuration readiness check failed: {0:#}")]
    Readiness(#[source] anyhow::Error),
    #[error("orchestrator '{name}' cannot {operation} while {state}")]
    InvalidState {
        name: String,
        operation: &'static str,
        state: OrchestratorState,
    },
    #[error("management channel '{channel}' is {state}; tenant configuration cannot be read")]
    ChannelNotReady {
        channel: String,
        state: LifecycleState,
    },
    #[error("tenant discovery failed: {0:#}")]
    Discovery(#[source] anyhow::Error),
    #[error("{hook} hook failed: {source:#}")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("unable to create engine for tenant '{tenant}': {source:#}")]
    TenantEngine {
        tenant: String,
        #[source]
        source: anyhow::Error,
    },
}

impl OrchestratorError {
    /// Component that caused a startup failure, when one is known.
    pub fn failed_component(&self) -> Option<&str> {
        match self {
            OrchestratorError::Step(err) => Some(err.component()),
            OrchestratorError::ChannelNotReady { channel, .. } => Some(channel),
            OrchestratorError::TenantEngine { tenant, .. } => Some(tenant),
            _ => None,
        }
    }
}
