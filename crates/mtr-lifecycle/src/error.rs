//! ---
//! mtr_section: "04-configuration-orchestration"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Lifecycle components and composite step execution."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use thiserror::Error;

use crate::component::LifecycleState;
use crate::step::LifecycleAction;

/// Errors raised while driving lifecycle transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The component is not in a state that permits the requested action.
    #[error("component '{component}' cannot {action} while {state}")]
    InvalidTransition {
        component: String,
        state: LifecycleState,
        action: &'static str,
    },
    /// The component's own transition logic reported an error.
    #[error("component '{component}' failed to {action}: {source:#}")]
    ComponentFailure {
        component: String,
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
    /// A required step failed and aborted the enclosing composite step.
    #[error("{message} [{operation} / {component}]")]
    FatalStepFailure {
        operation: String,
        component: String,
        message: String,
        #[source]
        source: Box<LifecycleError>,
    },
}

impl LifecycleError {
    /// Name of the component the error originated from.
    pub fn component(&self) -> &str {
        match self {
            LifecycleError::InvalidTransition { component, .. }
            | LifecycleError::ComponentFailure { component, .. }
            | LifecycleError::FatalStepFailure { component, .. } => component,
        }
    }

    pub fn is_fatal_step(&self) -> bool {
        matches!(self, LifecycleError::FatalStepFailure { .. })
    }

    pub(crate) fn component_failure(
        component: &str,
        action: LifecycleAction,
        source: anyhow::Error,
    ) -> Self {
        LifecycleError::ComponentFailure {
            component: component.to_owned(),
            action: action.verb(),
            source,
        }
    }
}
