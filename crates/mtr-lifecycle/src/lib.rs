//! ---
//! mtr_section: "04-configuration-orchestration"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Lifecycle components and composite step execution."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
//! Lifecycle primitives shared by the orchestrator and every managed component.
//!
//! A [`LifecycleComponent`] exposes transition hooks; a [`LifecycleStep`] applies one
//! [`LifecycleAction`] to one component; a [`CompositeStep`] runs steps in order with
//! fail-fast handling for required steps and best-effort handling for optional ones.
//! Progress is reported to a [`ProgressMonitor`] for observability only.

mod component;
mod error;
mod monitor;
mod step;

pub use component::{
    terminate_component, transition, LifecycleComponent, LifecycleState, LifecycleStatus,
};
pub use error::LifecycleError;
pub use monitor::{
    ProgressEvent, ProgressMonitor, RecordingProgressMonitor, StepPhase, TracingProgressMonitor,
};
pub use step::{
    CompositeReport, CompositeStep, LifecycleAction, LifecycleStep, SoftStepFailure, StepOutcome,
};
