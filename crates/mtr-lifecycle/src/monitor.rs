//! ---
//! mtr_section: "04-configuration-orchestration"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Lifecycle components and composite step execution."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Phase of a step reported to a [`ProgressMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Started,
    Succeeded,
    Failed,
}

/// Observability event emitted once when a step begins and once when it settles.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub operation: String,
    pub component: String,
    pub phase: StepPhase,
    pub required: bool,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    /// A failed optional step, i.e. a recorded soft failure.
    pub fn is_soft_failure(&self) -> bool {
        self.phase == StepPhase::Failed && !self.required
    }
}

/// Sink for lifecycle progress. Never used for control decisions.
pub trait ProgressMonitor: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<M: ProgressMonitor + ?Sized> ProgressMonitor for Arc<M> {
    fn report(&self, event: ProgressEvent) {
        (**self).report(event)
    }
}

/// Monitor that forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressMonitor;

impl ProgressMonitor for TracingProgressMonitor {
    fn report(&self, event: ProgressEvent) {
        match event.phase {
            StepPhase::Started | StepPhase::Succeeded => info!(
                operation = %event.operation,
                component = %event.component,
                phase = ?event.phase,
                "{}",
                event.message
            ),
            StepPhase::Failed if event.required => error!(
                operation = %event.operation,
                component = %event.component,
                "{}",
                event.message
            ),
            StepPhase::Failed => warn!(
                operation = %event.operation,
                component = %event.component,
                "{}",
                event.message
            ),
        }
    }
}

/// In-memory monitor retaining every event for later inspection.
#[derive(Debug, Default)]
pub struct RecordingProgressMonitor {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    pub fn soft_failures(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.is_soft_failure())
            .cloned()
            .collect()
    }

    /// Components that reported `phase`, in report order.
    pub fn components_with(&self, phase: StepPhase) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.phase == phase)
            .map(|event| event.component.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ProgressMonitor for RecordingProgressMonitor {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}
