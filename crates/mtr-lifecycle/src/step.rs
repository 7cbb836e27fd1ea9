//! ---
//! mtr_section: "04-configuration-orchestration"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Lifecycle components and composite step execution."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::fmt;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::component::{transition, LifecycleComponent, LifecycleState};
use crate::error::LifecycleError;
use crate::monitor::{ProgressEvent, ProgressMonitor, StepPhase};

/// Transition applied by a [`LifecycleStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Initialize,
    Start,
    Stop,
}

impl LifecycleAction {
    pub fn verb(&self) -> &'static str {
        match self {
            LifecycleAction::Initialize => "initialize",
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            LifecycleAction::Initialize => "Initialize",
            LifecycleAction::Start => "Start",
            LifecycleAction::Stop => "Stop",
        }
    }

    pub(crate) fn transitional_state(&self) -> LifecycleState {
        match self {
            LifecycleAction::Initialize => LifecycleState::Initializing,
            LifecycleAction::Start => LifecycleState::Starting,
            LifecycleAction::Stop => LifecycleState::Stopping,
        }
    }

    pub(crate) fn settled_state(&self) -> LifecycleState {
        match self {
            LifecycleAction::Initialize => LifecycleState::Initialized,
            LifecycleAction::Start => LifecycleState::Started,
            LifecycleAction::Stop => LifecycleState::Stopped,
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Record of an optional step that failed without halting its composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftStepFailure {
    pub operation: String,
    pub component: String,
    pub label: String,
    pub action: LifecycleAction,
    pub message: String,
}

/// Result of executing one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Skipped(SoftStepFailure),
}

/// One action applied to one borrowed component.
pub struct LifecycleStep<'a> {
    target: &'a dyn LifecycleComponent,
    action: LifecycleAction,
    label: String,
    failure_message: String,
    required: bool,
}

impl<'a> LifecycleStep<'a> {
    pub fn new(
        target: &'a dyn LifecycleComponent,
        action: LifecycleAction,
        label: impl Into<String>,
        failure_message: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            target,
            action,
            label: label.into(),
            failure_message: failure_message.into(),
            required,
        }
    }

    /// Required initialize step.
    pub fn initialize(
        target: &'a dyn LifecycleComponent,
        label: impl Into<String>,
        failure_message: impl Into<String>,
    ) -> Self {
        Self::new(target, LifecycleAction::Initialize, label, failure_message, true)
    }

    /// Required start step.
    pub fn start(
        target: &'a dyn LifecycleComponent,
        label: impl Into<String>,
        failure_message: impl Into<String>,
    ) -> Self {
        Self::new(target, LifecycleAction::Start, label, failure_message, true)
    }

    /// Optional stop step; shutdown keeps going past a failing component.
    pub fn stop(target: &'a dyn LifecycleComponent, label: impl Into<String>) -> Self {
        let label = label.into();
        let failure_message = format!("Unable to stop {label}");
        Self::new(target, LifecycleAction::Stop, label, failure_message, false)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn action(&self) -> LifecycleAction {
        self.action
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn target_name(&self) -> &str {
        self.target.name()
    }

    /// Apply the step, reporting start and finish to `monitor`.
    ///
    /// A failing required step returns [`LifecycleError::FatalStepFailure`]; a failing
    /// optional step returns [`StepOutcome::Skipped`].
    pub async fn execute(
        &self,
        operation: &str,
        monitor: &dyn ProgressMonitor,
    ) -> Result<StepOutcome, LifecycleError> {
        let component = self.target.name();
        monitor.report(self.event(
            operation,
            StepPhase::Started,
            format!("{} {}", self.action.title(), self.label),
        ));

        match transition(self.target, self.action, monitor).await {
            Ok(()) => {
                monitor.report(self.event(
                    operation,
                    StepPhase::Succeeded,
                    format!("{} {} completed", self.action.title(), self.label),
                ));
                Ok(StepOutcome::Completed)
            }
            Err(err) => {
                let message = format!("{}: {}", self.failure_message, err);
                monitor.report(self.event(operation, StepPhase::Failed, message.clone()));
                if self.required {
                    return Err(LifecycleError::FatalStepFailure {
                        operation: operation.to_owned(),
                        component: component.to_owned(),
                        message: self.failure_message.clone(),
                        source: Box::new(err),
                    });
                }
                warn!(operation, component, error = %err, "optional step failed; continuing");
                Ok(StepOutcome::Skipped(SoftStepFailure {
                    operation: operation.to_owned(),
                    component: component.to_owned(),
                    label: self.label.clone(),
                    action: self.action,
                    message,
                }))
            }
        }
    }

    fn event(&self, operation: &str, phase: StepPhase, message: String) -> ProgressEvent {
        ProgressEvent {
            operation: operation.to_owned(),
            component: self.target.name().to_owned(),
            phase,
            required: self.required,
            message,
            at: Utc::now(),
        }
    }
}

impl fmt::Debug for LifecycleStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleStep")
            .field("target", &self.target.name())
            .field("action", &self.action)
            .field("label", &self.label)
            .field("required", &self.required)
            .finish()
    }
}

#[derive(Debug)]
enum StepNode<'a> {
    Single(LifecycleStep<'a>),
    Composite(CompositeStep<'a>),
}

/// Summary of a composite execution in which no required step failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeReport {
    pub operation: String,
    pub executed: usize,
    pub soft_failures: Vec<SoftStepFailure>,
}

impl CompositeReport {
    pub fn is_clean(&self) -> bool {
        self.soft_failures.is_empty()
    }

    fn absorb(&mut self, nested: CompositeReport) {
        self.executed += nested.executed;
        self.soft_failures.extend(nested.soft_failures);
    }
}

/// Ordered group of steps executed as one named operation.
///
/// Steps run one at a time in insertion order. The first failing required step halts
/// the composite; failing optional steps are recorded and skipped. Executing consumes
/// the composite, so each phase builds a fresh one.
#[derive(Debug)]
pub struct CompositeStep<'a> {
    name: String,
    steps: Vec<StepNode<'a>>,
}

impl<'a> CompositeStep<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_step(&mut self, step: LifecycleStep<'a>) -> &mut Self {
        self.steps.push(StepNode::Single(step));
        self
    }

    pub fn add_composite(&mut self, composite: CompositeStep<'a>) -> &mut Self {
        self.steps.push(StepNode::Composite(composite));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn execute(
        self,
        monitor: &dyn ProgressMonitor,
    ) -> Result<CompositeReport, LifecycleError> {
        self.run(monitor).await
    }

    fn run<'m>(
        self,
        monitor: &'m dyn ProgressMonitor,
    ) -> BoxFuture<'m, Result<CompositeReport, LifecycleError>>
    where
        'a: 'm,
    {
        async move {
            debug!(operation = %self.name, steps = self.steps.len(), "executing composite step");
            let mut report = CompositeReport {
                operation: self.name.clone(),
                ..CompositeReport::default()
            };
            for node in self.steps {
                match node {
                    StepNode::Single(step) => {
                        let outcome = step.execute(&self.name, monitor).await?;
                        report.executed += 1;
                        if let StepOutcome::Skipped(failure) = outcome {
                            report.soft_failures.push(failure);
                        }
                    }
                    StepNode::Composite(nested) => {
                        let nested = nested.run(monitor).await?;
                        report.absorb(nested);
                    }
                }
            }
            debug!(
                operation = %report.operation,
                executed = report.executed,
                soft_failures = report.soft_failures.len(),
                "composite step finished"
            );
            Ok(report)
        }
        .boxed()
    }
}
