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

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::LifecycleError;
use crate::monitor::ProgressMonitor;
use crate::step::LifecycleAction;

/// State of a single lifecycle component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Created,
    Initializing,
    Initialized,
    Starting,
    Started,
    Stopping,
    Stopped,
    Terminated,
    Error,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Starting => "starting",
            LifecycleState::Started => "started",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Terminated => "terminated",
            LifecycleState::Error => "error",
        }
    }

    /// Whether the component has completed initialization and not been torn down.
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            LifecycleState::Initialized
                | LifecycleState::Starting
                | LifecycleState::Started
                | LifecycleState::Stopping
                | LifecycleState::Stopped
        )
    }

    fn accepts(&self, action: LifecycleAction) -> bool {
        match action {
            LifecycleAction::Initialize => matches!(
                self,
                LifecycleState::Created
                    | LifecycleState::Stopped
                    | LifecycleState::Error
                    | LifecycleState::Terminated
            ),
            LifecycleAction::Start => {
                matches!(self, LifecycleState::Initialized | LifecycleState::Stopped)
            }
            LifecycleAction::Stop => matches!(self, LifecycleState::Started),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interior-mutable state holder embedded by every component.
#[derive(Debug, Default)]
pub struct LifecycleStatus {
    inner: Mutex<StatusInner>,
}

#[derive(Debug, Default)]
struct StatusInner {
    state: LifecycleState,
    last_error: Option<String>,
}

impl LifecycleStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lock().state
    }

    /// Message of the most recent failed transition, cleared on the next success.
    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    fn set(&self, state: LifecycleState) {
        let mut inner = self.inner.lock();
        inner.state = state;
        if state != LifecycleState::Error {
            inner.last_error = None;
        }
    }

    fn fail(&self, message: String) {
        let mut inner = self.inner.lock();
        inner.state = LifecycleState::Error;
        inner.last_error = Some(message);
    }

    /// Atomically check the current state and move into the transitional state.
    fn begin(&self, action: LifecycleAction) -> Result<(), LifecycleState> {
        let mut inner = self.inner.lock();
        if !inner.state.accepts(action) {
            return Err(inner.state);
        }
        inner.state = action.transitional_state();
        Ok(())
    }
}

/// Capability interface implemented by every unit with a managed lifecycle.
///
/// Implementors provide the work for each transition through the `on_*` hooks; the
/// state machine itself is driven by [`transition`] and [`terminate_component`], which
/// are the only callers of those hooks.
#[async_trait]
pub trait LifecycleComponent: Send + Sync {
    /// Stable name used in logs and progress events.
    fn name(&self) -> &str;

    fn status(&self) -> &LifecycleStatus;

    fn state(&self) -> LifecycleState {
        self.status().state()
    }

    async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_start(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_terminate(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Apply `action` to `component`, advancing its state on success.
///
/// Stopping a component that is not started is a no-op.
pub async fn transition(
    component: &dyn LifecycleComponent,
    action: LifecycleAction,
    monitor: &dyn ProgressMonitor,
) -> Result<(), LifecycleError> {
    let status = component.status();
    if let Err(state) = status.begin(action) {
        if action == LifecycleAction::Stop {
            debug!(component = component.name(), %state, "stop skipped; component not started");
            return Ok(());
        }
        return Err(LifecycleError::InvalidTransition {
            component: component.name().to_owned(),
            state,
            action: action.verb(),
        });
    }

    let result = match action {
        LifecycleAction::Initialize => component.on_initialize(monitor).await,
        LifecycleAction::Start => component.on_start(monitor).await,
        LifecycleAction::Stop => component.on_stop(monitor).await,
    };

    match result {
        Ok(()) => {
            status.set(action.settled_state());
            debug!(component = component.name(), state = %action.settled_state(), "transition complete");
            Ok(())
        }
        Err(err) => {
            status.fail(format!("{err:#}"));
            Err(LifecycleError::component_failure(
                component.name(),
                action,
                err,
            ))
        }
    }
}

/// Terminate `component` regardless of its current state.
pub async fn terminate_component(
    component: &dyn LifecycleComponent,
    monitor: &dyn ProgressMonitor,
) -> Result<(), LifecycleError> {
    let status = component.status();
    if status.state() == LifecycleState::Terminated {
        return Ok(());
    }
    match component.on_terminate(monitor).await {
        Ok(()) => {
            status.set(LifecycleState::Terminated);
            debug!(component = component.name(), "terminated");
            Ok(())
        }
        Err(err) => {
            warn!(component = component.name(), error = %err, "terminate failed");
            status.fail(format!("{err:#}"));
            Err(LifecycleError::ComponentFailure {
                component: component.name().to_owned(),
                action: "terminate",
                source: err,
            })
        }
    }
}
