//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
//! Multitenant orchestrator.
//!
//! The orchestrator owns the management channel, the configuration gate, tenant
//! discovery, and the tenant engine registry. Phase methods take `&mut self`, so only one
//! phase can run at a time; the registry is shared through an `Arc` for concurrent
//! lookups while phases run.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mtr_lifecycle::{
    terminate_component, CompositeReport, CompositeStep, LifecycleAction, LifecycleComponent,
    LifecycleState, LifecycleStep, ProgressMonitor, SoftStepFailure, StepOutcome,
    TracingProgressMonitor,
};
use tracing::{error, info, warn};

use crate::channel::ManagementChannel;
use crate::discovery::{StaticTenantDiscovery, TenantDiscovery};
use crate::engine::{TenantDescriptor, TenantEngine};
use crate::error::{OrchestratorError, RegistryError};
use crate::readiness::{ConfigurationGate, GateError, ReadyGate};
use crate::registry::{TenantEngineRegistry, DEFAULT_SHARDS};

const CHANNEL_LABEL: &str = "tenant management channel";

/// Overall state of a [`MultitenantOrchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrchestratorState {
    Uninitialized,
    Initializing,
    Initialized,
    Starting,
    Started,
    Stopping,
    Stopped,
    Terminated,
    Error,
}

impl OrchestratorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorState::Uninitialized => "uninitialized",
            OrchestratorState::Initializing => "initializing",
            OrchestratorState::Initialized => "initialized",
            OrchestratorState::Starting => "starting",
            OrchestratorState::Started => "started",
            OrchestratorState::Stopping => "stopping",
            OrchestratorState::Stopped => "stopped",
            OrchestratorState::Terminated => "terminated",
            OrchestratorState::Error => "error",
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a phase that completed without a fatal error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseReport {
    pub operation: String,
    pub executed: usize,
    pub soft_failures: Vec<SoftStepFailure>,
}

impl PhaseReport {
    fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.soft_failures.is_empty()
    }

    fn absorb(&mut self, composite: CompositeReport) {
        self.executed += composite.executed;
        self.soft_failures.extend(composite.soft_failures);
    }

    fn merge(&mut self, other: PhaseReport) {
        self.executed += other.executed;
        self.soft_failures.extend(other.soft_failures);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationFailure {
    pub component: String,
    pub message: String,
}

/// Outcome of [`MultitenantOrchestrator::terminate`]; termination itself never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    pub terminated: Vec<String>,
    pub failures: Vec<TerminationFailure>,
}

impl TerminationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    async fn terminate(&mut self, component: &dyn LifecycleComponent, monitor: &dyn ProgressMonitor) {
        match terminate_component(component, monitor).await {
            Ok(()) => self.terminated.push(component.name().to_owned()),
            Err(err) => {
                error!(component = component.name(), error = %err, "termination failed");
                self.failures.push(TerminationFailure {
                    component: component.name().to_owned(),
                    message: err.to_string(),
                });
            }
        }
    }
}

/// Extension points for the concrete service hosted by the orchestrator.
#[async_trait]
pub trait MultitenantHooks: Send + Sync + 'static {
    type Engine: TenantEngine;

    /// Runs after the configuration gate opens and before tenant engines are created.
    async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after the management channel starts and before tenant engines start.
    async fn on_start(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs before any component is stopped.
    async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        Ok(())
    }

    async fn create_tenant_engine(
        &self,
        descriptor: &TenantDescriptor,
    ) -> anyhow::Result<Arc<Self::Engine>>;
}

pub struct OrchestratorBuilder<H: MultitenantHooks, C: ManagementChannel> {
    name: String,
    hooks: H,
    channel: C,
    base: Option<Box<dyn LifecycleComponent>>,
    gate: Arc<dyn ConfigurationGate>,
    discovery: Box<dyn TenantDiscovery>,
    monitor: Arc<dyn ProgressMonitor>,
    readiness_timeout: Option<Duration>,
    shards: usize,
}

impl<H: MultitenantHooks, C: ManagementChannel> OrchestratorBuilder<H, C> {
    /// Component initialized, started and stopped ahead of the management channel.
    pub fn base(mut self, base: impl LifecycleComponent + 'static) -> Self {
        self.base = Some(Box::new(base));
        self
    }

    pub fn gate(mut self, gate: Arc<dyn ConfigurationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn discovery(mut self, discovery: Box<dyn TenantDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn monitor(mut self, monitor: Arc<dyn ProgressMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Bound the configuration readiness wait; `None` waits indefinitely.
    pub fn readiness_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    pub fn registry_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn build(self) -> MultitenantOrchestrator<H, C> {
        MultitenantOrchestrator {
            name: self.name,
            state: OrchestratorState::Uninitialized,
            hooks: self.hooks,
            channel: self.channel,
            base: self.base,
            gate: self.gate,
            discovery: self.discovery,
            monitor: self.monitor,
            readiness_timeout: self.readiness_timeout,
            registry: Arc::new(TenantEngineRegistry::with_shards(self.shards)),
            in_flight: false,
        }
    }
}

/// Hosts one tenant engine per tenant behind a shared management channel.
pub struct MultitenantOrchestrator<H: MultitenantHooks, C: ManagementChannel> {
    name: String,
    state: OrchestratorState,
    hooks: H,
    channel: C,
    base: Option<Box<dyn LifecycleComponent>>,
    gate: Arc<dyn ConfigurationGate>,
    discovery: Box<dyn TenantDiscovery>,
    monitor: Arc<dyn ProgressMonitor>,
    readiness_timeout: Option<Duration>,
    registry: Arc<TenantEngineRegistry<H::Engine>>,
    in_flight: bool,
}

impl<H: MultitenantHooks, C: ManagementChannel> MultitenantOrchestrator<H, C> {
    /// Builder with an open gate, no tenants, tracing progress, and no readiness timeout.
    pub fn builder(name: impl Into<String>, hooks: H, channel: C) -> OrchestratorBuilder<H, C> {
        OrchestratorBuilder {
            name: name.into(),
            hooks,
            channel,
            base: None,
            gate: Arc::new(ReadyGate),
            discovery: Box::new(StaticTenantDiscovery::default()),
            monitor: Arc::new(TracingProgressMonitor),
            readiness_timeout: None,
            shards: DEFAULT_SHARDS,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state. A phase whose future was dropped before completing leaves the
    /// orchestrator in `Error`; only [`terminate`](Self::terminate) is accepted then.
    pub fn state(&self) -> OrchestratorState {
        if self.in_flight {
            OrchestratorState::Error
        } else {
            self.state
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn registry(&self) -> Arc<TenantEngineRegistry<H::Engine>> {
        self.registry.clone()
    }

    pub fn tenant_engine(&self, tenant_id: &str) -> Result<Arc<H::Engine>, RegistryError> {
        self.registry.get(tenant_id)
    }

    /// Bring up the channel, wait for tenant configuration, then create and initialize
    /// one engine per discovered tenant.
    pub async fn initialize(&mut self) -> Result<PhaseReport, OrchestratorError> {
        self.begin(
            "initialize",
            &[OrchestratorState::Uninitialized],
            OrchestratorState::Initializing,
        )?;
        let result = self.run_initialize().await;
        self.settle("initialize", result, OrchestratorState::Initialized)
    }

    /// Start the channel, then every registered tenant engine on a best-effort basis.
    pub async fn start(&mut self) -> Result<PhaseReport, OrchestratorError> {
        self.begin(
            "start",
            &[OrchestratorState::Initialized, OrchestratorState::Stopped],
            OrchestratorState::Starting,
        )?;
        let result = self.run_start().await;
        self.settle("start", result, OrchestratorState::Started)
    }

    /// Stop tenant engines and the channel. Failures are recorded, never returned.
    pub async fn stop(&mut self) -> Result<PhaseReport, OrchestratorError> {
        self.begin(
            "stop",
            &[OrchestratorState::Initialized, OrchestratorState::Started],
            OrchestratorState::Stopping,
        )?;
        let result = self.run_stop().await;
        self.settle("stop", result, OrchestratorState::Stopped)
    }

    /// Release every resource regardless of the current state.
    pub async fn terminate(&mut self) -> TerminationReport {
        let monitor = self.monitor.clone();
        let mut report = TerminationReport::default();

        let engines = self.registry.drain();
        for (_, engine) in &engines {
            report.terminate(&**engine, &*monitor).await;
        }
        report.terminate(&self.channel, &*monitor).await;
        if let Some(base) = &self.base {
            report.terminate(&**base, &*monitor).await;
        }

        let previous = self.state();
        self.state = OrchestratorState::Terminated;
        self.in_flight = false;
        info!(
            orchestrator = %self.name,
            %previous,
            tenants = engines.len(),
            failures = report.failures.len(),
            "orchestrator terminated"
        );
        report
    }

    /// Create, initialize and (when running) start an engine for a new tenant.
    pub async fn add_tenant(
        &mut self,
        descriptor: TenantDescriptor,
    ) -> Result<Arc<H::Engine>, OrchestratorError> {
        if !matches!(
            self.state(),
            OrchestratorState::Initialized | OrchestratorState::Started
        ) {
            return Err(self.invalid_state("add tenant"));
        }
        let tenant_id = descriptor.tenant_id.clone();
        if self.registry.contains(&tenant_id) {
            return Err(RegistryError::DuplicateTenantEngine(tenant_id).into());
        }
        let engine = self
            .hooks
            .create_tenant_engine(&descriptor)
            .await
            .map_err(|source| OrchestratorError::TenantEngine {
                tenant: tenant_id.clone(),
                source,
            })?;

        let monitor = &*self.monitor;
        let label = format!("tenant engine {tenant_id}");
        let mut steps = CompositeStep::new(format!("Add tenant {tenant_id}"));
        steps.add_step(LifecycleStep::initialize(
            &*engine,
            label.clone(),
            format!("Unable to initialize {label}"),
        ));
        if self.state() == OrchestratorState::Started {
            steps.add_step(LifecycleStep::start(
                &*engine,
                label.clone(),
                format!("Unable to start {label}"),
            ));
        }
        if let Err(err) = steps.execute(monitor).await {
            if let Err(cleanup) = terminate_component(&*engine, monitor).await {
                warn!(tenant = %tenant_id, error = %cleanup, "cleanup after failed add did not complete");
            }
            return Err(err.into());
        }

        self.registry.put(tenant_id.clone(), engine.clone())?;
        info!(orchestrator = %self.name, tenant = %tenant_id, "tenant added");
        Ok(engine)
    }

    /// Unregister a tenant, then stop and terminate its engine.
    ///
    /// The engine is returned even when it fails to terminate; its state is then `Error`.
    pub async fn remove_tenant(&mut self, tenant_id: &str) -> Result<Arc<H::Engine>, OrchestratorError> {
        let engine = self.registry.remove(tenant_id)?;
        let monitor = &*self.monitor;
        let operation = format!("Remove tenant {tenant_id}");
        let stop = LifecycleStep::stop(&*engine, format!("tenant engine {tenant_id}"));
        if let StepOutcome::Skipped(failure) = stop.execute(&operation, monitor).await? {
            warn!(tenant = tenant_id, message = %failure.message, "tenant engine did not stop cleanly");
        }
        match terminate_component(&*engine, monitor).await {
            Ok(()) => info!(orchestrator = %self.name, tenant = tenant_id, "tenant removed"),
            Err(err) => warn!(
                orchestrator = %self.name,
                tenant = tenant_id,
                error = %err,
                "tenant removed; engine did not terminate cleanly"
            ),
        }
        Ok(engine)
    }

    fn invalid_state(&self, operation: &'static str) -> OrchestratorError {
        OrchestratorError::InvalidState {
            name: self.name.clone(),
            operation,
            state: self.state(),
        }
    }

    fn begin(
        &mut self,
        operation: &'static str,
        allowed: &[OrchestratorState],
        next: OrchestratorState,
    ) -> Result<(), OrchestratorError> {
        if self.in_flight {
            warn!(orchestrator = %self.name, interrupted = %self.state, "previous phase was abandoned");
            self.state = OrchestratorState::Error;
            self.in_flight = false;
        }
        if !allowed.contains(&self.state) {
            return Err(self.invalid_state(operation));
        }
        info!(orchestrator = %self.name, operation, from = %self.state, "phase starting");
        self.state = next;
        self.in_flight = true;
        Ok(())
    }

    fn settle(
        &mut self,
        operation: &'static str,
        result: Result<PhaseReport, OrchestratorError>,
        next: OrchestratorState,
    ) -> Result<PhaseReport, OrchestratorError> {
        self.in_flight = false;
        match &result {
            Ok(report) => {
                self.state = next;
                info!(
                    orchestrator = %self.name,
                    operation,
                    state = %next,
                    soft_failures = report.soft_failures.len(),
                    "phase complete"
                );
            }
            Err(err) => {
                self.state = OrchestratorState::Error;
                error!(
                    orchestrator = %self.name,
                    operation,
                    component = err.failed_component().unwrap_or("-"),
                    error = %err,
                    "phase failed"
                );
            }
        }
        result
    }

    async fn run_initialize(&self) -> Result<PhaseReport, OrchestratorError> {
        let monitor = &*self.monitor;
        let mut init = CompositeStep::new(format!("Initialize {}", self.name));
        if let Some(base) = &self.base {
            init.add_step(LifecycleStep::initialize(
                &**base,
                base.name().to_owned(),
                format!("Unable to initialize {}", base.name()),
            ));
        }
        init.add_step(LifecycleStep::initialize(
            &self.channel,
            CHANNEL_LABEL,
            format!("Unable to initialize {CHANNEL_LABEL}"),
        ));
        let mut report = PhaseReport::new(init.name());
        report.absorb(init.execute(monitor).await?);

        self.wait_for_configuration().await?;

        self.hooks
            .on_initialize(monitor)
            .await
            .map_err(|source| OrchestratorError::Hook {
                hook: "initialize",
                source,
            })?;

        report.merge(self.create_tenant_engines().await?);
        Ok(report)
    }

    async fn wait_for_configuration(&self) -> Result<(), OrchestratorError> {
        info!(orchestrator = %self.name, timeout = ?self.readiness_timeout, "waiting for tenant configuration");
        let wait = self.gate.wait_for_configuration_ready();
        let outcome = match self.readiness_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| OrchestratorError::ConfigurationTimeout { waited: limit })?,
            None => wait.await,
        };
        outcome.map_err(|err| match err {
            GateError::Cancelled => OrchestratorError::ConfigurationCancelled,
            GateError::Failed(source) => OrchestratorError::Readiness(source),
        })
    }

    async fn create_tenant_engines(&self) -> Result<PhaseReport, OrchestratorError> {
        let channel_state = self.channel.state();
        if !channel_state.is_ready() {
            return Err(OrchestratorError::ChannelNotReady {
                channel: self.channel.name().to_owned(),
                state: channel_state,
            });
        }

        let descriptors = self
            .discovery
            .discover_tenant_configurations()
            .await
            .map_err(OrchestratorError::Discovery)?;
        let operation = "Initialize tenant engines";
        let monitor = &*self.monitor;
        let mut report = PhaseReport::new(operation);

        let mut seen = HashSet::new();
        let mut engines = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let tenant_id = descriptor.tenant_id.as_str();
            let skipped = |message: String| SoftStepFailure {
                operation: operation.to_owned(),
                component: tenant_id.to_owned(),
                label: format!("tenant engine {tenant_id}"),
                action: LifecycleAction::Initialize,
                message,
            };
            if !seen.insert(tenant_id) || self.registry.contains(tenant_id) {
                warn!(tenant = tenant_id, "duplicate tenant skipped");
                report
                    .soft_failures
                    .push(skipped(format!("Duplicate tenant id {tenant_id}")));
                continue;
            }
            match self.hooks.create_tenant_engine(descriptor).await {
                Ok(engine) => engines.push(engine),
                Err(err) => {
                    warn!(tenant = tenant_id, error = %err, "tenant engine creation failed");
                    report
                        .soft_failures
                        .push(skipped(format!("Unable to create tenant engine: {err:#}")));
                }
            }
        }

        let mut init = CompositeStep::new(operation);
        for engine in &engines {
            let label = format!("tenant engine {}", engine.tenant_id());
            let message = format!("Unable to initialize {label}");
            init.add_step(LifecycleStep::initialize(&**engine, label, message).optional());
        }
        report.absorb(init.execute(monitor).await?);

        for engine in engines {
            if engine.state() == LifecycleState::Initialized {
                self.registry.put(engine.tenant_id().to_owned(), engine)?;
            } else if let Err(err) = terminate_component(&*engine, monitor).await {
                warn!(tenant = engine.tenant_id(), error = %err, "cleanup of unusable tenant engine did not complete");
            }
        }
        info!(
            orchestrator = %self.name,
            discovered = descriptors.len(),
            registered = self.registry.len(),
            "tenant engines created"
        );
        Ok(report)
    }

    async fn run_start(&self) -> Result<PhaseReport, OrchestratorError> {
        let monitor = &*self.monitor;
        let mut start = CompositeStep::new(format!("Start {}", self.name));
        if let Some(base) = &self.base {
            start.add_step(LifecycleStep::start(
                &**base,
                base.name().to_owned(),
                format!("Unable to start {}", base.name()),
            ));
        }
        start.add_step(LifecycleStep::start(
            &self.channel,
            CHANNEL_LABEL,
            format!("Unable to start {CHANNEL_LABEL}"),
        ));
        let mut report = PhaseReport::new(start.name());
        report.absorb(start.execute(monitor).await?);

        self.hooks
            .on_start(monitor)
            .await
            .map_err(|source| OrchestratorError::Hook {
                hook: "start",
                source,
            })?;

        let engines = self.registry.snapshot();
        let mut tenants = CompositeStep::new("Start tenant engines");
        for (tenant_id, engine) in &engines {
            let label = format!("tenant engine {tenant_id}");
            let message = format!("Unable to start {label}");
            tenants.add_step(LifecycleStep::start(&**engine, label, message).optional());
        }
        report.absorb(tenants.execute(monitor).await?);
        Ok(report)
    }

    async fn run_stop(&self) -> Result<PhaseReport, OrchestratorError> {
        let monitor = &*self.monitor;
        let operation = format!("Stop {}", self.name);
        let mut report = PhaseReport::new(operation.clone());

        if let Some(base) = &self.base {
            let step = LifecycleStep::stop(&**base, base.name().to_owned());
            if let StepOutcome::Skipped(failure) = step.execute(&operation, monitor).await? {
                report.soft_failures.push(failure);
            }
            report.executed += 1;
        }

        if let Err(err) = self.hooks.on_stop(monitor).await {
            warn!(orchestrator = %self.name, error = %err, "stop hook failed; continuing");
            report.soft_failures.push(SoftStepFailure {
                operation: operation.clone(),
                component: self.name.clone(),
                label: "stop hook".to_owned(),
                action: LifecycleAction::Stop,
                message: format!("Unable to run stop hook: {err:#}"),
            });
        }

        let engines = self.registry.snapshot();
        let mut teardown = CompositeStep::new(operation);
        for (tenant_id, engine) in &engines {
            teardown.add_step(LifecycleStep::stop(&**engine, format!("tenant engine {tenant_id}")));
        }
        teardown.add_step(LifecycleStep::stop(&self.channel, CHANNEL_LABEL));
        report.absorb(teardown.execute(monitor).await?);
        Ok(report)
    }
}

impl<H: MultitenantHooks, C: ManagementChannel> fmt::Debug for MultitenantOrchestrator<H, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultitenantOrchestrator")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("channel", &self.channel.endpoint())
            .field("tenants", &self.registry.len())
            .finish()
    }
}
