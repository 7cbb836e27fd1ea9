//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use mtr_core::{
    DirectoryTenantDiscovery, ManagementChannel, MultitenantHooks, MultitenantOrchestrator,
    OrchestratorError, OrchestratorState, RegistryError, StaticTenantDiscovery, TenantDescriptor,
    TenantEngine, WatchGate,
};
use mtr_lifecycle::{
    LifecycleAction, LifecycleComponent, LifecycleError, LifecycleState, LifecycleStatus,
    ProgressMonitor, RecordingProgressMonitor,
};
use parking_lot::Mutex;

type CallLog = Arc<Mutex<Vec<String>>>;

fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(log: &CallLog, name: &str, action: &str, failing: &[LifecycleAction]) -> anyhow::Result<()> {
    log.lock().push(format!("{name}:{action}"));
    if failing.iter().any(|candidate| candidate.verb() == action) {
        bail!("{name} refused to {action}");
    }
    Ok(())
}

fn position(log: &CallLog, entry: &str) -> usize {
    log.lock()
        .iter()
        .position(|logged| logged == entry)
        .unwrap_or_else(|| panic!("{entry} not logged"))
}

struct MockChannel {
    status: LifecycleStatus,
    failing: Vec<LifecycleAction>,
    log: CallLog,
}

impl MockChannel {
    fn new(log: &CallLog) -> Self {
        Self {
            status: LifecycleStatus::new(),
            failing: Vec::new(),
            log: log.clone(),
        }
    }

    fn failing(mut self, action: LifecycleAction) -> Self {
        self.failing.push(action);
        self
    }
}

#[async_trait]
impl LifecycleComponent for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn status(&self) -> &LifecycleStatus {
        &self.status
    }

    async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        record(&self.log, "mock-channel", "initialize", &self.failing)
    }

    async fn on_start(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        record(&self.log, "mock-channel", "start", &self.failing)
    }

    async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        record(&self.log, "mock-channel", "stop", &self.failing)
    }

    async fn on_terminate(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        record(&self.log, "mock-channel", "terminate", &[])
    }
}

impl ManagementChannel for MockChannel {
    fn endpoint(&self) -> String {
        "mock:0".to_owned()
    }
}

#[derive(Debug)]
struct MockEngine {
    tenant_id: String,
    status: LifecycleStatus,
    failing: Vec<LifecycleAction>,
    refuses_terminate: bool,
    log: CallLog,
}

#[async_trait]
impl LifecycleComponent for MockEngine {
    fn name(&self) -> &str {
        &self.tenant_id
    }

    fn status(&self) -> &LifecycleStatus {
        &self.status
    }

    async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        record(&self.log, &self.tenant_id, "initialize", &self.failing)
    }

    async fn on_start(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        record(&self.log, &self.tenant_id, "start", &self.failing)
    }

    async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        record(&self.log, &self.tenant_id, "stop", &self.failing)
    }

    async fn on_terminate(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        record(&self.log, &self.tenant_id, "terminate", &[])?;
        if self.refuses_terminate {
            bail!("{} is holding its inbox", self.tenant_id);
        }
        Ok(())
    }
}

impl TenantEngine for MockEngine {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

#[derive(Default)]
struct TestHooks {
    log: CallLog,
    engine_failures: HashMap<String, Vec<LifecycleAction>>,
    uncreatable: Vec<String>,
    stubborn: Vec<String>,
}

impl TestHooks {
    fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            ..Self::default()
        }
    }

    fn engine_failing(mut self, tenant: &str, action: LifecycleAction) -> Self {
        self.engine_failures
            .entry(tenant.to_owned())
            .or_default()
            .push(action);
        self
    }

    fn uncreatable(mut self, tenant: &str) -> Self {
        self.uncreatable.push(tenant.to_owned());
        self
    }

    fn refusing_terminate(mut self, tenant: &str) -> Self {
        self.stubborn.push(tenant.to_owned());
        self
    }
}

#[async_trait]
impl MultitenantHooks for TestHooks {
    type Engine = MockEngine;

    async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        self.log.lock().push("hooks:on_initialize".to_owned());
        Ok(())
    }

    async fn on_start(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        self.log.lock().push("hooks:on_start".to_owned());
        Ok(())
    }

    async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
        self.log.lock().push("hooks:on_stop".to_owned());
        Ok(())
    }

    async fn create_tenant_engine(
        &self,
        descriptor: &TenantDescriptor,
    ) -> anyhow::Result<Arc<MockEngine>> {
        if self.uncreatable.contains(&descriptor.tenant_id) {
            return Err(anyhow!("no engine template for {}", descriptor.tenant_id));
        }
        Ok(Arc::new(MockEngine {
            tenant_id: descriptor.tenant_id.clone(),
            status: LifecycleStatus::new(),
            failing: self
                .engine_failures
                .get(&descriptor.tenant_id)
                .cloned()
                .unwrap_or_default(),
            refuses_terminate: self.stubborn.contains(&descriptor.tenant_id),
            log: self.log.clone(),
        }))
    }
}

fn tenants(ids: &[&str]) -> Box<StaticTenantDiscovery> {
    Box::new(StaticTenantDiscovery::new(
        ids.iter().map(|id| TenantDescriptor::new(*id)).collect(),
    ))
}

type TestOrchestrator = MultitenantOrchestrator<TestHooks, MockChannel>;

fn orchestrator(
    hooks: TestHooks,
    channel: MockChannel,
    ids: &[&str],
    monitor: &Arc<RecordingProgressMonitor>,
) -> TestOrchestrator {
    MultitenantOrchestrator::builder("test-service", hooks, channel)
        .discovery(tenants(ids))
        .monitor(monitor.clone())
        .registry_shards(4)
        .build()
}

#[tokio::test]
async fn channel_initialize_failure_leaves_orchestrator_in_error() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let channel = MockChannel::new(&log).failing(LifecycleAction::Initialize);
    let mut orchestrator = orchestrator(TestHooks::new(&log), channel, &["tenant-a"], &monitor);

    let err = orchestrator.initialize().await.expect_err("channel init fails");
    match &err {
        OrchestratorError::Step(LifecycleError::FatalStepFailure { component, .. }) => {
            assert_eq!(component, "mock-channel")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.failed_component(), Some("mock-channel"));
    assert_eq!(orchestrator.state(), OrchestratorState::Error);
    assert!(orchestrator.registry().is_empty());
    assert!(!log.lock().iter().any(|entry| entry.starts_with("hooks:")));

    assert!(matches!(
        orchestrator.start().await,
        Err(OrchestratorError::InvalidState {
            state: OrchestratorState::Error,
            ..
        })
    ));
    assert!(matches!(
        orchestrator.stop().await,
        Err(OrchestratorError::InvalidState { .. })
    ));

    let report = orchestrator.terminate().await;
    assert!(report.is_clean());
    assert_eq!(orchestrator.state(), OrchestratorState::Terminated);
    assert_eq!(orchestrator.channel().state(), LifecycleState::Terminated);
}

#[tokio::test]
async fn discovered_tenants_are_registered_in_discovery_order() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let mut orchestrator = orchestrator(
        TestHooks::new(&log),
        MockChannel::new(&log),
        &["tenant-c", "tenant-a", "tenant-b"],
        &monitor,
    );

    let report = orchestrator.initialize().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(orchestrator.state(), OrchestratorState::Initialized);

    let snapshot = orchestrator.registry().snapshot();
    let ids: Vec<&str> = snapshot.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["tenant-c", "tenant-a", "tenant-b"]);
    for (id, engine) in &snapshot {
        assert_eq!(engine.tenant_id(), id);
        assert_eq!(engine.state(), LifecycleState::Initialized);
    }
    assert!(position(&log, "mock-channel:initialize") < position(&log, "hooks:on_initialize"));
    assert!(position(&log, "hooks:on_initialize") < position(&log, "tenant-c:initialize"));
}

#[tokio::test]
async fn failing_channel_stop_is_recorded_and_terminate_still_runs() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let channel = MockChannel::new(&log).failing(LifecycleAction::Stop);
    let mut orchestrator = orchestrator(TestHooks::new(&log), channel, &["tenant-a"], &monitor);

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    let report = orchestrator.stop().await.expect("stop reports success");

    assert_eq!(orchestrator.state(), OrchestratorState::Stopped);
    assert_eq!(report.soft_failures.len(), 1);
    assert_eq!(report.soft_failures[0].component, "mock-channel");
    assert_eq!(report.soft_failures[0].action, LifecycleAction::Stop);
    let soft = monitor.soft_failures();
    assert_eq!(soft.len(), 1);
    assert_eq!(soft[0].component, "mock-channel");
    assert!(!soft[0].required);

    let termination = orchestrator.terminate().await;
    assert!(termination.is_clean());
    assert_eq!(
        termination.terminated,
        vec!["tenant-a".to_owned(), "mock-channel".to_owned()]
    );
    assert_eq!(orchestrator.channel().state(), LifecycleState::Terminated);
    assert!(orchestrator.registry().is_empty());
}

#[tokio::test]
async fn stop_hook_runs_before_channel_stop() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let mut orchestrator = orchestrator(
        TestHooks::new(&log),
        MockChannel::new(&log),
        &["tenant-a", "tenant-b"],
        &monitor,
    );

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    assert!(position(&log, "mock-channel:start") < position(&log, "hooks:on_start"));
    assert!(position(&log, "hooks:on_start") < position(&log, "tenant-a:start"));

    let report = orchestrator.stop().await.unwrap();
    assert!(report.is_clean());
    let hook = position(&log, "hooks:on_stop");
    assert!(hook < position(&log, "tenant-a:stop"));
    assert!(position(&log, "tenant-a:stop") < position(&log, "tenant-b:stop"));
    assert!(position(&log, "tenant-b:stop") < position(&log, "mock-channel:stop"));
}

#[tokio::test]
async fn failing_tenant_start_does_not_block_others() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let hooks = TestHooks::new(&log).engine_failing("tenant-b", LifecycleAction::Start);
    let mut orchestrator = orchestrator(
        hooks,
        MockChannel::new(&log),
        &["tenant-a", "tenant-b", "tenant-c"],
        &monitor,
    );

    orchestrator.initialize().await.unwrap();
    let report = orchestrator.start().await.expect("tenant start is optional");
    assert_eq!(orchestrator.state(), OrchestratorState::Started);
    assert_eq!(report.soft_failures.len(), 1);
    assert_eq!(report.soft_failures[0].component, "tenant-b");
    assert_eq!(
        orchestrator.tenant_engine("tenant-c").unwrap().state(),
        LifecycleState::Started
    );
    assert_eq!(
        orchestrator.tenant_engine("tenant-b").unwrap().state(),
        LifecycleState::Error
    );
}

#[tokio::test]
async fn unusable_tenants_are_skipped_during_initialize() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let hooks = TestHooks::new(&log)
        .uncreatable("tenant-x")
        .engine_failing("tenant-y", LifecycleAction::Initialize);
    let mut orchestrator = orchestrator(
        hooks,
        MockChannel::new(&log),
        &["tenant-a", "tenant-x", "tenant-y", "tenant-a"],
        &monitor,
    );

    let report = orchestrator.initialize().await.unwrap();
    assert_eq!(orchestrator.registry().tenant_ids(), vec!["tenant-a"]);
    let skipped: Vec<&str> = report
        .soft_failures
        .iter()
        .map(|failure| failure.component.as_str())
        .collect();
    assert_eq!(skipped, vec!["tenant-x", "tenant-a", "tenant-y"]);
}

#[tokio::test]
async fn tenants_failing_initialize_are_terminated() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let hooks = TestHooks::new(&log).engine_failing("tenant-y", LifecycleAction::Initialize);
    let mut orchestrator = orchestrator(
        hooks,
        MockChannel::new(&log),
        &["tenant-a", "tenant-y"],
        &monitor,
    );

    orchestrator.initialize().await.unwrap();
    assert!(position(&log, "tenant-y:initialize") < position(&log, "tenant-y:terminate"));
    assert!(!log.lock().iter().any(|entry| entry == "tenant-a:terminate"));

    let report = orchestrator.terminate().await;
    assert_eq!(
        report.terminated,
        vec!["tenant-a".to_owned(), "mock-channel".to_owned()]
    );
    let cleanups = log
        .lock()
        .iter()
        .filter(|entry| entry.as_str() == "tenant-y:terminate")
        .count();
    assert_eq!(cleanups, 1);
}

#[tokio::test]
async fn abandoned_initialize_only_allows_terminate() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let gate = Arc::new(WatchGate::new());
    let mut orchestrator = MultitenantOrchestrator::builder(
        "test-service",
        TestHooks::new(&log),
        MockChannel::new(&log),
    )
    .gate(gate.clone())
    .monitor(monitor.clone())
    .build();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), orchestrator.initialize()).await;
    assert!(abandoned.is_err());
    assert_eq!(orchestrator.state(), OrchestratorState::Error);

    gate.mark_ready();
    assert!(matches!(
        orchestrator.initialize().await,
        Err(OrchestratorError::InvalidState {
            state: OrchestratorState::Error,
            ..
        })
    ));
    assert!(matches!(
        orchestrator.start().await,
        Err(OrchestratorError::InvalidState { .. })
    ));

    let report = orchestrator.terminate().await;
    assert!(report.is_clean());
    assert_eq!(orchestrator.state(), OrchestratorState::Terminated);
    assert_eq!(orchestrator.channel().state(), LifecycleState::Terminated);
}

#[tokio::test]
async fn readiness_timeout_fails_initialize() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let gate = Arc::new(WatchGate::new());
    let mut orchestrator = MultitenantOrchestrator::builder(
        "test-service",
        TestHooks::new(&log),
        MockChannel::new(&log),
    )
    .gate(gate.clone())
    .monitor(monitor.clone())
    .readiness_timeout(Some(Duration::from_millis(50)))
    .build();

    let err = orchestrator.initialize().await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::ConfigurationTimeout { waited } if waited == Duration::from_millis(50)
    ));
    assert_eq!(orchestrator.state(), OrchestratorState::Error);
    assert_eq!(orchestrator.channel().state(), LifecycleState::Initialized);
    assert!(!log.lock().iter().any(|entry| entry == "hooks:on_initialize"));
}

#[tokio::test]
async fn cancelled_gate_fails_initialize() {
    let log = new_log();
    let gate = Arc::new(WatchGate::new());
    gate.cancel();
    let mut orchestrator = MultitenantOrchestrator::builder(
        "test-service",
        TestHooks::new(&log),
        MockChannel::new(&log),
    )
    .gate(gate)
    .build();

    assert!(matches!(
        orchestrator.initialize().await,
        Err(OrchestratorError::ConfigurationCancelled)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gate_opened_later_unblocks_initialize() {
    let log = new_log();
    let gate = Arc::new(WatchGate::new());
    let mut orchestrator = MultitenantOrchestrator::builder(
        "test-service",
        TestHooks::new(&log),
        MockChannel::new(&log),
    )
    .gate(gate.clone())
    .discovery(tenants(&["tenant-a"]))
    .readiness_timeout(Some(Duration::from_secs(5)))
    .build();

    let opener = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        gate.mark_ready();
    });
    orchestrator.initialize().await.unwrap();
    opener.await.unwrap();
    assert_eq!(orchestrator.registry().len(), 1);
}

#[tokio::test]
async fn tenants_can_be_added_and_removed_while_running() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let mut orchestrator = orchestrator(
        TestHooks::new(&log),
        MockChannel::new(&log),
        &["tenant-a"],
        &monitor,
    );
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let added = orchestrator
        .add_tenant(TenantDescriptor::new("tenant-d"))
        .await
        .unwrap();
    assert_eq!(added.state(), LifecycleState::Started);
    assert_eq!(orchestrator.registry().tenant_ids(), vec!["tenant-a", "tenant-d"]);

    assert!(matches!(
        orchestrator.add_tenant(TenantDescriptor::new("tenant-d")).await,
        Err(OrchestratorError::Registry(RegistryError::DuplicateTenantEngine(id))) if id == "tenant-d"
    ));

    let removed = orchestrator.remove_tenant("tenant-a").await.unwrap();
    assert_eq!(removed.state(), LifecycleState::Terminated);
    assert!(matches!(
        orchestrator.tenant_engine("tenant-a"),
        Err(RegistryError::TenantEngineNotFound(_))
    ));
    assert!(matches!(
        orchestrator.remove_tenant("tenant-a").await,
        Err(OrchestratorError::Registry(RegistryError::TenantEngineNotFound(_)))
    ));
}

#[tokio::test]
async fn removed_tenant_is_returned_even_when_terminate_fails() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let hooks = TestHooks::new(&log).refusing_terminate("tenant-a");
    let mut orchestrator = orchestrator(hooks, MockChannel::new(&log), &["tenant-a"], &monitor);
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let removed = orchestrator.remove_tenant("tenant-a").await.unwrap();
    assert_eq!(removed.tenant_id(), "tenant-a");
    assert_eq!(removed.state(), LifecycleState::Error);
    assert!(position(&log, "tenant-a:stop") < position(&log, "tenant-a:terminate"));
    assert!(orchestrator.registry().is_empty());
    assert_eq!(orchestrator.state(), OrchestratorState::Started);
}

#[tokio::test]
async fn add_tenant_requires_initialized_orchestrator() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let mut orchestrator = orchestrator(TestHooks::new(&log), MockChannel::new(&log), &[], &monitor);
    assert!(matches!(
        orchestrator.add_tenant(TenantDescriptor::new("tenant-a")).await,
        Err(OrchestratorError::InvalidState {
            state: OrchestratorState::Uninitialized,
            ..
        })
    ));
}

#[tokio::test]
async fn failed_add_leaves_registry_untouched() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let hooks = TestHooks::new(&log).engine_failing("tenant-z", LifecycleAction::Initialize);
    let mut orchestrator = orchestrator(hooks, MockChannel::new(&log), &[], &monitor);
    orchestrator.initialize().await.unwrap();

    let err = orchestrator
        .add_tenant(TenantDescriptor::new("tenant-z"))
        .await
        .unwrap_err();
    assert_eq!(err.failed_component(), Some("tenant-z"));
    assert!(orchestrator.registry().is_empty());
    assert!(log.lock().iter().any(|entry| entry == "tenant-z:terminate"));
}

#[tokio::test]
async fn restart_after_stop_restarts_everything() {
    let log = new_log();
    let monitor = Arc::new(RecordingProgressMonitor::new());
    let mut orchestrator = orchestrator(
        TestHooks::new(&log),
        MockChannel::new(&log),
        &["tenant-a"],
        &monitor,
    );
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    orchestrator.stop().await.unwrap();
    assert_eq!(
        orchestrator.tenant_engine("tenant-a").unwrap().state(),
        LifecycleState::Stopped
    );
    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.state(), OrchestratorState::Started);
    assert_eq!(orchestrator.channel().state(), LifecycleState::Started);
    assert_eq!(
        orchestrator.tenant_engine("tenant-a").unwrap().state(),
        LifecycleState::Started
    );
}

#[tokio::test]
async fn base_component_leads_each_phase() {
    struct Base {
        status: LifecycleStatus,
        log: CallLog,
    }

    #[async_trait]
    impl LifecycleComponent for Base {
        fn name(&self) -> &str {
            "base"
        }

        fn status(&self) -> &LifecycleStatus {
            &self.status
        }

        async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
            record(&self.log, "base", "initialize", &[])
        }

        async fn on_start(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
            record(&self.log, "base", "start", &[])
        }

        async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> anyhow::Result<()> {
            record(&self.log, "base", "stop", &[])
        }
    }

    let log = new_log();
    let mut orchestrator = MultitenantOrchestrator::builder(
        "test-service",
        TestHooks::new(&log),
        MockChannel::new(&log),
    )
    .base(Base {
        status: LifecycleStatus::new(),
        log: log.clone(),
    })
    .build();

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    orchestrator.stop().await.unwrap();
    let termination = orchestrator.terminate().await;

    assert!(position(&log, "base:initialize") < position(&log, "mock-channel:initialize"));
    assert!(position(&log, "base:start") < position(&log, "mock-channel:start"));
    assert!(position(&log, "base:stop") < position(&log, "hooks:on_stop"));
    assert_eq!(termination.terminated, vec!["mock-channel".to_owned(), "base".to_owned()]);
}

#[tokio::test]
async fn tenant_directories_drive_engine_creation() {
    let dir = tempfile::tempdir().unwrap();
    for tenant in ["beta", "alpha"] {
        std::fs::create_dir(dir.path().join(tenant)).unwrap();
    }
    let log = new_log();
    let mut orchestrator = MultitenantOrchestrator::builder(
        "test-service",
        TestHooks::new(&log),
        MockChannel::new(&log),
    )
    .discovery(Box::new(DirectoryTenantDiscovery::new(dir.path())))
    .build();

    orchestrator.initialize().await.unwrap();
    assert_eq!(orchestrator.registry().tenant_ids(), vec!["alpha", "beta"]);
    orchestrator.terminate().await;
}
