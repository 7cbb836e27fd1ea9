//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "binary"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Ingest tenant engine hosted by the MTR daemon."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
//! Tenant engine that decodes device payloads dropped into the tenant's inbox.
//!
//! Layout under the tenant configuration root: `inbox/` is polled for `*.json` files,
//! which are moved to `processed/` or `rejected/` once decoded.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use mtr_core::{MultitenantHooks, TenantDescriptor, TenantEngine};
use mtr_decode::{decode, DecodeError, DecodedRequest, RequestKind};
use mtr_lifecycle::{LifecycleComponent, LifecycleStatus, ProgressMonitor};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const INBOX_DIR: &str = "inbox";
pub const PROCESSED_DIR: &str = "processed";
pub const REJECTED_DIR: &str = "rejected";

/// Per-tenant decode counters.
#[derive(Debug, Default)]
pub struct IngestStats {
    accepted: Mutex<IndexMap<RequestKind, u64>>,
    rejected: AtomicU64,
}

impl IngestStats {
    pub fn accepted(&self, kind: RequestKind) -> u64 {
        self.accepted.lock().get(&kind).copied().unwrap_or(0)
    }

    pub fn accepted_total(&self) -> u64 {
        self.accepted.lock().values().sum()
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn record(&self, tenant: &str, payload: &[u8]) -> Result<DecodedRequest, DecodeError> {
        match decode(payload) {
            Ok(decoded) => {
                *self.accepted.lock().entry(decoded.kind()).or_insert(0) += 1;
                debug!(tenant, kind = %decoded.kind(), sender = %decoded.sender_id, "payload accepted");
                Ok(decoded)
            }
            Err(err) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(tenant, error = %err, "payload rejected");
                Err(err)
            }
        }
    }
}

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct IngestEngine {
    descriptor: TenantDescriptor,
    status: LifecycleStatus,
    poll_interval: Duration,
    stats: Arc<IngestStats>,
    worker: Mutex<Option<Worker>>,
}

impl IngestEngine {
    pub fn new(descriptor: TenantDescriptor, poll_interval: Duration) -> Self {
        Self {
            descriptor,
            status: LifecycleStatus::new(),
            poll_interval,
            stats: Arc::new(IngestStats::default()),
            worker: Mutex::new(None),
        }
    }

    pub fn descriptor(&self) -> &TenantDescriptor {
        &self.descriptor
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Decode a payload handed to this tenant directly.
    pub fn ingest(&self, payload: &[u8]) -> Result<DecodedRequest, DecodeError> {
        self.stats.record(&self.descriptor.tenant_id, payload)
    }

    fn inbox_root(&self) -> Option<&Path> {
        self.descriptor.config_root.as_deref()
    }
}

#[async_trait]
impl LifecycleComponent for IngestEngine {
    fn name(&self) -> &str {
        &self.descriptor.tenant_id
    }

    fn status(&self) -> &LifecycleStatus {
        &self.status
    }

    async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        if let Some(root) = self.inbox_root() {
            for dir in [INBOX_DIR, PROCESSED_DIR, REJECTED_DIR] {
                let path = root.join(dir);
                tokio::fs::create_dir_all(&path)
                    .await
                    .with_context(|| format!("unable to create {}", path.display()))?;
            }
        }
        Ok(())
    }

    async fn on_start(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        let Some(root) = self.inbox_root() else {
            info!(tenant = %self.descriptor.tenant_id, "no tenant root; direct ingest only");
            return Ok(());
        };
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(poll_inbox(
            self.descriptor.tenant_id.clone(),
            root.to_path_buf(),
            self.poll_interval,
            self.stats.clone(),
            rx,
        ));
        *self.worker.lock() = Some(Worker { shutdown, handle });
        info!(tenant = %self.descriptor.tenant_id, root = %root.display(), "inbox polling started");
        Ok(())
    }

    async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.shutdown.send(true);
            worker
                .handle
                .await
                .context("inbox worker did not shut down cleanly")?;
        }
        info!(
            tenant = %self.descriptor.tenant_id,
            accepted = self.stats.accepted_total(),
            rejected = self.stats.rejected(),
            "ingest stopped"
        );
        Ok(())
    }

    async fn on_terminate(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        if let Some(worker) = self.worker.lock().take() {
            worker.handle.abort();
        }
        Ok(())
    }
}

impl TenantEngine for IngestEngine {
    fn tenant_id(&self) -> &str {
        &self.descriptor.tenant_id
    }
}

async fn poll_inbox(
    tenant: String,
    root: PathBuf,
    interval: Duration,
    stats: Arc<IngestStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if let Err(err) = drain_inbox(&tenant, &root, &stats).await {
            warn!(tenant = %tenant, error = %err, "inbox scan failed");
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(tenant = %tenant, "inbox worker exiting");
}

async fn drain_inbox(tenant: &str, root: &Path, stats: &IngestStats) -> Result<usize> {
    let inbox = root.join(INBOX_DIR);
    let mut pending = Vec::new();
    let mut entries = tokio::fs::read_dir(&inbox)
        .await
        .with_context(|| format!("unable to read {}", inbox.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            pending.push(path);
        }
    }
    pending.sort();

    for path in &pending {
        let payload = tokio::fs::read(path)
            .await
            .with_context(|| format!("unable to read {}", path.display()))?;
        let target = match stats.record(tenant, &payload) {
            Ok(_) => PROCESSED_DIR,
            Err(_) => REJECTED_DIR,
        };
        if let Some(name) = path.file_name() {
            tokio::fs::rename(path, root.join(target).join(name))
                .await
                .with_context(|| format!("unable to move {}", path.display()))?;
        }
    }
    Ok(pending.len())
}

/// Creates an [`IngestEngine`] for every discovered tenant.
#[derive(Debug, Clone)]
pub struct IngestHooks {
    poll_interval: Duration,
}

impl IngestHooks {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

#[async_trait]
impl MultitenantHooks for IngestHooks {
    type Engine = IngestEngine;

    async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        debug!(poll_interval = ?self.poll_interval, "ingest hooks ready");
        Ok(())
    }

    async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        info!("ingest shutting down");
        Ok(())
    }

    async fn create_tenant_engine(&self, descriptor: &TenantDescriptor) -> Result<Arc<IngestEngine>> {
        Ok(Arc::new(IngestEngine::new(descriptor.clone(), self.poll_interval)))
    }
}
