//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use mtr_common::ManagementConfig;
use mtr_lifecycle::{LifecycleComponent, LifecycleStatus, ProgressMonitor};
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info, warn};

pub const MANAGEMENT_CHANNEL_NAME: &str = "tenant-management-channel";

/// Client connection to the external tenant management service.
///
/// Tenant configuration is only readable once the channel has initialized.
pub trait ManagementChannel: LifecycleComponent + 'static {
    /// Address of the management service as configured.
    fn endpoint(&self) -> String;
}

/// Management channel backed by a plain TCP connection.
///
/// Initialize resolves the endpoint, start connects, stop shuts the write half down,
/// and terminate drops the socket.
pub struct TcpManagementChannel {
    host: String,
    port: u16,
    connect_timeout: Duration,
    status: LifecycleStatus,
    resolved: Mutex<Vec<SocketAddr>>,
    stream: tokio::sync::Mutex<Option<TcpStream>>,
}

impl TcpManagementChannel {
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
            status: LifecycleStatus::new(),
            resolved: Mutex::new(Vec::new()),
            stream: tokio::sync::Mutex::new(None),
        }
    }

    pub fn from_config(config: &ManagementConfig) -> Self {
        Self::new(config.host.clone(), config.port, config.connect_timeout)
    }

    pub fn resolved_addrs(&self) -> Vec<SocketAddr> {
        self.resolved.lock().clone()
    }

    pub async fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream
            .lock()
            .await
            .as_ref()
            .and_then(|stream| stream.peer_addr().ok())
    }

    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| anyhow!("connect to {addr} timed out after {:?}", self.connect_timeout))?
            .with_context(|| format!("connect to {addr} failed"))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[async_trait]
impl LifecycleComponent for TcpManagementChannel {
    fn name(&self) -> &str {
        MANAGEMENT_CHANNEL_NAME
    }

    fn status(&self) -> &LifecycleStatus {
        &self.status
    }

    async fn on_initialize(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        let addrs: Vec<SocketAddr> = lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("unable to resolve {}", self.endpoint()))?
            .collect();
        if addrs.is_empty() {
            bail!("{} resolved to no addresses", self.endpoint());
        }
        debug!(endpoint = %self.endpoint(), addrs = addrs.len(), "management endpoint resolved");
        *self.resolved.lock() = addrs;
        Ok(())
    }

    async fn on_start(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        let addrs = self.resolved_addrs();
        let mut last_error = None;
        for addr in addrs {
            match self.connect(addr).await {
                Ok(stream) => {
                    info!(endpoint = %self.endpoint(), %addr, "management channel connected");
                    *self.stream.lock().await = Some(stream);
                    return Ok(());
                }
                Err(err) => {
                    warn!(%addr, error = %err, "management connect attempt failed");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("{} has no resolved addresses", self.endpoint())))
    }

    async fn on_stop(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        if let Some(mut stream) = self.stream.lock().await.take() {
            stream
                .shutdown()
                .await
                .context("management channel shutdown failed")?;
            info!(endpoint = %self.endpoint(), "management channel disconnected");
        }
        Ok(())
    }

    async fn on_terminate(&self, _monitor: &dyn ProgressMonitor) -> Result<()> {
        self.stream.lock().await.take();
        self.resolved.lock().clear();
        Ok(())
    }
}

impl ManagementChannel for TcpManagementChannel {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
