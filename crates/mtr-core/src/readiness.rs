//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use mtr_common::ReadinessConfig;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("readiness wait cancelled")]
    Cancelled,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Blocks orchestrator initialization until tenant configuration is available.
///
/// The orchestrator bounds the wait with its readiness timeout, if one is configured,
/// and dropping the returned future abandons the wait.
#[async_trait]
pub trait ConfigurationGate: Send + Sync {
    async fn wait_for_configuration_ready(&self) -> Result<(), GateError>;
}

/// Gate that is always open.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadyGate;

#[async_trait]
impl ConfigurationGate for ReadyGate {
    async fn wait_for_configuration_ready(&self) -> Result<(), GateError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Pending,
    Ready,
    Cancelled,
}

/// Gate opened or cancelled programmatically.
#[derive(Debug)]
pub struct WatchGate {
    tx: watch::Sender<Signal>,
}

impl WatchGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Signal::Pending);
        Self { tx }
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(Signal::Ready);
    }

    /// Fail every current and future wait with [`GateError::Cancelled`].
    pub fn cancel(&self) {
        self.tx.send_replace(Signal::Cancelled);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow() == Signal::Ready
    }
}

impl Default for WatchGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigurationGate for WatchGate {
    async fn wait_for_configuration_ready(&self) -> Result<(), GateError> {
        let mut rx = self.tx.subscribe();
        loop {
            match *rx.borrow_and_update() {
                Signal::Ready => return Ok(()),
                Signal::Cancelled => return Err(GateError::Cancelled),
                Signal::Pending => {}
            }
            rx.changed().await.map_err(|_| GateError::Cancelled)?;
        }
    }
}

/// Gate that opens once a marker file exists, polling at a fixed interval.
#[derive(Debug, Clone)]
pub struct MarkerFileGate {
    marker: PathBuf,
    poll_interval: Duration,
}

impl MarkerFileGate {
    pub fn new(marker: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            marker: marker.into(),
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(config.marker.clone(), config.poll_interval)
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }
}

#[async_trait]
impl ConfigurationGate for MarkerFileGate {
    async fn wait_for_configuration_ready(&self) -> Result<(), GateError> {
        let mut logged = false;
        loop {
            let present = tokio::fs::try_exists(&self.marker)
                .await
                .with_context(|| format!("failed to probe {}", self.marker.display()))?;
            if present {
                info!(marker = %self.marker.display(), "tenant configuration ready");
                return Ok(());
            }
            if !logged {
                debug!(marker = %self.marker.display(), "waiting for tenant configuration marker");
                logged = true;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
