//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Shared primitives and utilities for the core runtime."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "MTR_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Stdout format for the daemon. The rolling file is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Which source supplied the active filter directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    MtrLog,
    RustLog,
    Default,
}

/// Outcome of [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingInit {
    Installed(FilterSource),
    /// A global subscriber was already present; nothing was changed.
    AlreadyInstalled,
}

impl LoggingConfig {
    /// Base name of the rolling log file; the appender adds the date suffix.
    pub fn file_name(&self, service_name: &str) -> String {
        let stem = self
            .file_prefix
            .as_deref()
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(service_name);
        format!("{stem}.log")
    }
}

/// Pick the filter directive: `MTR_LOG`, then `RUST_LOG`, then `info`.
///
/// An invalid `MTR_LOG` is an error; an invalid `RUST_LOG` falls back to the default.
pub fn resolve_filter(
    mtr_log: Option<&str>,
    rust_log: Option<&str>,
) -> Result<(EnvFilter, FilterSource)> {
    if let Some(directive) = mtr_log.filter(|d| !d.trim().is_empty()) {
        let filter = EnvFilter::try_new(directive)
            .with_context(|| format!("invalid {LOG_ENV} directive '{directive}'"))?;
        return Ok((filter, FilterSource::MtrLog));
    }
    if let Some(filter) = rust_log.and_then(|directive| EnvFilter::try_new(directive).ok()) {
        return Ok((filter, FilterSource::RustLog));
    }
    Ok((EnvFilter::new(DEFAULT_DIRECTIVE), FilterSource::Default))
}

/// Install the global subscriber: stdout in `config.format` plus a daily JSON file
/// below `config.directory`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<TracingInit> {
    if tracing::dispatcher::has_been_set() {
        return Ok(TracingInit::AlreadyInstalled);
    }

    let mtr_log = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, source) = resolve_filter(mtr_log.as_deref(), rust_log.as_deref())?;

    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("unable to create log directory {}", config.directory.display())
    })?;
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, config.file_name(service_name)));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_current_span(true)
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("unable to install tracing subscriber")?;
    let _ = GUARDS.set([file_guard, stdout_guard]);

    info!(
        service = service_name,
        log_file = %config.directory.join(config.file_name(service_name)).display(),
        format = ?config.format,
        filter = ?source,
        "tracing initialised"
    );
    Ok(TracingInit::Installed(source))
}
