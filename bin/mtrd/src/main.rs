//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "binary"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Binary entrypoint for the MTR daemon."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
mod ingest;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mtr_common::{init_tracing, AppConfig};
use mtr_core::{
    discovery_from_config, MarkerFileGate, MultitenantOrchestrator, OrchestratorError,
    PhaseReport, TcpManagementChannel,
};
use tokio::signal;
use tracing::{error, info, warn};

use crate::ingest::IngestHooks;

const SERVICE_NAME: &str = "mtrd";
const INBOX_POLL_INTERVAL: Duration = Duration::from_millis(500);

type DaemonOrchestrator = MultitenantOrchestrator<IngestHooks, TcpManagementChannel>;

#[derive(Debug, Parser)]
#[command(author, version, about = "Multitenant runtime daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the orchestrator until interrupted")]
    Run,
    #[command(about = "Validate the configuration and print a summary")]
    CheckConfig,
    #[command(about = "List the tenants discovery would create engines for")]
    Tenants,
    #[command(about = "Decode a device payload file and print the typed request")]
    Decode {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/mtr.toml"));
    candidates.push(PathBuf::from("configs/example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let config = loaded.config;
    init_tracing(SERVICE_NAME, &config.logging)?;
    info!(config_path = %loaded.source.display(), "configuration loaded");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config).await?,
        Commands::CheckConfig => {
            println!("Configuration: {}", loaded.source.display());
            println!(
                "Management: {}:{} (connect timeout {:?})",
                config.management.host, config.management.port, config.management.connect_timeout
            );
            println!(
                "Readiness: marker {} timeout {}",
                config.readiness.marker.display(),
                config
                    .readiness
                    .timeout
                    .map(|t| format!("{t:?}"))
                    .unwrap_or_else(|| "none".to_owned())
            );
            println!("Registry shards: {}", config.registry.shards);
        }
        Commands::Tenants => {
            let tenants = discovery_from_config(&config.tenants)
                .discover_tenant_configurations()
                .await?;
            for tenant in tenants {
                let root = tenant
                    .config_root
                    .map(|root| root.display().to_string())
                    .unwrap_or_else(|| "-".to_owned());
                println!("{}\t{}\t{}", tenant.tenant_id, tenant.name, root);
            }
        }
        Commands::Decode { file } => {
            let payload = std::fs::read(&file)
                .with_context(|| format!("unable to read {}", file.display()))?;
            let decoded = mtr_decode::decode(&payload)?;
            println!("{decoded:#?}");
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let channel = TcpManagementChannel::from_config(&config.management);
    let mut orchestrator: DaemonOrchestrator =
        MultitenantOrchestrator::builder(SERVICE_NAME, IngestHooks::new(INBOX_POLL_INTERVAL), channel)
            .gate(Arc::new(MarkerFileGate::from_config(&config.readiness)))
            .discovery(discovery_from_config(&config.tenants))
            .readiness_timeout(config.readiness.timeout)
            .registry_shards(config.registry.shards)
            .build();

    let startup = tokio::select! {
        result = bring_up(&mut orchestrator) => Some(result),
        _ = signal::ctrl_c() => None,
    };
    match startup {
        Some(Ok(())) => {}
        Some(Err(err)) => {
            error!(
                component = err.failed_component().unwrap_or("-"),
                error = %err,
                "startup failed; terminating"
            );
            log_termination(&mut orchestrator).await;
            return Err(err).context("orchestrator startup failed");
        }
        None => {
            warn!("interrupted during startup; terminating");
            log_termination(&mut orchestrator).await;
            return Ok(());
        }
    }

    info!(
        tenants = orchestrator.registry().len(),
        "daemon running; waiting for termination signal"
    );
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");

    let report = orchestrator.stop().await?;
    log_soft_failures(&report);
    log_termination(&mut orchestrator).await;
    Ok(())
}

async fn bring_up(orchestrator: &mut DaemonOrchestrator) -> Result<(), OrchestratorError> {
    let report = orchestrator.initialize().await?;
    log_soft_failures(&report);
    let report = orchestrator.start().await?;
    log_soft_failures(&report);
    Ok(())
}

fn log_soft_failures(report: &PhaseReport) {
    for failure in &report.soft_failures {
        warn!(
            operation = %failure.operation,
            component = %failure.component,
            "{}",
            failure.message
        );
    }
}

async fn log_termination(orchestrator: &mut DaemonOrchestrator) {
    let report = orchestrator.terminate().await;
    for failure in &report.failures {
        warn!(component = %failure.component, "{}", failure.message);
    }
    info!(terminated = report.terminated.len(), "shutdown complete");
}
