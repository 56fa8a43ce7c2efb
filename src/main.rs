use anyhow::Context;
use clap::Parser;
use consul_file_sync::cli::Cli;
use consul_file_sync::config::{load_settings_file, Settings, SyncConfig};
use consul_file_sync::logging::init_logging;
use consul_file_sync::shutdown::shutdown_signal;
use consul_file_sync::{sync, ChangeDetector, ConsulClient, SyncError};
use std::process::ExitCode;
use tracing::{error, info, warn};

fn resolve_config(cli: &Cli) -> Result<SyncConfig, SyncError> {
    let from_file = match &cli.config {
        Some(path) => load_settings_file(path)?,
        None => Settings::default(),
    };
    SyncConfig::from_settings(from_file.merge(cli.settings()))
}

async fn run(config: SyncConfig) -> anyhow::Result<()> {
    config.watch.ensure_exists()?;

    let client = ConsulClient::new(config.kv.clone(), config.timeout)?;
    let leader = client
        .check_leader()
        .await
        .with_context(|| format!("Cannot reach Consul at {}", config.kv.base_url()))?;

    info!("Starting Consul file sync");
    info!("Watching file: {}", config.watch.path().display());
    info!("Consul URL: {} (leader {})", config.kv.base_url(), leader);
    info!("KV Key: {}", config.kv.key());
    info!("Polling every {}s", config.interval.as_secs());
    if config.kv.token().is_none() {
        warn!("No Consul token configured, requests are sent unauthenticated");
    }

    let mut detector = ChangeDetector::new(config.watch.clone());
    sync::run(&mut detector, &client, config.interval, shutdown_signal()).await;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            let _ = init_logging(None);
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(config.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
