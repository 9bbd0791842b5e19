//! Recovery Server Binary
//!
//! Loads layered configuration, installs logging, and serves recovery
//! sessions until a shutdown request or interrupt.

use anyhow::Context;
use clap::Parser;
use recoverd::cli::ServerCli;
use recoverd::config::{ConfigLoader, ServiceConfig};
use recoverd::logging::init_logging;
use recoverd::server;
use recoverd::service::RecoveryService;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = ServerCli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let log = match init_logging(Some(&config.logging)) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), "recoverd starting");

    let service = Arc::new(RecoveryService::from_config(&config, log));
    if let Err(e) = run(&config, Arc::clone(&service)).await {
        error!("Server failed: {:#}", e);
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

/// Defaults < global file < --config < environment < flags.
fn build_config(cli: &ServerCli) -> anyhow::Result<ServiceConfig> {
    let mut config = ConfigLoader::new()
        .with_file(cli.config.clone())
        .load()
        .context("Failed to load configuration")?;
    cli.apply(&mut config);
    if let Err(errors) = config.validate() {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("Invalid configuration: {}", joined);
    }
    Ok(config)
}

async fn run(config: &ServiceConfig, service: Arc<RecoveryService>) -> anyhow::Result<()> {
    let listener = server::bind(&config.server.address)
        .await
        .with_context(|| format!("Failed to start server on {}", config.server.address))?;

    server::serve(listener, Arc::clone(&service)).await?;

    // Joins any worker still running; keep it off the async threads.
    tokio::task::spawn_blocking(move || service.close())
        .await
        .context("Service close failed")?;
    info!("recoverd exited");
    Ok(())
}
