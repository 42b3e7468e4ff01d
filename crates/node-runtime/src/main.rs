//! # statehub
//!
//! Runs a state store behind a smart-home broker until interrupted.
//!
//! 1. Parse the command line
//! 2. Load configuration (file, then `SH_` environment overrides)
//! 3. Initialize telemetry
//! 4. Wait for the dependent service, if one is configured
//! 5. Start the runtime, notify the service manager, wait for Ctrl+C or SIGTERM

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use node_runtime::{notify, NodeConfig, NodeRuntime};
use service_check::ServiceChecker;
use statehub_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "statehub")]
#[command(about = "Named-state store bridged to a smart-home message bus")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Force JSON log output
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = NodeConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?
        .with_env_overrides();
    config.validate()?;

    let mut telemetry = config
        .telemetry
        .clone()
        .unwrap_or_else(TelemetryConfig::from_env);
    telemetry.json_logs |= args.json_logs;
    let _guard = init_telemetry(telemetry).context("Failed to initialize telemetry")?;

    info!(config = %args.config.display(), "Configuration loaded");

    if let Some(check) = &config.service_check {
        info!(address = %check.address, network = %check.network, "Waiting for service");
        let reachable = ServiceChecker::default()
            .wait_for_service(check.network, &check.address, || true, check.timeout)
            .await;
        if !reachable {
            bail!(
                "Service {} not reachable within {:?}",
                check.address,
                check.timeout
            );
        }
    }

    let runtime = NodeRuntime::new(config);
    runtime.start().await?;

    match notify::notify(notify::READY) {
        Ok(true) => info!("Notified service manager: ready"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Failed to notify service manager"),
    }

    info!("statehub is running. Press Ctrl+C to stop.");
    shutdown_signal().await?;

    if let Err(e) = notify::notify(notify::STOPPING) {
        warn!(error = %e, "Failed to notify service manager");
    }
    runtime.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
