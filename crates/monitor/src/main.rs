//! Performance Monitor - adaptive performance monitoring service
//!
//! Runs the monitor task against this process's own runtime metrics and
//! serves health, metrics and monitor state over HTTP.

use anyhow::Result;
use monitor_lib::{
    collector::{RuntimeCounters, RuntimeMetricsProvider},
    health::{components, HealthRegistry},
    monitor::MonitorBuilder,
    observability::StructuredLogger,
};
use perf_monitor::{api, config::AppConfig};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting perf-monitor");

    // Load configuration
    let config = AppConfig::load()?;
    info!(
        instance = %config.instance_name,
        interval_secs = config.monitoring_interval_secs,
        "Monitor configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::METRICS_PROVIDER).await;
    health_registry.register(components::SCHEDULER).await;

    let logger = StructuredLogger::new(&config.instance_name);

    // Runtime counters are shared with whatever records requests in-process
    let counters = Arc::new(RuntimeCounters::new());
    let provider = Arc::new(RuntimeMetricsProvider::with_proc_path(
        counters,
        &config.procfs_root,
    ));

    let (monitor, handle) = MonitorBuilder::new()
        .provider(provider)
        .config(config.monitor_config())
        .health_registry(health_registry.clone())
        .logger(logger.clone())
        .build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let monitor_task = tokio::spawn(monitor.run(shutdown_rx));

    // Start health, metrics and status server
    let app_state = Arc::new(api::AppState::new(health_registry, handle));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
                Ok(Ok(())) => {}
            }
        }
    }

    // Monitor logs its own shutdown event
    let _ = shutdown_tx.send(());
    if let Err(e) = monitor_task.await {
        error!(error = %e, "Monitor task failed to stop cleanly");
    }
    info!(instance = %logger.instance(), "Shutting down");

    Ok(())
}
