//! Monitor configuration

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use monitor_lib::monitor::MonitorConfig;
use serde::Deserialize;
use tracing::warn;

/// Environment variable prefix, e.g. `PERF_MONITOR_API_PORT`
pub const ENV_PREFIX: &str = "PERF_MONITOR";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Instance label attached to every log event
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics/status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between scheduled checks
    #[serde(default = "default_monitoring_interval")]
    pub monitoring_interval_secs: u64,

    /// Seconds before another alert of the same type may fire
    #[serde(default = "default_alert_cooldown")]
    pub alert_cooldown_secs: u64,

    /// Seconds before the baseline is rebuilt
    #[serde(default = "default_baseline_window")]
    pub baseline_window_secs: u64,

    /// Metrics provider timeout in milliseconds
    #[serde(default = "default_metrics_timeout")]
    pub metrics_timeout_ms: u64,

    /// Root of the procfs mount
    #[serde(default = "default_procfs_root")]
    pub procfs_root: String,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_monitoring_interval() -> u64 {
    30
}

fn default_alert_cooldown() -> u64 {
    300
}

fn default_baseline_window() -> u64 {
    3600
}

fn default_metrics_timeout() -> u64 {
    5000
}

fn default_procfs_root() -> String {
    "/proc".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            monitoring_interval_secs: default_monitoring_interval(),
            alert_cooldown_secs: default_alert_cooldown(),
            baseline_window_secs: default_baseline_window(),
            metrics_timeout_ms: default_metrics_timeout(),
            procfs_root: default_procfs_root(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_env_source(None)
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_env_source(source: Option<HashMap<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(source))
            .build()?;

        let loaded = config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            AppConfig::default()
        });

        Ok(loaded.validated())
    }

    /// Replace zero durations, which would spin or never answer, with defaults
    fn validated(mut self) -> Self {
        if self.monitoring_interval_secs == 0 {
            warn!("monitoring_interval_secs must be positive, using default");
            self.monitoring_interval_secs = default_monitoring_interval();
        }
        if self.metrics_timeout_ms == 0 {
            warn!("metrics_timeout_ms must be positive, using default");
            self.metrics_timeout_ms = default_metrics_timeout();
        }
        self
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            monitoring_interval: Duration::from_secs(self.monitoring_interval_secs),
            alert_cooldown: Duration::from_secs(self.alert_cooldown_secs),
            baseline_window: Duration::from_secs(self.baseline_window_secs),
            metrics_timeout: Duration::from_millis(self.metrics_timeout_ms),
            ..MonitorConfig::default()
        }
    }
}
