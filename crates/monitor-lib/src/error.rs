//! Error types for the performance monitor

use std::time::Duration;

use thiserror::Error;

/// Failure to obtain a metrics snapshot
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("metrics provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("metrics provider failed: {0}")]
    Provider(#[source] anyhow::Error),
}

/// Errors surfaced by [`crate::monitor::MonitorHandle`]
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("performance monitor is not running")]
    Unavailable,
}
