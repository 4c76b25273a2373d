//! Metrics snapshot providers
//!
//! The monitor never reads metrics directly. It asks a [`MetricsProvider`]
//! for a snapshot, always through [`collect_with_timeout`] so that a hung
//! provider cannot stall the monitor.

mod runtime;


pub use runtime::{
    compute_performance_score, parse_statm_resident_pages, RuntimeCounters,
    RuntimeMetricsProvider, PAGE_SIZE_BYTES, RECENT_REQUEST_WINDOW,
};

use std::time::Duration;

use anyhow::Result;
pub use async_trait::async_trait;

use crate::error::CollectError;
use crate::models::MetricsSnapshot;

/// Source of point-in-time metrics snapshots
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Produce the current snapshot
    async fn current_metrics(&self) -> Result<MetricsSnapshot>;
}

/// Fetch a snapshot, failing with [`CollectError::Timeout`] if the provider
/// does not answer within `timeout`
pub async fn collect_with_timeout(
    provider: &dyn MetricsProvider,
    timeout: Duration,
) -> std::result::Result<MetricsSnapshot, CollectError> {
    match tokio::time::timeout(timeout, provider.current_metrics()).await {
        Ok(Ok(snapshot)) => Ok(snapshot),
        Ok(Err(e)) => Err(CollectError::Provider(e)),
        Err(_) => Err(CollectError::Timeout(timeout)),
    }
}
