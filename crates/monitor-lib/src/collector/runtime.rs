//! Runtime metrics provider
//!
//! Builds snapshots from counters the host process records into
//! ([`RuntimeCounters`]) and the process resident memory read from procfs:
//! - `<proc>/self/statm` second column, resident pages

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use super::MetricsProvider;
use crate::models::{
    bytes_to_mb, ConnectionMetrics, MetricsSnapshot, ProcessingMetrics, SystemMetrics,
};

/// Page size assumed when converting statm pages to bytes
pub const PAGE_SIZE_BYTES: u64 = 4096;

/// Number of most recent requests kept for processing statistics
pub const RECENT_REQUEST_WINDOW: usize = 1000;

/// Processing time above which the score starts to drop (ms)
const SLOW_PROCESSING_MS: f64 = 100.0;

/// Resident memory above which the score starts to drop (MB)
const HIGH_MEMORY_MB: f64 = 512.0;

#[derive(Debug, Clone, Copy)]
struct RequestSample {
    duration_ms: f64,
    success: bool,
}

/// Counters recorded by the host process
///
/// Cheap to share: wrap in an `Arc` and call the `record_*` methods from
/// request handlers.
#[derive(Debug)]
pub struct RuntimeCounters {
    recent: Mutex<VecDeque<RequestSample>>,
    connections: AtomicI64,
}

impl Default for RuntimeCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeCounters {
    pub fn new() -> Self {
        Self {
            recent: Mutex::new(VecDeque::with_capacity(RECENT_REQUEST_WINDOW)),
            connections: AtomicI64::new(0),
        }
    }

    /// Record a processed request
    pub fn record_request(&self, duration: Duration, success: bool) {
        let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        if recent.len() == RECENT_REQUEST_WINDOW {
            recent.pop_front();
        }
        recent.push_back(RequestSample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // Never go below zero on unbalanced close calls
        let _ = self
            .connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| Some((c - 1).max(0)));
    }

    /// Set the connection gauge directly
    pub fn set_connections(&self, count: u64) {
        self.connections
            .store(i64::try_from(count).unwrap_or(i64::MAX), Ordering::Relaxed);
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed).max(0) as u64
    }

    /// Average processing time (ms) and success rate (%) over the recent window.
    /// An idle process reports `(0.0, 100.0)`.
    pub fn processing_metrics(&self) -> ProcessingMetrics {
        let recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        if recent.is_empty() {
            return ProcessingMetrics {
                average_processing_time: 0.0,
                success_rate: 100.0,
            };
        }

        let count = recent.len() as f64;
        let total_ms: f64 = recent.iter().map(|s| s.duration_ms).sum();
        let successes = recent.iter().filter(|s| s.success).count() as f64;

        ProcessingMetrics {
            average_processing_time: total_ms / count,
            success_rate: successes / count * 100.0,
        }
    }
}

/// Provider combining [`RuntimeCounters`] with procfs memory readings
pub struct RuntimeMetricsProvider {
    counters: Arc<RuntimeCounters>,
    proc_path: PathBuf,
}

impl RuntimeMetricsProvider {
    pub fn new(counters: Arc<RuntimeCounters>) -> Self {
        Self {
            counters,
            proc_path: PathBuf::from("/proc"),
        }
    }

    /// Create provider with custom proc path (for testing)
    pub fn with_proc_path(counters: Arc<RuntimeCounters>, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            counters,
            proc_path: proc_path.into(),
        }
    }

    pub fn counters(&self) -> &Arc<RuntimeCounters> {
        &self.counters
    }

    /// Resident memory of the current process in bytes
    async fn read_resident_bytes(&self) -> Result<u64> {
        let statm_path = self.proc_path.join("self").join("statm");
        let content = fs::read_to_string(&statm_path)
            .await
            .with_context(|| format!("Failed to read {}", statm_path.display()))?;

        let pages = parse_statm_resident_pages(&content)
            .with_context(|| format!("Failed to parse {}", statm_path.display()))?;
        Ok(pages * PAGE_SIZE_BYTES)
    }
}

#[async_trait]
impl MetricsProvider for RuntimeMetricsProvider {
    async fn current_metrics(&self) -> Result<MetricsSnapshot> {
        let memory_bytes = self.read_resident_bytes().await? as f64;
        let processing = self.counters.processing_metrics();

        Ok(MetricsSnapshot {
            performance_score: compute_performance_score(&processing, memory_bytes),
            processing_metrics: processing,
            system_metrics: SystemMetrics {
                memory_usage: memory_bytes,
            },
            connection_metrics: ConnectionMetrics {
                total_connections: self.counters.connections() as f64,
            },
        })
    }
}

/// Parse the resident page count (second field) from statm contents
pub fn parse_statm_resident_pages(content: &str) -> Result<u64> {
    let field = content
        .split_whitespace()
        .nth(1)
        .context("statm has fewer than two fields")?;
    field
        .parse()
        .with_context(|| format!("Invalid resident page count: {}", field))
}

/// Performance score in `[0, 100]`
///
/// Penalties: failed requests (up to 50), processing time above 100ms (up to
/// 30), resident memory above 512MB (up to 20).
pub fn compute_performance_score(processing: &ProcessingMetrics, memory_bytes: f64) -> f64 {
    let failure_penalty = ((100.0 - processing.success_rate) * 2.0).clamp(0.0, 50.0);
    let latency_penalty =
        ((processing.average_processing_time - SLOW_PROCESSING_MS).max(0.0) / 10.0).min(30.0);
    let memory_penalty = ((bytes_to_mb(memory_bytes) - HIGH_MEMORY_MB).max(0.0) / 50.0).min(20.0);

    (100.0 - failure_penalty - latency_penalty - memory_penalty).clamp(0.0, 100.0)
}
