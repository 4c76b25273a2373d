//! Baseline tracking
//!
//! Maintains a slowly-evolving expected value for every monitored metric
//! using exponential smoothing. The baseline is rebuilt from scratch once it
//! is older than the configured window so it cannot go stale.
//!
//! Memory uses adaptive decay: when the current reading is well above the
//! baseline, the smoothing factor drops to [`MEMORY_SPIKE_SMOOTHING_FACTOR`]
//! so repeated spikes are not absorbed into the baseline and stay detectable.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ConnectionMetrics, MetricsSnapshot, ProcessingMetrics, SystemMetrics};

/// Default baseline window (1 hour)
pub const DEFAULT_BASELINE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Weight given to the newest observation
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 0.1;

/// Smoothing factor for memory while it is spiking
pub const MEMORY_SPIKE_SMOOTHING_FACTOR: f64 = 0.01;

/// Current/baseline memory ratio above which adaptive decay kicks in
pub const MEMORY_DECAY_TRIGGER_RATIO: f64 = 1.5;

/// Expected value record for each monitored metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub created_at: DateTime<Utc>,
    pub performance_score: f64,
    pub processing_metrics: ProcessingMetrics,
    pub system_metrics: SystemMetrics,
    pub connection_metrics: ConnectionMetrics,
}

impl Baseline {
    /// Baseline equal to the raw snapshot values
    pub fn from_snapshot(snapshot: &MetricsSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            performance_score: snapshot.performance_score,
            processing_metrics: snapshot.processing_metrics,
            system_metrics: snapshot.system_metrics,
            connection_metrics: snapshot.connection_metrics,
        }
    }

    /// Whether the baseline is strictly older than `window`
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        (now - self.created_at)
            .to_std()
            .map(|age| age > window)
            .unwrap_or(false)
    }

    pub fn error_rate(&self) -> f64 {
        100.0 - self.processing_metrics.success_rate
    }
}

/// How the baseline changed during an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineUpdateKind {
    /// No baseline existed before
    Created,
    /// The previous baseline outlived the window and was rebuilt
    Reset,
    /// The previous baseline was blended with the snapshot
    Smoothed,
}

/// Result of [`BaselineTracker::update`]
#[derive(Debug, Clone)]
pub struct BaselineUpdate {
    pub baseline: Baseline,
    pub kind: BaselineUpdateKind,
}

/// Creates, resets and smooths the baseline
#[derive(Debug, Clone)]
pub struct BaselineTracker {
    /// Maximum baseline age before a full rebuild
    pub window: Duration,
    /// Smoothing factor for every field except spiking memory
    pub smoothing_factor: f64,
}

impl BaselineTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
        }
    }

    /// Fold `snapshot` into `current`, producing the next baseline
    pub fn update(
        &self,
        current: Option<Baseline>,
        snapshot: &MetricsSnapshot,
        now: DateTime<Utc>,
    ) -> BaselineUpdate {
        let Some(mut baseline) = current else {
            return BaselineUpdate {
                baseline: Baseline::from_snapshot(snapshot, now),
                kind: BaselineUpdateKind::Created,
            };
        };

        if baseline.is_expired(now, self.window) {
            return BaselineUpdate {
                baseline: Baseline::from_snapshot(snapshot, now),
                kind: BaselineUpdateKind::Reset,
            };
        }

        let alpha = self.smoothing_factor;

        baseline.performance_score =
            smooth(baseline.performance_score, snapshot.performance_score, alpha);

        let processing = &mut baseline.processing_metrics;
        processing.average_processing_time = smooth(
            processing.average_processing_time,
            snapshot.processing_metrics.average_processing_time,
            alpha,
        );
        processing.success_rate = smooth(
            processing.success_rate,
            snapshot.processing_metrics.success_rate,
            alpha,
        );

        let old_memory = baseline.system_metrics.memory_usage;
        let current_memory = snapshot.system_metrics.memory_usage;
        let memory_alpha = if current_memory > old_memory * MEMORY_DECAY_TRIGGER_RATIO {
            MEMORY_SPIKE_SMOOTHING_FACTOR
        } else {
            alpha
        };
        baseline.system_metrics.memory_usage = smooth(old_memory, current_memory, memory_alpha);

        baseline.connection_metrics.total_connections = smooth(
            baseline.connection_metrics.total_connections,
            snapshot.connection_metrics.total_connections,
            alpha,
        );

        BaselineUpdate {
            baseline,
            kind: BaselineUpdateKind::Smoothed,
        }
    }
}

impl Default for BaselineTracker {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_WINDOW)
    }
}

/// Exponential smoothing step: `old * (1 - alpha) + current * alpha`.
///
/// A non-finite `current` leaves the baseline unchanged; a non-finite `old`
/// is replaced by `current`.
pub fn smooth(old: f64, current: f64, alpha: f64) -> f64 {
    if !current.is_finite() {
        return old;
    }
    if !old.is_finite() {
        return current;
    }
    old * (1.0 - alpha) + current * alpha
}
