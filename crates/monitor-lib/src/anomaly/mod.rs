//! Anomaly detection against an adaptive baseline
//!
//! This module provides:
//! - Baseline tracking with exponential smoothing and adaptive memory decay
//! - Threshold classification of deviations into typed anomalies
//! - Alert generation with cooldown and storm suppression

mod alerter;
mod baseline;
mod detector;
mod types;

pub use alerter::{
    Alert, AlertBatch, AlertManager, SuppressionReason, DEFAULT_ALERT_COOLDOWN, STORM_LIMIT,
    STORM_WINDOW,
};
pub use baseline::{
    smooth, Baseline, BaselineTracker, BaselineUpdate, BaselineUpdateKind,
    DEFAULT_BASELINE_WINDOW, DEFAULT_SMOOTHING_FACTOR, MEMORY_DECAY_TRIGGER_RATIO,
    MEMORY_SPIKE_SMOOTHING_FACTOR,
};
pub use detector::{
    AnomalyDetector, CONNECTION_DROP_RATIO, MEMORY_CRITICAL_RATIO, MEMORY_HIGH_RATIO,
    MEMORY_SPIKE_RATIO, PERFORMANCE_DEGRADATION_RATIO, PROCESSING_SPIKE_FLOOR_MS,
    PROCESSING_SPIKE_RATIO, SUCCESS_RATE_DROP_RATIO,
};
pub use types::{Anomaly, AnomalyType, Severity};
