//! Threshold-based anomaly detection
//!
//! Compares a snapshot against the baseline with independent checks on the
//! performance score, processing time, error rate, memory and connections.
//! Detection is stateless; every call yields a fresh list of anomalies.

use super::{Anomaly, AnomalyType, Baseline, Severity};
use crate::models::MetricsSnapshot;

/// Score below this fraction of the baseline is a degradation
pub const PERFORMANCE_DEGRADATION_RATIO: f64 = 0.7;

/// Processing time above this multiple of the baseline is a spike
pub const PROCESSING_SPIKE_RATIO: f64 = 10.0;

/// Absolute processing-time floor (ms) below which ratios are noise
pub const PROCESSING_SPIKE_FLOOR_MS: f64 = 10.0;

/// Success rate below this fraction of the baseline is an error spike
pub const SUCCESS_RATE_DROP_RATIO: f64 = 0.8;

/// Memory above this multiple of the baseline is a spike
pub const MEMORY_SPIKE_RATIO: f64 = 2.0;

/// Memory spike ratio at or above which severity is critical
pub const MEMORY_CRITICAL_RATIO: f64 = 5.0;

/// Memory spike ratio at or above which severity is high
pub const MEMORY_HIGH_RATIO: f64 = 3.0;

/// Connection count below this fraction of the baseline is a drop
pub const CONNECTION_DROP_RATIO: f64 = 0.5;

/// Detects deviations of a snapshot from the baseline
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyDetector;

impl AnomalyDetector {
    pub fn new() -> Self {
        Self
    }

    /// Run every check against the baseline.
    ///
    /// Returns an empty list when there is no baseline yet.
    pub fn detect(&self, snapshot: &MetricsSnapshot, baseline: Option<&Baseline>) -> Vec<Anomaly> {
        let Some(baseline) = baseline else {
            return Vec::new();
        };

        [
            self.check_performance(snapshot, baseline),
            self.check_processing_time(snapshot, baseline),
            self.check_error_rate(snapshot, baseline),
            self.check_memory(snapshot, baseline),
            self.check_connections(snapshot, baseline),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn check_performance(&self, snapshot: &MetricsSnapshot, baseline: &Baseline) -> Option<Anomaly> {
        let current = snapshot.performance_score;
        let expected = baseline.performance_score;

        (current < expected * PERFORMANCE_DEGRADATION_RATIO).then_some(Anomaly {
            anomaly_type: AnomalyType::PerformanceDegradation,
            severity: Severity::High,
            current,
            baseline: expected,
            spike_ratio: None,
        })
    }

    fn check_processing_time(
        &self,
        snapshot: &MetricsSnapshot,
        baseline: &Baseline,
    ) -> Option<Anomaly> {
        let current = snapshot.processing_metrics.average_processing_time;
        let expected = baseline.processing_metrics.average_processing_time;

        if !is_positive(expected) {
            return None;
        }

        let spiking =
            current > expected * PROCESSING_SPIKE_RATIO && current > PROCESSING_SPIKE_FLOOR_MS;

        spiking.then(|| Anomaly {
            anomaly_type: AnomalyType::ProcessingTimeSpike,
            severity: Severity::Medium,
            current,
            baseline: expected,
            spike_ratio: Some(current / expected),
        })
    }

    fn check_error_rate(&self, snapshot: &MetricsSnapshot, baseline: &Baseline) -> Option<Anomaly> {
        let current_success = snapshot.processing_metrics.success_rate;
        let baseline_success = baseline.processing_metrics.success_rate;

        (current_success < baseline_success * SUCCESS_RATE_DROP_RATIO).then(|| Anomaly {
            anomaly_type: AnomalyType::ErrorRateSpike,
            severity: Severity::High,
            current: snapshot.error_rate(),
            baseline: baseline.error_rate(),
            spike_ratio: None,
        })
    }

    fn check_memory(&self, snapshot: &MetricsSnapshot, baseline: &Baseline) -> Option<Anomaly> {
        let current = snapshot.system_metrics.memory_usage;
        let expected = baseline.system_metrics.memory_usage;

        if !is_positive(expected) || !is_positive(current - expected * MEMORY_SPIKE_RATIO) {
            return None;
        }

        let ratio = current / expected;
        let severity = if ratio >= MEMORY_CRITICAL_RATIO {
            Severity::Critical
        } else if ratio >= MEMORY_HIGH_RATIO {
            Severity::High
        } else {
            Severity::Medium
        };

        Some(Anomaly {
            anomaly_type: AnomalyType::MemorySpike,
            severity,
            current,
            baseline: expected,
            spike_ratio: Some(ratio),
        })
    }

    fn check_connections(&self, snapshot: &MetricsSnapshot, baseline: &Baseline) -> Option<Anomaly> {
        let current = snapshot.connection_metrics.total_connections;
        let expected = baseline.connection_metrics.total_connections;

        if !is_positive(expected) {
            return None;
        }

        (current < expected * CONNECTION_DROP_RATIO).then_some(Anomaly {
            anomaly_type: AnomalyType::ConnectionDrop,
            severity: Severity::High,
            current,
            baseline: expected,
            spike_ratio: None,
        })
    }
}

/// False for zero, negative and NaN
fn is_positive(value: f64) -> bool {
    value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionMetrics, ProcessingMetrics, SystemMetrics};
    use chrono::Utc;

    const MB: f64 = 1024.0 * 1024.0;

    fn snapshot(score: f64, processing_ms: f64, success: f64, memory_mb: f64, conns: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            performance_score: score,
            processing_metrics: ProcessingMetrics {
                average_processing_time: processing_ms,
                success_rate: success,
            },
            system_metrics: SystemMetrics {
                memory_usage: memory_mb * MB,
            },
            connection_metrics: ConnectionMetrics {
                total_connections: conns,
            },
        }
    }

    fn baseline_from(snapshot: &MetricsSnapshot) -> Baseline {
        Baseline::from_snapshot(snapshot, Utc::now())
    }

    fn normal() -> MetricsSnapshot {
        snapshot(90.0, 20.0, 99.0, 100.0, 50.0)
    }

    fn types(anomalies: &[Anomaly]) -> Vec<AnomalyType> {
        anomalies.iter().map(|a| a.anomaly_type).collect()
    }

    #[test]
    fn test_no_baseline_no_anomalies() {
        let detector = AnomalyDetector::new();
        let terrible = snapshot(1.0, 5000.0, 1.0, 10_000.0, 0.0);
        assert!(detector.detect(&terrible, None).is_empty());
    }

    #[test]
    fn test_normal_snapshot_no_anomalies() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&normal());
        assert!(detector.detect(&normal(), Some(&base)).is_empty());
    }

    #[test]
    fn test_performance_threshold_is_strict() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&normal());
        let threshold = 90.0 * PERFORMANCE_DEGRADATION_RATIO;

        let mut at = normal();
        at.performance_score = threshold;
        assert!(detector.detect(&at, Some(&base)).is_empty());

        let mut below = normal();
        below.performance_score = threshold - 1e-9;
        let anomalies = detector.detect(&below, Some(&base));
        assert_eq!(types(&anomalies), vec![AnomalyType::PerformanceDegradation]);
        assert_eq!(anomalies[0].severity, Severity::High);
    }

    #[test]
    fn test_processing_spike_requires_ratio_and_floor() {
        let detector = AnomalyDetector::new();

        // 0.1ms -> 1.1ms is 11x but under the absolute floor
        let fast = snapshot(90.0, 0.1, 99.0, 100.0, 50.0);
        let base = baseline_from(&fast);
        let mut noisy = fast;
        noisy.processing_metrics.average_processing_time = 1.1;
        assert!(detector.detect(&noisy, Some(&base)).is_empty());

        // 20ms -> 250ms crosses both
        let base = baseline_from(&normal());
        let mut slow = normal();
        slow.processing_metrics.average_processing_time = 250.0;
        let anomalies = detector.detect(&slow, Some(&base));
        assert_eq!(types(&anomalies), vec![AnomalyType::ProcessingTimeSpike]);
        assert_eq!(anomalies[0].severity, Severity::Medium);
        assert!((anomalies[0].spike_ratio.unwrap() - 12.5).abs() < 1e-9);

        // Exactly 10x is not a spike
        let mut exact = normal();
        exact.processing_metrics.average_processing_time = 200.0;
        assert!(detector.detect(&exact, Some(&base)).is_empty());
    }

    #[test]
    fn test_processing_spike_skipped_without_baseline_time() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&snapshot(90.0, 0.0, 99.0, 100.0, 50.0));
        let slow = snapshot(90.0, 500.0, 99.0, 100.0, 50.0);
        assert!(detector.detect(&slow, Some(&base)).is_empty());
    }

    #[test]
    fn test_error_rate_spike_reports_error_rate() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&normal());
        let mut failing = normal();
        failing.processing_metrics.success_rate = 70.0;

        let anomalies = detector.detect(&failing, Some(&base));
        assert_eq!(types(&anomalies), vec![AnomalyType::ErrorRateSpike]);
        assert!((anomalies[0].current - 30.0).abs() < 1e-9);
        assert!((anomalies[0].baseline - 1.0).abs() < 1e-9);
        assert_eq!(anomalies[0].severity, Severity::High);
    }

    #[test]
    fn test_memory_spike_severity_scales_with_ratio() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&normal());

        let cases = [
            (200.0, None),
            (250.0, Some(Severity::Medium)),
            (300.0, Some(Severity::High)),
            (499.0, Some(Severity::High)),
            (500.0, Some(Severity::Critical)),
            (600.0, Some(Severity::Critical)),
        ];

        for (memory_mb, expected) in cases {
            let mut snap = normal();
            snap.system_metrics.memory_usage = memory_mb * MB;
            let anomalies = detector.detect(&snap, Some(&base));
            assert_eq!(
                anomalies.first().map(|a| a.severity),
                expected,
                "memory {}MB",
                memory_mb
            );
        }
    }

    #[test]
    fn test_memory_spike_message() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&normal());
        let mut snap = normal();
        snap.system_metrics.memory_usage = 600.0 * MB;

        let anomalies = detector.detect(&snap, Some(&base));
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].spike_ratio, Some(6.0));

        let message = anomalies[0].message();
        assert!(message.contains("600"));
        assert!(message.contains("100"));
        assert!(message.contains("6.0x"));
    }

    #[test]
    fn test_connection_drop() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&normal());

        let mut half = normal();
        half.connection_metrics.total_connections = 25.0;
        assert!(detector.detect(&half, Some(&base)).is_empty());

        let mut dropped = normal();
        dropped.connection_metrics.total_connections = 24.0;
        let anomalies = detector.detect(&dropped, Some(&base));
        assert_eq!(types(&anomalies), vec![AnomalyType::ConnectionDrop]);

        // No connections in the baseline means nothing to drop from
        let idle_base = baseline_from(&snapshot(90.0, 20.0, 99.0, 100.0, 0.0));
        assert!(detector.detect(&dropped, Some(&idle_base)).is_empty());
    }

    #[test]
    fn test_multiple_anomalies_in_one_pass() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&normal());
        let bad = snapshot(30.0, 400.0, 50.0, 700.0, 5.0);

        let anomalies = detector.detect(&bad, Some(&base));
        assert_eq!(
            types(&anomalies),
            vec![
                AnomalyType::PerformanceDegradation,
                AnomalyType::ProcessingTimeSpike,
                AnomalyType::ErrorRateSpike,
                AnomalyType::MemorySpike,
                AnomalyType::ConnectionDrop,
            ]
        );
    }

    #[test]
    fn test_non_numeric_values_never_trigger() {
        let detector = AnomalyDetector::new();
        let base = baseline_from(&normal());
        let nan = snapshot(f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN);
        assert!(detector.detect(&nan, Some(&base)).is_empty());
    }
}
