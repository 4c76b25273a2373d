//! Observability infrastructure for the performance monitor
//!
//! Provides:
//! - Prometheus metrics (checks, anomalies, alerts, suppression, check latency)
//! - Structured logging of monitor events with tracing

use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

use crate::anomaly::{Alert, Anomaly, AnomalyType, SuppressionReason};

/// Histogram buckets for check latency (in seconds)
const CHECK_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    checks_total: IntCounter,
    snapshot_failures_total: IntCounter,
    anomalies_total: IntCounterVec,
    alerts_total: IntCounterVec,
    alerts_suppressed_total: IntCounterVec,
    baseline_resets_total: IntCounter,
    check_latency_seconds: Histogram,
    performance_score: Gauge,
    active_alerts: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            checks_total: register_int_counter!(
                "perf_monitor_checks_total",
                "Monitoring cycles completed with a snapshot"
            )
            .expect("Failed to register checks_total"),

            snapshot_failures_total: register_int_counter!(
                "perf_monitor_snapshot_failures_total",
                "Monitoring cycles skipped because the snapshot failed"
            )
            .expect("Failed to register snapshot_failures_total"),

            anomalies_total: register_int_counter_vec!(
                "perf_monitor_anomalies_total",
                "Anomalies detected by type",
                &["type"]
            )
            .expect("Failed to register anomalies_total"),

            alerts_total: register_int_counter_vec!(
                "perf_monitor_alerts_total",
                "Alerts generated by type and severity",
                &["type", "severity"]
            )
            .expect("Failed to register alerts_total"),

            alerts_suppressed_total: register_int_counter_vec!(
                "perf_monitor_alerts_suppressed_total",
                "Anomalies that did not become alerts, by reason",
                &["reason"]
            )
            .expect("Failed to register alerts_suppressed_total"),

            baseline_resets_total: register_int_counter!(
                "perf_monitor_baseline_resets_total",
                "Baselines rebuilt after exceeding the baseline window"
            )
            .expect("Failed to register baseline_resets_total"),

            check_latency_seconds: register_histogram!(
                "perf_monitor_check_latency_seconds",
                "Time spent in a monitoring cycle including the snapshot",
                CHECK_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register check_latency_seconds"),

            performance_score: register_gauge!(
                "perf_monitor_performance_score",
                "Performance score from the latest snapshot"
            )
            .expect("Failed to register performance_score"),

            active_alerts: register_int_gauge!(
                "perf_monitor_active_alerts",
                "Unresolved alerts currently retained"
            )
            .expect("Failed to register active_alerts"),
        }
    }
}

/// Lightweight handle to the global monitor metrics.
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn inc_checks(&self) {
        self.inner().checks_total.inc();
    }

    pub fn inc_snapshot_failures(&self) {
        self.inner().snapshot_failures_total.inc();
    }

    pub fn inc_anomaly(&self, anomaly_type: AnomalyType) {
        self.inner()
            .anomalies_total
            .with_label_values(&[anomaly_type.as_str()])
            .inc();
    }

    pub fn inc_alert(&self, alert: &Alert) {
        self.inner()
            .alerts_total
            .with_label_values(&[alert.alert_type.as_str(), alert.severity.as_str()])
            .inc();
    }

    pub fn inc_suppressed(&self, reason: SuppressionReason) {
        self.inner()
            .alerts_suppressed_total
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    pub fn inc_baseline_resets(&self) {
        self.inner().baseline_resets_total.inc();
    }

    pub fn observe_check_latency(&self, duration_secs: f64) {
        self.inner().check_latency_seconds.observe(duration_secs);
    }

    /// Non-finite scores are not exported
    pub fn set_performance_score(&self, score: f64) {
        if score.is_finite() {
            self.inner().performance_score.set(score);
        }
    }

    pub fn set_active_alerts(&self, count: usize) {
        self.inner()
            .active_alerts
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

/// Structured logger for monitor events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64) {
        info!(
            event = "monitor_started",
            instance = %self.instance,
            version = %version,
            interval_secs = interval_secs,
            "Performance monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Performance monitor shutting down"
        );
    }

    /// Newly detected anomaly, always at warning level
    pub fn log_anomaly(&self, anomaly: &Anomaly) {
        warn!(
            event = "anomaly_detected",
            instance = %self.instance,
            anomaly_type = %anomaly.anomaly_type,
            severity = %anomaly.severity,
            current = anomaly.current,
            baseline = anomaly.baseline,
            spike_ratio = ?anomaly.spike_ratio,
            message = %anomaly.message(),
            "Performance anomaly detected"
        );
    }

    pub fn log_alert(&self, alert: &Alert) {
        info!(
            event = "alert_generated",
            instance = %self.instance,
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            metric = %alert.metric_name,
            message = %alert.message,
            "Alert generated"
        );
    }

    pub fn log_alert_suppressed(&self, anomaly_type: AnomalyType, reason: SuppressionReason) {
        debug!(
            event = "alert_suppressed",
            instance = %self.instance,
            anomaly_type = %anomaly_type,
            reason = reason.as_str(),
            "Alert suppressed"
        );
    }

    pub fn log_alert_resolved(&self, alert_id: &str, resolved: bool) {
        if resolved {
            info!(
                event = "alert_resolved",
                instance = %self.instance,
                alert_id = %alert_id,
                "Alert resolved"
            );
        } else {
            debug!(
                event = "alert_resolve_ignored",
                instance = %self.instance,
                alert_id = %alert_id,
                "No active alert with this id"
            );
        }
    }

    pub fn log_snapshot_failure(&self, error: &str) {
        error!(
            event = "snapshot_failed",
            instance = %self.instance,
            error = %error,
            "Failed to collect metrics snapshot, skipping check"
        );
    }

    pub fn log_baseline_created(&self, performance_score: f64) {
        info!(
            event = "baseline_created",
            instance = %self.instance,
            performance_score = performance_score,
            "Performance baseline established"
        );
    }

    pub fn log_baseline_reset(&self, performance_score: f64) {
        info!(
            event = "baseline_reset",
            instance = %self.instance,
            performance_score = performance_score,
            "Baseline window elapsed, rebuilt baseline from current snapshot"
        );
    }

    pub fn log_thresholds_ignored(&self, keys: &[String]) {
        info!(
            event = "thresholds_update_ignored",
            instance = %self.instance,
            keys = ?keys,
            "Detection thresholds are fixed; update ignored"
        );
    }
}
