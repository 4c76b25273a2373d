//! Monitor state and the check-smooth-detect-alert transition
//!
//! [`MonitorState`] is owned by exactly one [`super::PerformanceMonitor`].
//! Everything a monitoring cycle changes goes through
//! [`MonitorState::apply_snapshot`], which takes an explicit clock.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BoundedHistory;
use crate::anomaly::{
    Alert, AlertManager, Anomaly, AnomalyDetector, AnomalyType, Baseline, BaselineTracker,
    BaselineUpdateKind, SuppressionReason, DEFAULT_ALERT_COOLDOWN, DEFAULT_BASELINE_WINDOW,
};
use crate::models::MetricsSnapshot;

/// Most recent alerts retained
pub const MAX_RECENT_ALERTS: usize = 20;

/// Most recent eventful cycles retained
pub const MAX_ANOMALY_HISTORY: usize = 10;

/// Active alerts reported by read operations
pub const MAX_ACTIVE_ALERTS_REPORTED: usize = 10;

/// Default interval between checks (30 seconds)
pub const DEFAULT_MONITORING_INTERVAL: Duration = Duration::from_secs(30);

/// Default timeout for a single metrics provider call
pub const DEFAULT_METRICS_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the performance monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between scheduled checks (default: 30 seconds)
    pub monitoring_interval: Duration,
    /// Minimum time between unresolved alerts of one type (default: 5 minutes)
    pub alert_cooldown: Duration,
    /// Maximum baseline age before it is rebuilt (default: 1 hour)
    pub baseline_window: Duration,
    /// Timeout for the metrics provider (default: 5 seconds)
    pub metrics_timeout: Duration,
    /// Command channel buffer size
    pub command_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitoring_interval: DEFAULT_MONITORING_INTERVAL,
            alert_cooldown: DEFAULT_ALERT_COOLDOWN,
            baseline_window: DEFAULT_BASELINE_WINDOW,
            metrics_timeout: DEFAULT_METRICS_TIMEOUT,
            command_buffer: 32,
        }
    }
}

/// Running counters over successful checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub checks_performed: u64,
    pub alerts_generated: u64,
    pub anomalies_detected: u64,
    pub last_check_time: Option<DateTime<Utc>>,
}

/// A cycle that produced at least one anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub anomalies: Vec<Anomaly>,
    pub performance_score: f64,
}

/// What a single cycle changed
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub baseline_update: BaselineUpdateKind,
    pub anomalies: Vec<Anomaly>,
    pub alerts: Vec<Alert>,
    pub suppressed: Vec<(AnomalyType, SuppressionReason)>,
}

/// All mutable monitoring state
#[derive(Debug, Clone)]
pub struct MonitorState {
    config: MonitorConfig,
    baseline: Option<Baseline>,
    recent_alerts: BoundedHistory<Alert>,
    anomaly_history: BoundedHistory<AnomalyHistoryEntry>,
    stats: MonitorStats,
    tracker: BaselineTracker,
    detector: AnomalyDetector,
    alert_manager: AlertManager,
}

impl MonitorState {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            tracker: BaselineTracker::new(config.baseline_window),
            detector: AnomalyDetector::new(),
            alert_manager: AlertManager::new(config.alert_cooldown),
            baseline: None,
            recent_alerts: BoundedHistory::new(MAX_RECENT_ALERTS),
            anomaly_history: BoundedHistory::new(MAX_ANOMALY_HISTORY),
            stats: MonitorStats::default(),
            config,
        }
    }

    /// Fold a successful snapshot into the state
    pub fn apply_snapshot(&mut self, snapshot: &MetricsSnapshot, now: DateTime<Utc>) -> CycleOutcome {
        let update = self.tracker.update(self.baseline.take(), snapshot, now);

        // Detect against the updated baseline; a brand-new baseline has
        // nothing to compare against yet.
        let anomalies = match update.kind {
            BaselineUpdateKind::Created => Vec::new(),
            _ => self.detector.detect(snapshot, Some(&update.baseline)),
        };

        let batch = self
            .alert_manager
            .evaluate(&anomalies, self.recent_alerts.as_slice(), now);
        self.recent_alerts.extend_front(batch.alerts.clone());

        if !anomalies.is_empty() {
            self.anomaly_history.push(AnomalyHistoryEntry {
                timestamp: now,
                anomalies: anomalies.clone(),
                performance_score: snapshot.performance_score,
            });
        }

        self.stats.checks_performed += 1;
        self.stats.anomalies_detected += anomalies.len() as u64;
        self.stats.alerts_generated += batch.alerts.len() as u64;
        self.stats.last_check_time = Some(now);

        self.baseline = Some(update.baseline);

        CycleOutcome {
            baseline_update: update.kind,
            anomalies,
            alerts: batch.alerts,
            suppressed: batch.suppressed,
        }
    }

    /// Mark an alert resolved. Returns false for unknown or already resolved ids.
    pub fn resolve_alert(&mut self, alert_id: &str, now: DateTime<Utc>) -> bool {
        match self
            .recent_alerts
            .iter_mut()
            .find(|alert| alert.id == alert_id && alert.is_active())
        {
            Some(alert) => {
                alert.resolved_at = Some(now);
                true
            }
            None => false,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// Unresolved alerts, newest first, at most [`MAX_ACTIVE_ALERTS_REPORTED`]
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.recent_alerts
            .iter()
            .filter(|alert| alert.is_active())
            .take(MAX_ACTIVE_ALERTS_REPORTED)
            .cloned()
            .collect()
    }

    /// Number of unresolved alerts retained
    pub fn active_alert_count(&self) -> usize {
        self.recent_alerts.iter().filter(|a| a.is_active()).count()
    }

    /// All retained alerts, newest first
    pub fn recent_alerts(&self) -> Vec<Alert> {
        self.recent_alerts.to_vec()
    }

    /// Eventful cycles, newest first, at most `limit`
    pub fn anomaly_history(&self, limit: usize) -> Vec<AnomalyHistoryEntry> {
        self.anomaly_history.newest(limit)
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
