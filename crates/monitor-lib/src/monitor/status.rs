//! Performance status reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MonitorState, MonitorStats};
use crate::anomaly::Alert;
use crate::models::MetricsSnapshot;

/// Health classification derived from the performance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
    /// Score was not a number
    Unknown,
    /// A fresh snapshot could not be obtained
    Degraded,
}

impl OverallHealth {
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            OverallHealth::Unknown
        } else if score >= 90.0 {
            OverallHealth::Excellent
        } else if score >= 75.0 {
            OverallHealth::Good
        } else if score >= 50.0 {
            OverallHealth::Fair
        } else if score >= 25.0 {
            OverallHealth::Poor
        } else {
            OverallHealth::Critical
        }
    }
}

/// Snapshot of monitoring status for the host system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStatus {
    pub overall_health: OverallHealth,
    pub performance_score: Option<f64>,
    pub active_alerts_count: usize,
    pub active_alerts: Vec<Alert>,
    pub baseline_available: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub monitoring_stats: MonitorStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerformanceStatus {
    /// Status for a freshly collected snapshot
    pub fn from_snapshot(state: &MonitorState, snapshot: &MetricsSnapshot) -> Self {
        let score = snapshot.performance_score;
        Self {
            overall_health: OverallHealth::from_score(score),
            performance_score: score.is_finite().then_some(score),
            error: None,
            ..Self::base(state)
        }
    }

    /// Status when the snapshot could not be collected
    pub fn degraded(state: &MonitorState, error: impl Into<String>) -> Self {
        Self {
            overall_health: OverallHealth::Degraded,
            performance_score: None,
            error: Some(error.into()),
            ..Self::base(state)
        }
    }

    fn base(state: &MonitorState) -> Self {
        let active_alerts = state.active_alerts();
        Self {
            overall_health: OverallHealth::Unknown,
            performance_score: None,
            active_alerts_count: active_alerts.len(),
            active_alerts,
            baseline_available: state.baseline().is_some(),
            last_check: state.stats().last_check_time,
            monitoring_stats: state.stats().clone(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_thresholds() {
        assert_eq!(OverallHealth::from_score(100.0), OverallHealth::Excellent);
        assert_eq!(OverallHealth::from_score(90.0), OverallHealth::Excellent);
        assert_eq!(OverallHealth::from_score(89.9), OverallHealth::Good);
        assert_eq!(OverallHealth::from_score(75.0), OverallHealth::Good);
        assert_eq!(OverallHealth::from_score(50.0), OverallHealth::Fair);
        assert_eq!(OverallHealth::from_score(25.0), OverallHealth::Poor);
        assert_eq!(OverallHealth::from_score(24.9), OverallHealth::Critical);
        assert_eq!(OverallHealth::from_score(0.0), OverallHealth::Critical);
        assert_eq!(OverallHealth::from_score(f64::NAN), OverallHealth::Unknown);
    }

    #[test]
    fn test_status_without_baseline() {
        let state = MonitorState::default();
        let snapshot = MetricsSnapshot {
            performance_score: 80.0,
            ..Default::default()
        };

        let status = PerformanceStatus::from_snapshot(&state, &snapshot);

        assert_eq!(status.overall_health, OverallHealth::Good);
        assert_eq!(status.performance_score, Some(80.0));
        assert!(!status.baseline_available);
        assert!(status.active_alerts.is_empty());
        assert_eq!(status.active_alerts_count, 0);
        assert!(status.last_check.is_none());
    }

    #[test]
    fn test_degraded_status_serialization() {
        let state = MonitorState::default();
        let status = PerformanceStatus::degraded(&state, "metrics provider timed out");

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["overall_health"], "degraded");
        assert_eq!(json["error"], "metrics provider timed out");
        assert_eq!(json["baseline_available"], false);
        assert!(json["performance_score"].is_null());
    }

    #[test]
    fn test_non_numeric_score_is_unknown() {
        let state = MonitorState::default();
        let snapshot = MetricsSnapshot {
            performance_score: f64::NAN,
            ..Default::default()
        };

        let status = PerformanceStatus::from_snapshot(&state, &snapshot);
        assert_eq!(status.overall_health, OverallHealth::Unknown);
        assert!(status.performance_score.is_none());
        assert!(status.error.is_none());
    }
}
