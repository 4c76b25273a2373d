//! Alert generation for detected anomalies
//!
//! Handles:
//! - Per-type cooldown against recent unresolved alerts
//! - Storm suppression for memory spikes
//! - Formatting anomalies into alert records

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Anomaly, AnomalyType, Severity};

/// Default cooldown between alerts of the same type (5 minutes)
pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Window for memory spike storm suppression
pub const STORM_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Memory spike alerts allowed inside [`STORM_WINDOW`] before suppression
pub const STORM_LIMIT: usize = 3;

/// A deduplicated record that an anomaly was surfaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AnomalyType,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub metric_name: String,
    pub current_value: f64,
    /// Baseline value the metric was compared against
    pub threshold_value: f64,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Build an unresolved alert from an anomaly
    pub fn from_anomaly(anomaly: &Anomaly, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alert_type: anomaly.anomaly_type,
            severity: anomaly.severity,
            message: anomaly.message(),
            timestamp: now,
            metric_name: anomaly.anomaly_type.metric_name().to_string(),
            current_value: anomaly.current,
            threshold_value: anomaly.baseline,
            resolved_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.resolved_at.is_none()
    }

    /// Whether the alert was raised less than `window` before `now`
    fn is_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match (now - self.timestamp).to_std() {
            Ok(age) => age < window,
            // Timestamp in the future relative to `now`
            Err(_) => true,
        }
    }
}

/// Why an anomaly did not become an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    /// An unresolved alert of the same type is still cooling down
    Cooldown,
    /// Too many memory spike alerts in the storm window
    Storm,
    /// Same type already alerted earlier in this batch
    Duplicate,
}

impl SuppressionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressionReason::Cooldown => "cooldown",
            SuppressionReason::Storm => "storm",
            SuppressionReason::Duplicate => "duplicate",
        }
    }
}

/// Outcome of evaluating a batch of anomalies
#[derive(Debug, Clone, Default)]
pub struct AlertBatch {
    pub alerts: Vec<Alert>,
    pub suppressed: Vec<(AnomalyType, SuppressionReason)>,
}

/// Turns anomalies into alerts, applying cooldown and storm suppression
#[derive(Debug, Clone)]
pub struct AlertManager {
    /// Minimum time between unresolved alerts of the same type
    pub cooldown: Duration,
}

impl AlertManager {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Set custom cooldown
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Anomaly types with an unresolved alert younger than the cooldown
    pub fn types_in_cooldown(&self, recent_alerts: &[Alert], now: DateTime<Utc>) -> HashSet<AnomalyType> {
        recent_alerts
            .iter()
            .filter(|alert| alert.is_active() && alert.is_within(now, self.cooldown))
            .map(|alert| alert.alert_type)
            .collect()
    }

    /// Whether memory spike alerts have hit the storm limit
    pub fn is_memory_storm(&self, recent_alerts: &[Alert], now: DateTime<Utc>) -> bool {
        let recent_spikes = recent_alerts
            .iter()
            .filter(|alert| alert.alert_type == AnomalyType::MemorySpike)
            .filter(|alert| alert.is_within(now, STORM_WINDOW))
            .count();
        recent_spikes >= STORM_LIMIT
    }

    /// Decide which anomalies become alerts, recording why the rest were dropped
    pub fn evaluate(
        &self,
        anomalies: &[Anomaly],
        recent_alerts: &[Alert],
        now: DateTime<Utc>,
    ) -> AlertBatch {
        let cooling_down = self.types_in_cooldown(recent_alerts, now);
        let memory_storm = self.is_memory_storm(recent_alerts, now);
        let mut alerted: HashSet<AnomalyType> = HashSet::new();
        let mut batch = AlertBatch::default();

        for anomaly in anomalies {
            let anomaly_type = anomaly.anomaly_type;

            let reason = if cooling_down.contains(&anomaly_type) {
                Some(SuppressionReason::Cooldown)
            } else if anomaly_type == AnomalyType::MemorySpike && memory_storm {
                Some(SuppressionReason::Storm)
            } else if alerted.contains(&anomaly_type) {
                Some(SuppressionReason::Duplicate)
            } else {
                None
            };

            match reason {
                Some(reason) => batch.suppressed.push((anomaly_type, reason)),
                None => {
                    alerted.insert(anomaly_type);
                    batch.alerts.push(Alert::from_anomaly(anomaly, now));
                }
            }
        }

        batch
    }

    /// New alerts for `anomalies`, newest-batch order preserved
    pub fn generate(
        &self,
        anomalies: &[Anomaly],
        recent_alerts: &[Alert],
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        self.evaluate(anomalies, recent_alerts, now).alerts
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_COOLDOWN)
    }
}
