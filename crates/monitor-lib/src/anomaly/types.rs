//! Anomaly classification types

use serde::{Deserialize, Serialize};

use crate::models::bytes_to_mb;

/// Kind of deviation from the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    PerformanceDegradation,
    ProcessingTimeSpike,
    ErrorRateSpike,
    MemorySpike,
    ConnectionDrop,
}

impl AnomalyType {
    pub const ALL: [AnomalyType; 5] = [
        AnomalyType::PerformanceDegradation,
        AnomalyType::ProcessingTimeSpike,
        AnomalyType::ErrorRateSpike,
        AnomalyType::MemorySpike,
        AnomalyType::ConnectionDrop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::PerformanceDegradation => "performance_degradation",
            AnomalyType::ProcessingTimeSpike => "processing_time_spike",
            AnomalyType::ErrorRateSpike => "error_rate_spike",
            AnomalyType::MemorySpike => "memory_spike",
            AnomalyType::ConnectionDrop => "connection_drop",
        }
    }

    /// Name of the metric this anomaly type is measured on
    pub fn metric_name(&self) -> &'static str {
        match self {
            AnomalyType::PerformanceDegradation => "performance_score",
            AnomalyType::ProcessingTimeSpike => "average_processing_time",
            AnomalyType::ErrorRateSpike => "error_rate",
            AnomalyType::MemorySpike => "memory_usage",
            AnomalyType::ConnectionDrop => "total_connections",
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity levels for anomalies and alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected deviation from the baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    /// Current value of the metric
    pub current: f64,
    /// Baseline value it was compared against
    pub baseline: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spike_ratio: Option<f64>,
}

impl Anomaly {
    /// Ratio of current to baseline, falling back to the direct division
    fn ratio(&self) -> f64 {
        self.spike_ratio.unwrap_or_else(|| {
            if self.baseline.abs() < f64::EPSILON {
                0.0
            } else {
                self.current / self.baseline
            }
        })
    }

    /// Human-readable description of the anomaly
    pub fn message(&self) -> String {
        match self.anomaly_type {
            AnomalyType::PerformanceDegradation => format!(
                "Performance score dropped to {:.1} (baseline: {:.1})",
                self.current, self.baseline
            ),
            AnomalyType::ProcessingTimeSpike => format!(
                "Average processing time spiked to {:.1}ms (baseline: {:.1}ms, {:.1}x)",
                self.current,
                self.baseline,
                self.ratio()
            ),
            AnomalyType::ErrorRateSpike => format!(
                "Error rate increased to {:.1}% (baseline: {:.1}%)",
                self.current, self.baseline
            ),
            AnomalyType::MemorySpike => format!(
                "Memory usage spiked to {:.1}MB (baseline: {:.1}MB, {:.1}x increase)",
                bytes_to_mb(self.current),
                bytes_to_mb(self.baseline),
                self.ratio()
            ),
            AnomalyType::ConnectionDrop => format!(
                "Connection count dropped to {:.0} (baseline: {:.0})",
                self.current, self.baseline
            ),
        }
    }
}
