//! Core data models for the performance monitor
//!
//! A [`MetricsSnapshot`] is the point-in-time view handed to the monitor by
//! its metrics provider. Values are plain `f64`; a non-finite value marks a
//! field the provider reported but could not express as a number.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Request processing metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingMetrics {
    /// Average processing time in milliseconds
    pub average_processing_time: f64,
    /// Percentage of successfully processed requests (0-100)
    pub success_rate: f64,
}

/// Process-level system metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemMetrics {
    /// Resident memory in bytes
    pub memory_usage: f64,
}

/// Connection metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionMetrics {
    pub total_connections: f64,
}

/// Point-in-time metrics snapshot produced by a [`crate::collector::MetricsProvider`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    /// Overall performance score (0-100)
    pub performance_score: f64,
    pub processing_metrics: ProcessingMetrics,
    pub system_metrics: SystemMetrics,
    pub connection_metrics: ConnectionMetrics,
}

impl MetricsSnapshot {
    /// Build a snapshot from an untyped JSON map.
    ///
    /// Missing fields become `0.0`. Fields that are present but not numeric
    /// become `NaN`, which downstream consumers treat as "no value".
    pub fn from_value(value: &Value) -> Self {
        Self {
            performance_score: number_at(value, &["performance_score"]),
            processing_metrics: ProcessingMetrics {
                average_processing_time: number_at(
                    value,
                    &["processing_metrics", "average_processing_time"],
                ),
                success_rate: number_at(value, &["processing_metrics", "success_rate"]),
            },
            system_metrics: SystemMetrics {
                memory_usage: number_at(value, &["system_metrics", "memory_usage"]),
            },
            connection_metrics: ConnectionMetrics {
                total_connections: number_at(value, &["connection_metrics", "total_connections"]),
            },
        }
    }

    /// Memory usage in megabytes
    pub fn memory_mb(&self) -> f64 {
        self.system_metrics.memory_usage / BYTES_PER_MB
    }

    /// Complementary error rate (`100 - success_rate`)
    pub fn error_rate(&self) -> f64 {
        100.0 - self.processing_metrics.success_rate
    }
}

/// Convert bytes to megabytes
pub fn bytes_to_mb(bytes: f64) -> f64 {
    bytes / BYTES_PER_MB
}

fn number_at(value: &Value, path: &[&str]) -> f64 {
    let mut current = value;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return 0.0,
        }
    }

    match current {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_full_map() {
        let snapshot = MetricsSnapshot::from_value(&json!({
            "performance_score": 87.5,
            "processing_metrics": {"average_processing_time": 12.0, "success_rate": 99.0},
            "system_metrics": {"memory_usage": 104857600u64},
            "connection_metrics": {"total_connections": 42},
        }));

        assert_eq!(snapshot.performance_score, 87.5);
        assert_eq!(snapshot.processing_metrics.average_processing_time, 12.0);
        assert_eq!(snapshot.processing_metrics.success_rate, 99.0);
        assert_eq!(snapshot.memory_mb(), 100.0);
        assert_eq!(snapshot.connection_metrics.total_connections, 42.0);
        assert!((snapshot.error_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_value_missing_fields_default_to_zero() {
        let snapshot = MetricsSnapshot::from_value(&json!({"performance_score": 50}));

        assert_eq!(snapshot.performance_score, 50.0);
        assert_eq!(snapshot.processing_metrics, ProcessingMetrics::default());
        assert_eq!(snapshot.system_metrics.memory_usage, 0.0);

        let empty = MetricsSnapshot::from_value(&json!("not a map"));
        assert_eq!(empty, MetricsSnapshot::default());
    }

    #[test]
    fn test_from_value_non_numeric_is_nan() {
        let snapshot = MetricsSnapshot::from_value(&json!({
            "performance_score": "n/a",
            "system_metrics": {"memory_usage": [1, 2]},
        }));

        assert!(snapshot.performance_score.is_nan());
        assert!(snapshot.system_metrics.memory_usage.is_nan());
        assert_eq!(snapshot.connection_metrics.total_connections, 0.0);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let snapshot: MetricsSnapshot =
            serde_json::from_str(r#"{"system_metrics": {"memory_usage": 2048}}"#).unwrap();
        assert_eq!(snapshot.system_metrics.memory_usage, 2048.0);
        assert_eq!(snapshot.performance_score, 0.0);
    }
}
