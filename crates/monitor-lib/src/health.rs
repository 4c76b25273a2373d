//! Health tracking for the monitor's own components
//!
//! Feeds liveness and readiness probes. A component that keeps failing is
//! degraded first and unhealthy after [`UNHEALTHY_AFTER_FAILURES`]
//! consecutive failures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive failures before a component is reported unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 5;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Failing intermittently, still serving last good state
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub consecutive_failures: u32,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            consecutive_failures: 0,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Health after one more consecutive failure
    fn failed(previous_failures: u32, message: String) -> Self {
        let consecutive_failures = previous_failures.saturating_add(1);
        let status = if consecutive_failures >= UNHEALTHY_AFTER_FAILURES {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };

        Self {
            status,
            message: Some(message),
            consecutive_failures,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .fold(ComponentStatus::Healthy, |worst, status| match (worst, status) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            })
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const METRICS_PROVIDER: &str = "metrics_provider";
    pub const SCHEDULER: &str = "scheduler";
}

/// Shared registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Record a successful operation, clearing any failure streak
    pub async fn record_success(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Record a failed operation
    pub async fn record_failure(&self, name: &str, message: impl Into<String>) {
        let mut components = self.components.write().await;
        let previous = components
            .get(name)
            .map(|health| health.consecutive_failures)
            .unwrap_or(0);
        components.insert(
            name.to_string(),
            ComponentHealth::failed(previous, message.into()),
        );
    }

    pub async fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.components.read().await.get(name).cloned()
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        let reason = if !ready {
            Some("Monitor not yet started".to_string())
        } else if !health.status.is_operational() {
            Some("Metrics provider failing repeatedly".to_string())
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
