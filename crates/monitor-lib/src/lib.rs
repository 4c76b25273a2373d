//! Adaptive performance monitoring library
//!
//! This crate provides the core functionality for:
//! - Metrics snapshots from the host process
//! - Adaptive baselines and anomaly detection
//! - Alerting with cooldown and storm suppression
//! - A scheduled monitor task with health checks and observability

pub mod anomaly;
pub mod collector;
pub mod error;
pub mod health;
pub mod models;
pub mod monitor;
pub mod observability;

pub use error::{CollectError, MonitorError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use monitor::{MonitorBuilder, MonitorConfig, MonitorHandle, PerformanceMonitor};
pub use observability::{MonitorMetrics, StructuredLogger};
