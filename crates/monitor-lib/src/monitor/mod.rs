//! Scheduling and state ownership for the performance monitor
//!
//! A single [`PerformanceMonitor`] task owns all mutable state and runs the
//! check-smooth-detect-alert cycle. Everything else talks to it through a
//! [`MonitorHandle`].

mod history;
mod scheduler;
mod state;
mod status;

pub use history::BoundedHistory;
pub use scheduler::{MonitorBuilder, MonitorCommand, MonitorHandle, PerformanceMonitor};
pub use state::{
    AnomalyHistoryEntry, CycleOutcome, MonitorConfig, MonitorState, MonitorStats,
    DEFAULT_METRICS_TIMEOUT, DEFAULT_MONITORING_INTERVAL, MAX_ACTIVE_ALERTS_REPORTED,
    MAX_ANOMALY_HISTORY, MAX_RECENT_ALERTS,
};
pub use status::{OverallHealth, PerformanceStatus};
