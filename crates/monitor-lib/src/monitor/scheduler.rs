//! Monitoring scheduler
//!
//! [`PerformanceMonitor`] is the single owner of [`MonitorState`]. It runs the
//! check cycle on a timer or on request and publishes an immutable view of
//! the state after every change. [`MonitorHandle`] is the cloneable front end:
//! reads come from the latest published view and never wait on a cycle,
//! control operations are messages to the owning task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{
    AnomalyHistoryEntry, CycleOutcome, MonitorConfig, MonitorState, MonitorStats,
    PerformanceStatus,
};
use crate::anomaly::{Alert, Baseline, BaselineUpdateKind};
use crate::collector::{collect_with_timeout, MetricsProvider};
use crate::error::MonitorError;
use crate::health::{components, HealthRegistry};
use crate::models::MetricsSnapshot;
use crate::observability::{MonitorMetrics, StructuredLogger};

/// Messages accepted by the monitor task
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a check cycle as soon as the task is free
    CheckNow,
    /// Threshold overrides; accepted and ignored
    UpdateThresholds(HashMap<String, f64>),
    /// Mark an active alert resolved
    ResolveAlert {
        alert_id: String,
        respond_to: oneshot::Sender<bool>,
    },
}

/// Owner of the monitoring state and driver of the check cycle
pub struct PerformanceMonitor {
    provider: Arc<dyn MetricsProvider>,
    state: MonitorState,
    command_rx: mpsc::Receiver<MonitorCommand>,
    view_tx: watch::Sender<Arc<MonitorState>>,
    health: Option<HealthRegistry>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl PerformanceMonitor {
    /// Run until a shutdown signal arrives.
    ///
    /// The first scheduled check happens one interval after start. The timer
    /// is re-armed only once a cycle has finished, forced or scheduled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let interval = self.state.config().monitoring_interval;
        self.logger
            .log_startup(env!("CARGO_PKG_VERSION"), interval.as_secs());

        if let Some(health) = &self.health {
            health.record_success(components::SCHEDULER).await;
            health.set_ready(true).await;
        }

        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => {
                    self.run_check().await;
                    sleep.as_mut().reset(Instant::now() + interval);
                }
                Some(command) = self.command_rx.recv() => {
                    if self.handle_command(command).await {
                        sleep.as_mut().reset(Instant::now() + interval);
                    }
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }

        if let Some(health) = &self.health {
            health.set_ready(false).await;
        }
        self.logger.log_shutdown("shutdown signal received");
    }

    /// Returns true when a check cycle ran
    async fn handle_command(&mut self, command: MonitorCommand) -> bool {
        match command {
            MonitorCommand::CheckNow => {
                self.run_check().await;
                true
            }
            MonitorCommand::UpdateThresholds(thresholds) => {
                let mut keys: Vec<String> = thresholds.into_keys().collect();
                keys.sort();
                self.logger.log_thresholds_ignored(&keys);
                false
            }
            MonitorCommand::ResolveAlert {
                alert_id,
                respond_to,
            } => {
                let resolved = self.state.resolve_alert(&alert_id, Utc::now());
                self.logger.log_alert_resolved(&alert_id, resolved);
                if resolved {
                    self.metrics
                        .set_active_alerts(self.state.active_alert_count());
                    self.publish();
                }
                // Caller may have given up waiting
                let _ = respond_to.send(resolved);
                false
            }
        }
    }

    /// One check cycle. A failed snapshot leaves the state untouched.
    async fn run_check(&mut self) {
        let start = Instant::now();
        let timeout = self.state.config().metrics_timeout;

        let snapshot = match collect_with_timeout(self.provider.as_ref(), timeout).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let message = e.to_string();
                self.logger.log_snapshot_failure(&message);
                self.metrics.inc_snapshot_failures();
                if let Some(health) = &self.health {
                    health
                        .record_failure(components::METRICS_PROVIDER, message)
                        .await;
                }
                return;
            }
        };

        let outcome = self.state.apply_snapshot(&snapshot, Utc::now());
        self.report(&snapshot, &outcome);

        if let Some(health) = &self.health {
            health.record_success(components::METRICS_PROVIDER).await;
        }

        self.metrics
            .observe_check_latency(start.elapsed().as_secs_f64());
        self.publish();
    }

    fn report(&self, snapshot: &MetricsSnapshot, outcome: &CycleOutcome) {
        if let Some(baseline) = self.state.baseline() {
            match outcome.baseline_update {
                BaselineUpdateKind::Created => {
                    self.logger.log_baseline_created(baseline.performance_score)
                }
                BaselineUpdateKind::Reset => {
                    self.logger.log_baseline_reset(baseline.performance_score);
                    self.metrics.inc_baseline_resets();
                }
                BaselineUpdateKind::Smoothed => {}
            }
        }

        for anomaly in &outcome.anomalies {
            self.logger.log_anomaly(anomaly);
            self.metrics.inc_anomaly(anomaly.anomaly_type);
        }
        for alert in &outcome.alerts {
            self.logger.log_alert(alert);
            self.metrics.inc_alert(alert);
        }
        for (anomaly_type, reason) in &outcome.suppressed {
            self.logger.log_alert_suppressed(*anomaly_type, *reason);
            self.metrics.inc_suppressed(*reason);
        }

        self.metrics.inc_checks();
        self.metrics.set_performance_score(snapshot.performance_score);
        self.metrics
            .set_active_alerts(self.state.active_alert_count());
    }

    fn publish(&self) {
        self.view_tx.send_replace(Arc::new(self.state.clone()));
    }
}

/// Cloneable handle for reading monitor state and sending commands
#[derive(Clone)]
pub struct MonitorHandle {
    command_tx: mpsc::Sender<MonitorCommand>,
    view_rx: watch::Receiver<Arc<MonitorState>>,
    provider: Arc<dyn MetricsProvider>,
    metrics_timeout: Duration,
}

impl MonitorHandle {
    /// Request an immediate check. Does not wait for it to run.
    pub fn check_performance_now(&self) {
        self.send_nowait(MonitorCommand::CheckNow);
    }

    /// Detection thresholds are fixed; the request is only logged
    pub fn update_thresholds(&self, thresholds: HashMap<String, f64>) {
        self.send_nowait(MonitorCommand::UpdateThresholds(thresholds));
    }

    fn send_nowait(&self, command: MonitorCommand) {
        match self.command_tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                debug!(?command, "Monitor command queue full, dropping command");
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Performance monitor is not running, command dropped");
            }
        }
    }

    /// Mark an active alert resolved. Returns false if no active alert has this id.
    pub async fn resolve_alert(&self, alert_id: impl Into<String>) -> Result<bool, MonitorError> {
        let (respond_to, response) = oneshot::channel();
        self.command_tx
            .send(MonitorCommand::ResolveAlert {
                alert_id: alert_id.into(),
                respond_to,
            })
            .await
            .map_err(|_| MonitorError::Unavailable)?;

        response.await.map_err(|_| MonitorError::Unavailable)
    }

    /// Latest published state
    pub fn view(&self) -> Arc<MonitorState> {
        self.view_rx.borrow().clone()
    }

    /// Receiver notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<Arc<MonitorState>> {
        self.view_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.view().active_alerts()
    }

    pub fn baseline_stats(&self) -> Option<Baseline> {
        self.view().baseline().cloned()
    }

    pub fn anomaly_history(&self, limit: usize) -> Vec<AnomalyHistoryEntry> {
        self.view().anomaly_history(limit)
    }

    pub fn monitoring_stats(&self) -> MonitorStats {
        self.view().stats().clone()
    }

    /// Status built from a fresh snapshot and the latest state.
    ///
    /// The snapshot is taken here rather than in the monitor task, so a slow
    /// provider delays only this caller, and never past the metrics timeout.
    pub async fn performance_status(&self) -> PerformanceStatus {
        let result = collect_with_timeout(self.provider.as_ref(), self.metrics_timeout).await;
        let view = self.view();

        match result {
            Ok(snapshot) => PerformanceStatus::from_snapshot(&view, &snapshot),
            Err(e) => {
                warn!(error = %e, "Failed to collect snapshot for status");
                PerformanceStatus::degraded(&view, e.to_string())
            }
        }
    }
}

/// Builder for a monitor task and its handle
pub struct MonitorBuilder {
    provider: Option<Arc<dyn MetricsProvider>>,
    config: MonitorConfig,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
}

impl MonitorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: MonitorConfig::default(),
            health: None,
            logger: None,
        }
    }

    /// Set the metrics provider
    pub fn provider(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn monitoring_interval(mut self, interval: Duration) -> Self {
        self.config.monitoring_interval = interval;
        self
    }

    pub fn alert_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.alert_cooldown = cooldown;
        self
    }

    pub fn baseline_window(mut self, window: Duration) -> Self {
        self.config.baseline_window = window;
        self
    }

    pub fn metrics_timeout(mut self, timeout: Duration) -> Self {
        self.config.metrics_timeout = timeout;
        self
    }

    /// Report provider and scheduler health to this registry
    pub fn health_registry(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the monitor task and its handle
    pub fn build(self) -> Result<(PerformanceMonitor, MonitorHandle)> {
        let provider = self
            .provider
            .ok_or_else(|| anyhow::anyhow!("Metrics provider is required"))?;

        if self.config.monitoring_interval.is_zero() {
            anyhow::bail!("Monitoring interval must be greater than zero");
        }
        if self.config.metrics_timeout.is_zero() {
            anyhow::bail!("Metrics timeout must be greater than zero");
        }
        if self.config.command_buffer == 0 {
            anyhow::bail!("Command buffer must hold at least one command");
        }

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer);
        let metrics_timeout = self.config.metrics_timeout;
        let state = MonitorState::new(self.config);
        let (view_tx, view_rx) = watch::channel(Arc::new(state.clone()));

        let monitor = PerformanceMonitor {
            provider: provider.clone(),
            state,
            command_rx,
            view_tx,
            health: self.health,
            metrics: MonitorMetrics::new(),
            logger: self
                .logger
                .unwrap_or_else(|| StructuredLogger::new("performance-monitor")),
        };

        let handle = MonitorHandle {
            command_tx,
            view_rx,
            provider,
            metrics_timeout,
        };

        Ok((monitor, handle))
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyType;
    use crate::health::ComponentStatus;
    use crate::models::{ConnectionMetrics, ProcessingMetrics, SystemMetrics};
    use crate::monitor::OverallHealth;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::task::JoinHandle;

    const IDLE_INTERVAL: Duration = Duration::from_secs(3600);

    fn snapshot(score: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            performance_score: score,
            processing_metrics: ProcessingMetrics {
                average_processing_time: 20.0,
                success_rate: 99.0,
            },
            system_metrics: SystemMetrics {
                memory_usage: 100.0 * 1024.0 * 1024.0,
            },
            connection_metrics: ConnectionMetrics {
                total_connections: 10.0,
            },
        }
    }

    /// Provider that replays a script, then repeats a healthy snapshot
    struct ScriptedProvider {
        script: Mutex<VecDeque<std::result::Result<MetricsSnapshot, String>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<std::result::Result<MetricsSnapshot, String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl MetricsProvider for ScriptedProvider {
        async fn current_metrics(&self) -> Result<MetricsSnapshot> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(snapshot)) => Ok(snapshot),
                Some(Err(message)) => Err(anyhow::anyhow!(message)),
                None => Ok(snapshot(90.0)),
            }
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl MetricsProvider for HangingProvider {
        async fn current_metrics(&self) -> Result<MetricsSnapshot> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(MetricsSnapshot::default())
        }
    }

    fn start(
        provider: Arc<dyn MetricsProvider>,
        interval: Duration,
        health: Option<HealthRegistry>,
    ) -> (MonitorHandle, broadcast::Sender<()>, JoinHandle<()>) {
        let mut builder = MonitorBuilder::new()
            .provider(provider)
            .monitoring_interval(interval)
            .metrics_timeout(Duration::from_millis(200));
        if let Some(health) = health {
            builder = builder.health_registry(health);
        }
        let (monitor, handle) = builder.build().unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(monitor.run(shutdown_rx));
        (handle, shutdown_tx, task)
    }

    /// Commands are handled in order, so a reply means earlier commands are done
    async fn barrier(handle: &MonitorHandle) {
        assert!(!handle.resolve_alert("barrier").await.unwrap());
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(MonitorBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        let result = MonitorBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(vec![])))
            .monitoring_interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reads_before_any_check() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(snapshot(80.0))]));
        let (_monitor, handle) = MonitorBuilder::new().provider(provider).build().unwrap();

        assert!(handle.baseline_stats().is_none());
        assert!(handle.active_alerts().is_empty());
        assert!(handle.anomaly_history(10).is_empty());
        assert_eq!(handle.monitoring_stats().checks_performed, 0);

        let status = handle.performance_status().await;
        assert_eq!(status.overall_health, OverallHealth::Good);
        assert_eq!(status.performance_score, Some(80.0));
        assert!(!status.baseline_available);
    }

    #[tokio::test]
    async fn test_forced_checks_run_pipeline() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(snapshot(90.0)),
            Ok(snapshot(50.0)),
        ]));
        let (handle, shutdown_tx, task) = start(provider, IDLE_INTERVAL, None);

        handle.check_performance_now();
        handle.check_performance_now();
        barrier(&handle).await;

        let stats = handle.monitoring_stats();
        assert_eq!(stats.checks_performed, 2);
        assert_eq!(stats.alerts_generated, 1);
        assert!(stats.last_check_time.is_some());

        let alerts = handle.active_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AnomalyType::PerformanceDegradation);

        let history = handle.anomaly_history(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].performance_score, 50.0);

        // 90 * 0.9 + 50 * 0.1
        let baseline = handle.baseline_stats().unwrap();
        assert!((baseline.performance_score - 86.0).abs() < 1e-9);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_snapshot_leaves_state_unchanged() {
        let health = HealthRegistry::new();
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(snapshot(90.0)),
            Err("provider exploded".to_string()),
        ]));
        let (handle, shutdown_tx, task) = start(provider, IDLE_INTERVAL, Some(health.clone()));

        handle.check_performance_now();
        barrier(&handle).await;
        let before = handle.view();

        handle.check_performance_now();
        barrier(&handle).await;
        let after = handle.view();

        assert_eq!(after.stats(), before.stats());
        assert_eq!(after.baseline(), before.baseline());
        assert_eq!(after.stats().checks_performed, 1);

        let provider_health = health
            .component(components::METRICS_PROVIDER)
            .await
            .unwrap();
        assert_eq!(provider_health.status, ComponentStatus::Degraded);
        assert!(provider_health
            .message
            .unwrap()
            .contains("provider exploded"));

        // Next good snapshot clears the failure streak
        handle.check_performance_now();
        barrier(&handle).await;
        assert_eq!(handle.monitoring_stats().checks_performed, 2);
        let provider_health = health
            .component(components::METRICS_PROVIDER)
            .await
            .unwrap();
        assert_eq!(provider_health.status, ComponentStatus::Healthy);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_hung_provider_times_out() {
        let (handle, shutdown_tx, task) = start(Arc::new(HangingProvider), IDLE_INTERVAL, None);

        handle.check_performance_now();
        barrier(&handle).await;
        assert_eq!(handle.monitoring_stats().checks_performed, 0);

        let status = handle.performance_status().await;
        assert_eq!(status.overall_health, OverallHealth::Degraded);
        assert!(status.error.unwrap().contains("timed out"));
        assert!(status.performance_score.is_none());

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_scheduled_checks_publish_updates() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let (handle, shutdown_tx, task) =
            start(provider, Duration::from_millis(20), None);

        let mut updates = handle.subscribe();
        tokio::time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("no scheduled check ran")
            .unwrap();

        assert!(handle.monitoring_stats().checks_performed >= 1);
        assert!(handle.baseline_stats().is_some());

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_alert_through_handle() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(snapshot(90.0)),
            Ok(snapshot(40.0)),
        ]));
        let (handle, shutdown_tx, task) = start(provider, IDLE_INTERVAL, None);

        handle.check_performance_now();
        handle.check_performance_now();
        barrier(&handle).await;

        let alert_id = handle.active_alerts()[0].id.clone();
        assert!(handle.resolve_alert(alert_id.clone()).await.unwrap());
        assert!(!handle.resolve_alert(alert_id).await.unwrap());
        assert!(handle.active_alerts().is_empty());

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_update_thresholds_is_ignored() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let (handle, shutdown_tx, task) = start(provider, IDLE_INTERVAL, None);

        let before = handle.view();
        handle.update_thresholds(HashMap::from([("memory_spike".to_string(), 3.0)]));
        barrier(&handle).await;

        assert!(Arc::ptr_eq(&before, &handle.view()));

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_monitor() {
        let health = HealthRegistry::new();
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let (handle, shutdown_tx, task) = start(provider, IDLE_INTERVAL, Some(health.clone()));

        barrier(&handle).await;
        assert!(health.readiness().await.ready);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();

        assert!(!handle.is_running());
        assert!(matches!(
            handle.resolve_alert("any").await,
            Err(MonitorError::Unavailable)
        ));
        assert!(!health.readiness().await.ready);

        // Reads keep serving the last published state
        assert_eq!(handle.monitoring_stats().checks_performed, 0);
    }
}
