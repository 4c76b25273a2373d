//! HTTP API for health checks, Prometheus metrics and monitor state

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use monitor_lib::{
    health::{ComponentStatus, HealthRegistry},
    monitor::MonitorHandle,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Entries returned by `/history` when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub monitor: MonitorHandle,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, monitor: MonitorHandle) -> Self {
        Self {
            health_registry,
            monitor,
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Current performance status, always 200 (degraded is reported in the body)
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.performance_status().await)
}

async fn alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.active_alerts())
}

async fn baseline(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.monitor.baseline_stats() {
        Some(baseline) => (StatusCode::OK, Json(json!(baseline))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no baseline established yet" })),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.monitor.anomaly_history(limit))
}

/// Queue an immediate check
async fn check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.monitor.check_performance_now();
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
}

async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
) -> impl IntoResponse {
    match state.monitor.resolve_alert(alert_id.as_str()).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "resolved": true }))),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "resolved": false, "error": "no active alert with this id" })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "resolved": false, "error": e.to_string() })),
        ),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .route("/alerts", get(alerts))
        .route("/alerts/:id/resolve", post(resolve_alert))
        .route("/baseline", get(baseline))
        .route("/history", get(history))
        .route("/check", post(check))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
