//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::HealthResponse;
use crate::state::AppState;

async fn probe_store(state: &AppState) -> bool {
    let healthy = state.store.is_healthy().await;
    if healthy {
        health().store.set_healthy();
    } else {
        health().store.set_unhealthy("store unreachable");
    }
    healthy
}

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_connected = probe_store(&state).await;
    let report = health().report();

    Json(HealthResponse {
        status: report.status,
        store_connected,
        store_message: report.store_message,
        active_sessions: metrics().active_sessions.get(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    if probe_store(&state).await && health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    StatusCode::OK
}
