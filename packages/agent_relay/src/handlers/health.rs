use axum::{Json, extract::State, response::IntoResponse};

use crate::server::AppState;

/// `GET /health` — liveness, registry size, uptime seconds.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "instances": state.registry.len().await,
        "uptime": state.metrics.uptime_secs(),
    }))
}

/// `GET /metrics` — detailed counters.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// `GET /` — plain identification, handy for probes.
pub async fn root_handler() -> &'static str {
    "Agent Relay"
}
