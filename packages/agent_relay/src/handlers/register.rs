use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::Ack;
use crate::registry::RegisterRequest;
use crate::server::AppState;

/// `POST /register` — upsert an instance. Always succeeds unless the
/// body is missing required fields.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    match state.registry.register(req).await {
        Ok(instance) => {
            state.metrics.registration();
            Json(Ack {
                success: true,
                message: format!("{} registered successfully", instance.display_name()),
            })
            .into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(Ack {
                success: false,
                message: format!("Registration failed: {e}"),
            }),
        )
            .into_response(),
    }
}
