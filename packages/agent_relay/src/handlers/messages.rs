use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::Ack;
use crate::dispatch::{self, SendOutcome, SendRequest};
use crate::history::{MessageType, STATUS_RECENT};
use crate::server::AppState;

/// `POST /message` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub from: String,
    pub to: Option<String>,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    #[serde(default)]
    pub to_all: bool,
}

/// `POST /message` — resolve, deliver, record, broadcast.
pub async fn message_handler(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let outcome = dispatch::send_message(
        &state,
        SendRequest {
            from: req.from,
            to: req.to,
            content: req.content,
            kind: req.kind,
            to_all: req.to_all,
        },
    )
    .await;

    match outcome {
        SendOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            Json(Ack {
                success: false,
                message: "Target instance not found".to_string(),
            }),
        )
            .into_response(),
        SendOutcome::Single { delivered: true, .. } => Json(Ack {
            success: true,
            message: "Message delivered".to_string(),
        })
        .into_response(),
        SendOutcome::Single {
            delivered: false, ..
        } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Ack {
                success: false,
                message: "Message delivery failed".to_string(),
            }),
        )
            .into_response(),
        SendOutcome::Broadcast {
            delivered,
            attempted,
        } => Json(Ack {
            success: delivered == attempted,
            message: format!("Broadcast delivered to {delivered}/{attempted} instances"),
        })
        .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub instance: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

/// `GET /messages?instance=&since=` — filtered history, page capped at
/// the most recent 20.
pub async fn list_messages_handler(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Response {
    let (messages, total) = state
        .history
        .query(query.instance.as_deref(), query.since)
        .await;

    Json(serde_json::json!({
        "messages": messages,
        "total": total,
    }))
    .into_response()
}

/// `GET /status` — registry snapshot plus recent history.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    Json(serde_json::json!({
        "instances": state.registry.snapshot().await,
        "totalMessages": state.history.len().await,
        "recentMessages": state.history.recent(STATUS_RECENT).await,
    }))
    .into_response()
}
