use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::server::AppState;
use crate::ws;

/// `GET /ws` — upgrade to the realtime observer channel.
pub async fn ws_handler(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| ws::handle_socket(socket, state))
}
