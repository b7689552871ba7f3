use axum::extract::ws::{Message, WebSocket};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::protocol::{ClientEvent, ServerEvent};
use crate::dispatch::{self, SendRequest};
use crate::history::{MessageType, PAGE_LIMIT};
use crate::server::AppState;

/// Registry snapshot plus the most recent history page, the first
/// event every fresh subscriber receives.
async fn init_event(state: &AppState) -> ServerEvent {
    ServerEvent::Init {
        instances: state.registry.snapshot().await,
        messages: state.history.recent(PAGE_LIMIT).await,
    }
}

/// Drive one realtime connection until the client or transport closes it.
///
/// No reconnection state is kept here; retry/backoff is the client's
/// problem.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("realtime subscriber connected");
    state.metrics.subscriber_connected();

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the snapshot so appends that race the
    // handshake are pushed rather than lost. A record appended in that
    // window shows up in `init` AND as a forwarded `new_message`; the
    // chat client drops the duplicate by record id.
    let mut events = state.events.subscribe();

    let init = init_event(&state).await;
    let init_json = match serde_json::to_string(&init) {
        Ok(j) => j,
        Err(e) => {
            error!(error = %e, "failed to serialize init event");
            state.metrics.subscriber_disconnected();
            return;
        }
    };
    if sender.send(Message::Text(init_json.into())).await.is_err() {
        state.metrics.subscriber_disconnected();
        return;
    }

    // Forward history appends to this subscriber until it goes away.
    let forward_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            error!(error = %e, "failed to serialize event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged behind event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Inbound: chat sends go through the same pipeline as POST /message.
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::SendMessage { from, to, content }) => {
                    dispatch::send_message(
                        &state,
                        SendRequest {
                            from,
                            to: Some(to),
                            content,
                            kind: MessageType::Message,
                            to_all: false,
                        },
                    )
                    .await;
                }
                Err(e) => debug!(error = %e, "ignoring unparseable client message"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    forward_task.abort();
    state.metrics.subscriber_disconnected();
    info!("realtime subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::tests::FakeTmux;
    use crate::registry::{RegisterRequest, TargetKind};
    use std::sync::Arc;

    async fn seeded_state(message_count: usize) -> AppState {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        state
            .registry
            .register(RegisterRequest {
                id: "worker".into(),
                name: None,
                role: "main".into(),
                tmux_session: None,
                tmux_window: None,
                tmux_pane: None,
                window_type: TargetKind::SimpleTerminal,
            })
            .await
            .unwrap();
        for i in 0..message_count {
            dispatch::send_message(
                &state,
                SendRequest {
                    from: "ui".into(),
                    to: Some("worker".into()),
                    content: format!("msg {i}"),
                    kind: MessageType::Message,
                    to_all: false,
                },
            )
            .await;
        }
        state
    }

    #[tokio::test]
    async fn init_carries_snapshot_and_existing_history() {
        let state = seeded_state(3).await;
        let ServerEvent::Init {
            instances,
            messages,
        } = init_event(&state).await
        else {
            panic!("expected init event");
        };
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].id, "worker");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "msg 0");
    }

    #[tokio::test]
    async fn init_history_page_is_capped_to_most_recent() {
        let state = seeded_state(PAGE_LIMIT + 5).await;
        let ServerEvent::Init { messages, .. } = init_event(&state).await else {
            panic!("expected init event");
        };
        assert_eq!(messages.len(), PAGE_LIMIT);
        // Oldest records fall off the front; order stays chronological.
        assert_eq!(messages[0].content, "msg 5");
        assert_eq!(
            messages.last().unwrap().content,
            format!("msg {}", PAGE_LIMIT + 4)
        );
    }
}
