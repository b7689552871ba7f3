//! Send pipeline shared by the HTTP and realtime paths.
//!
//! resolve recipient → run delivery strategy → append history →
//! broadcast to subscribers. Both `POST /message` and the WebSocket
//! `send_message` event funnel through [`send_message`], so they
//! converge on identical downstream behavior.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::delivery::method_name;
use crate::history::{MessageRecord, MessageType, format_content};
use crate::registry::Instance;
use crate::server::AppState;
use crate::ws::protocol::ServerEvent;

/// Reserved recipient: fan out to every registered instance.
pub const TO_ALL: &str = "all";
/// Reserved recipient: the human at the chat UI, no terminal delivery.
pub const TO_HUMAN: &str = "human";

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub from: String,
    pub to: Option<String>,
    pub content: String,
    pub kind: MessageType,
    pub to_all: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Recipient could not be resolved; nothing was recorded.
    NotFound,
    Single {
        delivered: bool,
        method: String,
    },
    Broadcast {
        delivered: usize,
        attempted: usize,
    },
}

pub async fn send_message(state: &AppState, req: SendRequest) -> SendOutcome {
    state.metrics.message_received();

    let to = req.to.as_deref().unwrap_or("");
    info!(from = %req.from, to = %if to.is_empty() { "main" } else { to }, "routing message");

    if req.to_all || to == TO_ALL {
        return broadcast_to_all(state, &req).await;
    }
    if to == TO_HUMAN {
        return deliver_to_human(state, &req).await;
    }

    let Some(target) = state.registry.resolve(req.to.as_deref()).await else {
        warn!(to, "recipient not resolvable");
        return SendOutcome::NotFound;
    };

    let (delivered, method) = deliver_one(state, &req, &target, false).await;
    SendOutcome::Single {
        delivered,
        method: method.to_string(),
    }
}

/// One independent delivery per registered instance, sequential so the
/// tmux control surface is never hit concurrently. A failing leg never
/// aborts the rest.
async fn broadcast_to_all(state: &AppState, req: &SendRequest) -> SendOutcome {
    let instances = state.registry.snapshot().await;
    let mut delivered = 0;
    for instance in &instances {
        if deliver_one(state, req, instance, true).await.0 {
            delivered += 1;
        }
    }
    info!(delivered, attempted = instances.len(), "broadcast complete");
    SendOutcome::Broadcast {
        delivered,
        attempted: instances.len(),
    }
}

/// Messages to the human bypass terminal delivery entirely; they exist
/// to be seen in the chat view, so recording + broadcast is delivery.
async fn deliver_to_human(state: &AppState, req: &SendRequest) -> SendOutcome {
    let record = MessageRecord {
        id: Uuid::new_v4(),
        from: req.from.clone(),
        to: TO_HUMAN.to_string(),
        from_display_name: state.registry.display_name(&req.from).await,
        to_display_name: TO_HUMAN.to_string(),
        content: req.content.clone(),
        formatted_content: format_content(req.kind, &req.from, &req.content),
        delivery_method: "web-chat".to_string(),
        kind: req.kind,
        to_all: false,
        timestamp: Utc::now(),
        delivered: true,
    };
    state.metrics.message_delivered();
    append_and_publish(state, record).await;
    SendOutcome::Single {
        delivered: true,
        method: "web-chat".to_string(),
    }
}

/// Run the delivery strategy for one target and record the attempt.
/// Failed attempts are recorded too, with `delivered=false`.
///
/// The method tag comes from the selector on success and from the same
/// [`method_name`] table on failure, so outcome and record never drift.
async fn deliver_one(
    state: &AppState,
    req: &SendRequest,
    target: &Instance,
    to_all: bool,
) -> (bool, &'static str) {
    let formatted = format_content(req.kind, &req.from, &req.content);

    let (delivered, method) = match state.delivery.deliver(target, &formatted).await {
        Ok(method) => {
            state.metrics.message_delivered();
            info!(to = %target.id, method, "message delivered");
            (true, method)
        }
        Err(e) => {
            state.metrics.message_failed();
            warn!(to = %target.id, error = %e, "delivery failed");
            (false, method_name(target.window_type))
        }
    };

    let delivery_method = if to_all {
        "broadcast".to_string()
    } else {
        method.to_string()
    };

    let record = MessageRecord {
        id: Uuid::new_v4(),
        from: req.from.clone(),
        to: target.id.clone(),
        from_display_name: state.registry.display_name(&req.from).await,
        to_display_name: target.display_name().to_string(),
        content: req.content.clone(),
        formatted_content: formatted,
        delivery_method,
        kind: req.kind,
        to_all,
        timestamp: Utc::now(),
        delivered,
    };
    append_and_publish(state, record).await;
    (delivered, method)
}

/// Append to history and push `new_message` to every live subscriber.
/// A send error only means nobody is connected.
async fn append_and_publish(state: &AppState, record: MessageRecord) {
    state.history.append(record.clone()).await;
    let _ = state.events.send(ServerEvent::NewMessage { message: record });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::tests::FakeTmux;
    use crate::registry::{RegisterRequest, TargetKind};
    use crate::server::AppState;
    use std::sync::Arc;

    fn request(from: &str, to: Option<&str>, content: &str) -> SendRequest {
        SendRequest {
            from: from.to_string(),
            to: to.map(String::from),
            content: content.to_string(),
            kind: MessageType::Message,
            to_all: false,
        }
    }

    fn register(id: &str, role: &str, session: Option<&str>, kind: TargetKind) -> RegisterRequest {
        RegisterRequest {
            id: id.to_string(),
            name: None,
            role: role.to_string(),
            tmux_session: session.map(String::from),
            tmux_window: None,
            tmux_pane: None,
            window_type: kind,
        }
    }

    #[tokio::test]
    async fn unresolvable_recipient_records_nothing() {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        let outcome = send_message(&state, request("ui", Some("ghost"), "hi")).await;
        assert_eq!(outcome, SendOutcome::NotFound);
        assert!(state.history.is_empty().await);
    }

    #[tokio::test]
    async fn missing_target_records_failed_attempt() {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        state
            .registry
            .register(register("w", "main", None, TargetKind::Generic))
            .await
            .unwrap();

        let outcome = send_message(&state, request("ui", Some("w"), "hi")).await;
        assert_eq!(
            outcome,
            SendOutcome::Single {
                delivered: false,
                method: "tmux".to_string(),
            }
        );

        let (records, total) = state.history.query(None, None).await;
        assert_eq!(total, 1);
        assert!(!records[0].delivered);
    }

    #[tokio::test]
    async fn human_recipient_bypasses_terminal_delivery() {
        let tmux = Arc::new(FakeTmux::new());
        let state = AppState::new(tmux.clone());

        let outcome = send_message(&state, request("w", Some("human"), "done")).await;
        assert_eq!(
            outcome,
            SendOutcome::Single {
                delivered: true,
                method: "web-chat".to_string(),
            }
        );
        assert!(tmux.calls.lock().unwrap().is_empty());

        let records = state.history.recent(10).await;
        assert_eq!(records[0].to, "human");
        assert_eq!(records[0].delivery_method, "web-chat");
        assert!(records[0].delivered);
    }

    #[tokio::test]
    async fn empty_recipient_routes_to_main_role() {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        state
            .registry
            .register(register("helper", "helper", Some("h"), TargetKind::Generic))
            .await
            .unwrap();
        state
            .registry
            .register(register("boss", "main", Some("b"), TargetKind::Generic))
            .await
            .unwrap();

        send_message(&state, request("ui", None, "hi")).await;
        assert_eq!(state.history.recent(1).await[0].to, "boss");
    }

    #[tokio::test]
    async fn broadcast_records_one_leg_per_instance() {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        for id in ["a", "b", "c"] {
            state
                .registry
                .register(register(id, "helper", Some("s"), TargetKind::SimpleTerminal))
                .await
                .unwrap();
        }

        let outcome = send_message(&state, request("ui", Some("all"), "hi")).await;
        assert_eq!(
            outcome,
            SendOutcome::Broadcast {
                delivered: 3,
                attempted: 3,
            }
        );

        let (records, total) = state.history.query(None, None).await;
        assert_eq!(total, 3);
        assert!(records.iter().all(|r| r.to_all));
        assert!(records.iter().all(|r| r.delivery_method == "broadcast"));
        let tos: Vec<&str> = records.iter().map(|r| r.to.as_str()).collect();
        assert_eq!(tos, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn broadcast_failure_does_not_abort_remaining_legs() {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        // "b" has no target handle, so its leg fails.
        state
            .registry
            .register(register("a", "helper", Some("s"), TargetKind::SimpleTerminal))
            .await
            .unwrap();
        state
            .registry
            .register(register("b", "helper", None, TargetKind::Generic))
            .await
            .unwrap();
        state
            .registry
            .register(register("c", "helper", Some("s"), TargetKind::SimpleTerminal))
            .await
            .unwrap();

        let outcome = send_message(&state, request("ui", Some("all"), "hi")).await;
        assert_eq!(
            outcome,
            SendOutcome::Broadcast {
                delivered: 2,
                attempted: 3,
            }
        );

        let (records, _) = state.history.query(None, None).await;
        assert_eq!(records.len(), 3);
        assert!(!records[1].delivered);
        assert!(records[2].delivered);
    }

    #[tokio::test]
    async fn every_append_publishes_one_event() {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        let mut events = state.events.subscribe();
        state
            .registry
            .register(register("a", "main", Some("s"), TargetKind::SimpleTerminal))
            .await
            .unwrap();

        send_message(&state, request("ui", Some("a"), "one")).await;
        send_message(&state, request("ui", Some("human"), "two")).await;

        let ServerEvent::NewMessage { message } = events.try_recv().unwrap() else {
            panic!("expected new_message");
        };
        assert_eq!(message.content, "one");
        let ServerEvent::NewMessage { message } = events.try_recv().unwrap() else {
            panic!("expected new_message");
        };
        assert_eq!(message.content, "two");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn outcome_and_record_share_the_strategy_method() {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        state
            .registry
            .register(register("h", "main", Some("dev"), TargetKind::HybridTerminal))
            .await
            .unwrap();

        let outcome = send_message(&state, request("ui", Some("h"), "hi")).await;
        let SendOutcome::Single { delivered, method } = outcome else {
            panic!("expected single outcome");
        };
        assert!(delivered);
        assert_eq!(method, "hybrid-terminal");
        assert_eq!(state.history.recent(1).await[0].delivery_method, method);
    }

    #[tokio::test]
    async fn display_names_resolve_at_write_time() {
        let state = AppState::new(Arc::new(FakeTmux::new()));
        let mut req = register("w", "main", Some("s"), TargetKind::SimpleTerminal);
        req.name = Some("Worker".to_string());
        state.registry.register(req).await.unwrap();

        send_message(&state, request("ui", Some("w"), "hi")).await;

        let rec = &state.history.recent(1).await[0];
        assert_eq!(rec.to_display_name, "Worker");
        // Sender is unregistered: degrades to the raw id.
        assert_eq!(rec.from_display_name, "ui");
    }
}
