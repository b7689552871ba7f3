//! Realtime channel protocol types
//!
//! Message types for the browser chat client and any other observer
//! connected over the `/ws` WebSocket.

use serde::{Deserialize, Serialize};

use crate::history::MessageRecord;
use crate::registry::Instance;

/// Server → client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Pushed once, immediately after the connection opens.
    Init {
        instances: Vec<Instance>,
        messages: Vec<MessageRecord>,
    },
    /// Pushed on every history append, from any source.
    NewMessage { message: MessageRecord },
}

/// Client → server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A send originating from the chat UI; routed through the same
    /// dispatch pipeline as `POST /message`.
    SendMessage {
        from: String,
        to: String,
        content: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_send_message_parses() {
        let ev: ClientEvent = serde_json::from_str(
            r#"{"type":"send_message","from":"human","to":"main","content":"hi"}"#,
        )
        .unwrap();
        let ClientEvent::SendMessage { from, to, content } = ev;
        assert_eq!(from, "human");
        assert_eq!(to, "main");
        assert_eq!(content, "hi");
    }

    #[test]
    fn server_events_tag_as_snake_case() {
        let init = ServerEvent::Init {
            instances: vec![],
            messages: vec![],
        };
        let json = serde_json::to_value(&init).unwrap();
        assert_eq!(json["type"], "init");
    }
}
