pub mod health;
pub mod messages;
pub mod register;
pub mod websocket;

pub use health::{health_handler, metrics_handler, root_handler};
pub use messages::{list_messages_handler, message_handler, status_handler};
pub use register::register_handler;
pub use websocket::ws_handler;

use serde::{Deserialize, Serialize};

/// The `{success, message}` acknowledgement shape shared by the
/// register and message endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}
