//! Realtime observer channel
//!
//! Connected clients (the `/chat` browser view, or anything else that
//! speaks the protocol) get an `init` snapshot on connect and a
//! `new_message` push for every history append.

pub mod handler;
pub mod protocol;

pub use handler::handle_socket;
pub use protocol::{ClientEvent, ServerEvent};
