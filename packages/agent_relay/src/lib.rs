//! Agent Relay - instance registry and message router for
//! tmux-hosted agent instances.
//!
//! Agents register an id, a role, and a tmux handle; messages sent to a
//! logical recipient are resolved against the registry, injected into
//! the target terminal by a kind-appropriate delivery strategy,
//! appended to an in-memory history, and pushed to every connected
//! realtime observer.

pub mod cli;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod handlers;
pub mod history;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod tmux;
pub mod views;
pub mod ws;
