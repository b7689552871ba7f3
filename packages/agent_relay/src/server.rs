use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::delivery::DeliverySelector;
use crate::handlers;
use crate::history::MessageLog;
use crate::metrics::ServerMetrics;
use crate::registry::InstanceRegistry;
use crate::tmux::{TmuxClient, TmuxControl};
use crate::views;
use crate::ws::ServerEvent;

/// Buffered events per subscriber before a slow one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything the handlers share. Cheap to clone; all components are
/// behind `Arc`s and manage their own interior locking.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<InstanceRegistry>,
    pub history: Arc<MessageLog>,
    pub delivery: Arc<DeliverySelector>,
    /// Fan-out to realtime subscribers; each connection holds a receiver.
    pub events: broadcast::Sender<ServerEvent>,
    pub metrics: Arc<ServerMetrics>,
}

impl AppState {
    pub fn new(tmux: Arc<dyn TmuxControl>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            registry: Arc::new(InstanceRegistry::new()),
            history: Arc::new(MessageLog::new()),
            delivery: Arc::new(DeliverySelector::new(tmux)),
            events,
            metrics: Arc::new(ServerMetrics::new()),
        }
    }
}

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/register", post(handlers::register_handler))
        .route("/message", post(handlers::message_handler))
        .route("/messages", get(handlers::list_messages_handler))
        .route("/status", get(handlers::status_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/chat", get(views::chat_page))
        .route("/ws", get(handlers::ws_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until a termination signal arrives. The listener is
/// closed before the process exits, so shutdown never strands a
/// half-accepted connection.
pub async fn run(host: &str, port: u16) -> Result<()> {
    let state = AppState::new(Arc::new(TmuxClient::new()));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    let addr = listener.local_addr()?;

    info!("Agent Relay listening on http://{addr}");
    info!("API endpoints:");
    info!("  POST /register  - Register an instance");
    info!("  POST /message   - Route a message");
    info!("  GET  /messages  - Query history");
    info!("  GET  /status    - Registry + recent history");
    info!("  GET  /health    - Liveness");
    info!("  GET  /chat      - Browser chat client");
    info!("  GET  /ws        - Realtime event stream");

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }
        info!("Received shutdown signal, draining connections...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}
