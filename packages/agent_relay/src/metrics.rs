//! Server metrics for observability
//!
//! Runtime counters for monitoring the relay's health and throughput.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server-wide metrics, cheap to bump from any handler.
#[derive(Debug)]
pub struct ServerMetrics {
    /// Currently connected realtime subscribers
    pub active_subscribers: AtomicU64,
    /// Total realtime connections since start
    pub total_subscribers: AtomicU64,
    /// Send requests accepted (HTTP and WebSocket)
    pub messages_received: AtomicU64,
    /// Delivery attempts that reported success
    pub messages_delivered: AtomicU64,
    /// Delivery attempts that failed
    pub messages_failed: AtomicU64,
    /// Registration upserts
    pub registrations: AtomicU64,
    started: Instant,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            active_subscribers: AtomicU64::new(0),
            total_subscribers: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn subscriber_connected(&self) {
        self.active_subscribers.fetch_add(1, Ordering::Relaxed);
        self.total_subscribers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_disconnected(&self) {
        self.active_subscribers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_failed(&self) {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_subscribers: self.active_subscribers.load(Ordering::Relaxed),
            total_subscribers: self.total_subscribers.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            uptime_secs: self.uptime_secs(),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics view returned by `GET /metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub active_subscribers: u64,
    pub total_subscribers: u64,
    pub messages_received: u64,
    pub messages_delivered: u64,
    pub messages_failed: u64,
    pub registrations: u64,
    pub uptime_secs: u64,
}
