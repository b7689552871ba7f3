use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Maximum page returned by `GET /messages` and the WebSocket `init` event.
pub const PAGE_LIMIT: usize = 20;
/// Recent-message cap for `GET /status`.
pub const STATUS_RECENT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Message,
    Completion,
    System,
}

/// One delivered (or attempted) message, immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    /// Display names resolved from the registry at write time; not
    /// updated if the instance record later changes.
    pub from_display_name: String,
    pub to_display_name: String,
    pub content: String,
    pub formatted_content: String,
    pub delivery_method: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub to_all: bool,
    pub timestamp: DateTime<Utc>,
    pub delivered: bool,
}

/// Render the terminal-facing form of a message: wall-clock timestamp,
/// sender, and a distinct marker for completion notices.
pub fn format_content(kind: MessageType, from: &str, content: &str) -> String {
    let clock = Local::now().format("%H:%M:%S");
    match kind {
        MessageType::Completion => format!("🤖 [{clock}] {from} completed work: {content}"),
        MessageType::Message | MessageType::System => format!("💬 [{clock}] {from}: {content}"),
    }
}

/// Append-only in-memory message history.
///
/// Unbounded by design: this relay is a short-lived coordination
/// process and queries cap their own result pages.
#[derive(Default)]
pub struct MessageLog {
    entries: RwLock<Vec<MessageRecord>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, record: MessageRecord) {
        self.entries.write().await.push(record);
    }

    /// Filter by recipient id and strictly-newer-than timestamp.
    ///
    /// Returns the most recent `PAGE_LIMIT` matches in insertion order,
    /// plus the total size of the unpaged match set.
    pub async fn query(
        &self,
        instance: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> (Vec<MessageRecord>, usize) {
        let entries = self.entries.read().await;
        let matches: Vec<&MessageRecord> = entries
            .iter()
            .filter(|m| instance.is_none_or(|id| m.to == id))
            .filter(|m| since.is_none_or(|t| m.timestamp > t))
            .collect();

        let total = matches.len();
        let page = matches
            .into_iter()
            .skip(total.saturating_sub(PAGE_LIMIT))
            .cloned()
            .collect();
        (page, total)
    }

    /// The most recent `n` records in insertion order.
    pub async fn recent(&self, n: usize) -> Vec<MessageRecord> {
        let entries = self.entries.read().await;
        entries[entries.len().saturating_sub(n)..].to_vec()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
