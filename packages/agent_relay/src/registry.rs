use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Which delivery strategy an instance's terminal target expects.
///
/// Arrives on the wire as the `windowType` field. Anything unknown
/// (or absent) falls back to `Generic`, which covers plain tmux panes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    SimpleTerminal,
    HybridTerminal,
    SessionTerminal,
    #[default]
    #[serde(other)]
    Generic,
}

/// A registered agent and the tmux handle it can be reached at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    /// Display label. Falls back to `id` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux_session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux_pane: Option<String>,
    #[serde(default)]
    pub window_type: TargetKind,
    pub last_active: DateTime<Utc>,
}

impl Instance {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// The most specific usable tmux handle: session, then window, then pane.
    pub fn tmux_target(&self) -> Option<&str> {
        self.tmux_session
            .as_deref()
            .or(self.tmux_window.as_deref())
            .or(self.tmux_pane.as_deref())
    }
}

/// Registration request body for `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub role: String,
    pub tmux_session: Option<String>,
    pub tmux_window: Option<String>,
    pub tmux_pane: Option<String>,
    #[serde(default)]
    pub window_type: TargetKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Default)]
struct RegistryInner {
    instances: HashMap<String, Instance>,
    /// Ids in first-registration order. Re-registration keeps the slot.
    order: Vec<String>,
}

/// In-memory registry of live agent instances.
///
/// Entries persist for the process lifetime; there is deliberately no
/// deletion or expiry. Re-registering an id replaces the prior entry
/// in full (last write wins).
#[derive(Default)]
pub struct InstanceRegistry {
    inner: RwLock<RegistryInner>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an instance. Fails only when `id` or `role` is missing.
    pub async fn register(&self, req: RegisterRequest) -> Result<Instance, ValidationError> {
        if req.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if req.role.trim().is_empty() {
            return Err(ValidationError::MissingField("role"));
        }

        let instance = Instance {
            id: req.id,
            name: req.name,
            role: req.role,
            tmux_session: req.tmux_session,
            tmux_window: req.tmux_window,
            tmux_pane: req.tmux_pane,
            window_type: req.window_type,
            last_active: Utc::now(),
        };

        let mut inner = self.inner.write().await;
        if !inner.instances.contains_key(&instance.id) {
            inner.order.push(instance.id.clone());
        }
        info!(
            id = %instance.id,
            role = %instance.role,
            target = instance.tmux_target().unwrap_or("none"),
            kind = ?instance.window_type,
            "registered instance"
        );
        inner
            .instances
            .insert(instance.id.clone(), instance.clone());

        Ok(instance)
    }

    /// Resolve a logical recipient to an instance.
    ///
    /// An empty/absent recipient or the literal `"main"` picks the first
    /// registered instance with `role == "main"`; anything else is an
    /// exact id lookup.
    pub async fn resolve(&self, to: Option<&str>) -> Option<Instance> {
        let inner = self.inner.read().await;
        match to {
            None | Some("") | Some("main") => inner
                .order
                .iter()
                .filter_map(|id| inner.instances.get(id))
                .find(|i| i.role == "main")
                .cloned(),
            Some(id) => inner.instances.get(id).cloned(),
        }
    }

    /// Point-in-time copy of all instances in first-registration order.
    pub async fn snapshot(&self) -> Vec<Instance> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.instances.get(id))
            .cloned()
            .collect()
    }

    /// Display name for an id, degrading to the raw id for anything
    /// not (or no longer) registered — including the synthetic
    /// `"human"` and `"all"` tokens.
    pub async fn display_name(&self, id: &str) -> String {
        let inner = self.inner.read().await;
        inner
            .instances
            .get(id)
            .map(|i| i.display_name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.instances.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
