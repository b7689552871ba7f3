use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::registry::{Instance, TargetKind};
use crate::tmux::{TmuxControl, TmuxError};

/// Pause between send-keys steps so the receiving shell can keep up.
const TYPE_DELAY: Duration = Duration::from_millis(300);
/// Longer pause after an interrupt, before typing resumes.
const INTERRUPT_DELAY: Duration = Duration::from_millis(500);
/// Short pause before submitting the best-effort comment line.
const COMMENT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("instance '{0}' has no usable tmux target")]
    MissingTarget(String),
    #[error(transparent)]
    Tmux(#[from] TmuxError),
}

/// The wire-visible method tag for a target kind's strategy. Delivery
/// outcomes and history records both take their tag from here.
pub fn method_name(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::SimpleTerminal => "simple-terminal",
        TargetKind::HybridTerminal => "hybrid-terminal",
        TargetKind::SessionTerminal => "session-terminal",
        TargetKind::Generic => "tmux",
    }
}

/// Picks and runs the delivery procedure matching an instance's
/// declared target kind, reporting the method tag on success.
///
/// Each kind maps to a fixed side-effect sequence against tmux; the
/// selector isolates that variance behind one call so the dispatch
/// pipeline treats delivery as opaque.
pub struct DeliverySelector {
    tmux: Arc<dyn TmuxControl>,
}

impl DeliverySelector {
    pub fn new(tmux: Arc<dyn TmuxControl>) -> Self {
        Self { tmux }
    }

    pub async fn deliver(
        &self,
        instance: &Instance,
        formatted: &str,
    ) -> Result<&'static str, DeliveryError> {
        match instance.window_type {
            TargetKind::SimpleTerminal => self.deliver_simple(instance, formatted),
            TargetKind::HybridTerminal => self.deliver_hybrid(instance, formatted).await?,
            TargetKind::SessionTerminal => self.deliver_session(instance, formatted).await?,
            TargetKind::Generic => self.deliver_generic(instance, formatted).await?,
        }
        Ok(method_name(instance.window_type))
    }

    /// No terminal side effect; the caller only wants history and
    /// realtime broadcast.
    fn deliver_simple(&self, instance: &Instance, formatted: &str) {
        info!(id = %instance.id, message = %formatted, "simple-terminal delivery (log only)");
    }

    /// Clear pending input, type the message as an echo, then a blank
    /// line, submitting each step after a short pacing delay.
    async fn deliver_hybrid(
        &self,
        instance: &Instance,
        formatted: &str,
    ) -> Result<(), DeliveryError> {
        let session = instance
            .tmux_session
            .as_deref()
            .ok_or_else(|| DeliveryError::MissingTarget(instance.id.clone()))?;

        self.type_and_submit(session, "").await?;
        self.type_and_submit(session, &echo_line(formatted)).await?;
        self.type_and_submit(session, "echo ''").await?;

        info!(id = %instance.id, session, "delivered via hybrid-terminal");
        Ok(())
    }

    /// Interrupt whatever is on the input line first, then echo the
    /// formatted message followed by a blank line for separation.
    async fn deliver_session(
        &self,
        instance: &Instance,
        formatted: &str,
    ) -> Result<(), DeliveryError> {
        let session = instance
            .tmux_session
            .as_deref()
            .ok_or_else(|| DeliveryError::MissingTarget(instance.id.clone()))?;

        self.tmux.send_interrupt(session).await?;
        tokio::time::sleep(INTERRUPT_DELAY).await;

        self.type_and_submit(session, &echo_line(formatted)).await?;
        self.type_and_submit(session, "echo").await?;

        info!(id = %instance.id, session, "delivered via session-terminal");
        Ok(())
    }

    /// Transient banner first (that alone satisfies delivery), then a
    /// best-effort comment line in the input stream.
    async fn deliver_generic(
        &self,
        instance: &Instance,
        formatted: &str,
    ) -> Result<(), DeliveryError> {
        let target = instance
            .tmux_target()
            .ok_or_else(|| DeliveryError::MissingTarget(instance.id.clone()))?;

        self.tmux.display_message(target, formatted).await?;

        let comment = format!("# {formatted}");
        if let Err(e) = self.comment_line(target, &comment).await {
            debug!(id = %instance.id, error = %e, "comment injection failed, banner shown");
        }

        info!(id = %instance.id, target, "delivered via tmux display-message");
        Ok(())
    }

    async fn comment_line(&self, target: &str, comment: &str) -> Result<(), TmuxError> {
        self.tmux.send_keys(target, comment).await?;
        tokio::time::sleep(COMMENT_DELAY).await;
        self.tmux.send_enter(target).await
    }

    async fn type_and_submit(&self, target: &str, keys: &str) -> Result<(), TmuxError> {
        self.tmux.send_keys(target, keys).await?;
        tokio::time::sleep(TYPE_DELAY).await;
        self.tmux.send_enter(target).await
    }
}

/// Build an `echo '...'` line, escaping embedded single quotes so the
/// message cannot break out of the quoting.
fn echo_line(text: &str) -> String {
    format!("echo '{}'", text.replace('\'', r"'\''"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::registry::Instance;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Records every tmux call; individual operations can be armed to fail.
    pub(crate) struct FakeTmux {
        pub calls: Mutex<Vec<String>>,
        pub fail_send_keys: bool,
        pub fail_display: bool,
    }

    impl FakeTmux {
        pub fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_send_keys: false,
                fail_display: false,
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn io_fail() -> TmuxError {
            TmuxError::CommandFailed {
                status: "1".into(),
                stderr: "no server running".into(),
            }
        }
    }

    #[async_trait]
    impl TmuxControl for FakeTmux {
        async fn send_keys(&self, target: &str, keys: &str) -> Result<(), TmuxError> {
            if self.fail_send_keys {
                return Err(Self::io_fail());
            }
            self.record(format!("send-keys {target} {keys}"));
            Ok(())
        }

        async fn send_enter(&self, target: &str) -> Result<(), TmuxError> {
            self.record(format!("enter {target}"));
            Ok(())
        }

        async fn send_interrupt(&self, target: &str) -> Result<(), TmuxError> {
            self.record(format!("interrupt {target}"));
            Ok(())
        }

        async fn display_message(&self, target: &str, text: &str) -> Result<(), TmuxError> {
            if self.fail_display {
                return Err(Self::io_fail());
            }
            self.record(format!("display {target} {text}"));
            Ok(())
        }
    }

    pub(crate) fn instance(kind: TargetKind, session: Option<&str>) -> Instance {
        Instance {
            id: "worker".into(),
            name: None,
            role: "helper".into(),
            tmux_session: session.map(String::from),
            tmux_window: None,
            tmux_pane: None,
            window_type: kind,
            last_active: Utc::now(),
        }
    }

    #[tokio::test]
    async fn simple_terminal_always_succeeds_without_side_effects() {
        let tmux = Arc::new(FakeTmux::new());
        let selector = DeliverySelector::new(tmux.clone());
        let inst = instance(TargetKind::SimpleTerminal, None);

        let method = selector.deliver(&inst, "hello").await.unwrap();
        assert_eq!(method, "simple-terminal");
        assert!(tmux.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hybrid_requires_session() {
        let selector = DeliverySelector::new(Arc::new(FakeTmux::new()));
        let inst = instance(TargetKind::HybridTerminal, None);
        assert!(matches!(
            selector.deliver(&inst, "hello").await,
            Err(DeliveryError::MissingTarget(_))
        ));
    }

    #[tokio::test]
    async fn hybrid_runs_three_submit_steps() {
        let tmux = Arc::new(FakeTmux::new());
        let selector = DeliverySelector::new(tmux.clone());
        let inst = instance(TargetKind::HybridTerminal, Some("dev"));

        let method = selector.deliver(&inst, "hello").await.unwrap();
        assert_eq!(method, "hybrid-terminal");

        let calls = tmux.calls.lock().unwrap();
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[0], "send-keys dev ");
        assert_eq!(calls[1], "enter dev");
        assert_eq!(calls[2], "send-keys dev echo 'hello'");
        assert_eq!(calls[5], "enter dev");
    }

    #[tokio::test]
    async fn session_terminal_interrupts_first() {
        let tmux = Arc::new(FakeTmux::new());
        let selector = DeliverySelector::new(tmux.clone());
        let inst = instance(TargetKind::SessionTerminal, Some("dev"));

        let method = selector.deliver(&inst, "hello").await.unwrap();
        assert_eq!(method, "session-terminal");

        let calls = tmux.calls.lock().unwrap();
        assert_eq!(calls[0], "interrupt dev");
        assert_eq!(calls[1], "send-keys dev echo 'hello'");
        assert_eq!(calls.last().unwrap(), "enter dev");
    }

    #[tokio::test]
    async fn generic_requires_some_target() {
        let selector = DeliverySelector::new(Arc::new(FakeTmux::new()));
        let inst = instance(TargetKind::Generic, None);
        assert!(matches!(
            selector.deliver(&inst, "hello").await,
            Err(DeliveryError::MissingTarget(_))
        ));
    }

    #[tokio::test]
    async fn generic_swallows_comment_failure() {
        let mut tmux = FakeTmux::new();
        tmux.fail_send_keys = true;
        let tmux = Arc::new(tmux);
        let selector = DeliverySelector::new(tmux.clone());
        let inst = instance(TargetKind::Generic, Some("dev"));

        // Banner succeeds, comment injection fails, delivery still counts.
        let method = selector.deliver(&inst, "hello").await.unwrap();
        assert_eq!(method, "tmux");
        assert_eq!(tmux.calls.lock().unwrap().as_slice(), ["display dev hello"]);
    }

    #[tokio::test]
    async fn generic_fails_when_banner_fails() {
        let mut tmux = FakeTmux::new();
        tmux.fail_display = true;
        let selector = DeliverySelector::new(Arc::new(tmux));
        let inst = instance(TargetKind::Generic, Some("dev"));

        assert!(matches!(
            selector.deliver(&inst, "hello").await,
            Err(DeliveryError::Tmux(_))
        ));
    }

    #[test]
    fn echo_line_escapes_single_quotes() {
        assert_eq!(echo_line("it's done"), r"echo 'it'\''s done'");
    }

    #[tokio::test]
    async fn generic_prefers_window_then_pane() {
        let tmux = Arc::new(FakeTmux::new());
        let selector = DeliverySelector::new(tmux.clone());
        let mut inst = instance(TargetKind::Generic, None);
        inst.tmux_pane = Some("%3".into());

        selector.deliver(&inst, "hi").await.unwrap();
        assert_eq!(tmux.calls.lock().unwrap()[0], "display %3 hi");
    }
}
