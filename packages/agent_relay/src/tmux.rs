use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("failed to run tmux: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("tmux exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
}

/// The tmux control operations delivery strategies are built from.
///
/// A trait so the delivery selector can be exercised in tests without a
/// tmux server; production uses [`TmuxClient`].
#[async_trait]
pub trait TmuxControl: Send + Sync {
    /// Type a literal string into the target's input stream (no submit).
    async fn send_keys(&self, target: &str, keys: &str) -> Result<(), TmuxError>;
    /// Submit the target's pending input line.
    async fn send_enter(&self, target: &str) -> Result<(), TmuxError>;
    /// Send an interrupt (C-c) to clear any in-progress input.
    async fn send_interrupt(&self, target: &str) -> Result<(), TmuxError>;
    /// Show a transient on-screen banner at the target.
    async fn display_message(&self, target: &str, text: &str) -> Result<(), TmuxError>;
}

/// Shells out to `tmux(1)`, one process per call.
pub struct TmuxClient {
    tmux_bin: String,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self {
            tmux_bin: "tmux".to_string(),
        }
    }

    pub fn with_bin(bin: impl Into<String>) -> Self {
        Self {
            tmux_bin: bin.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<(), TmuxError> {
        let output = Command::new(&self.tmux_bin).args(args).output().await?;
        if !output.status.success() {
            return Err(TmuxError::CommandFailed {
                status: output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TmuxControl for TmuxClient {
    async fn send_keys(&self, target: &str, keys: &str) -> Result<(), TmuxError> {
        // `-l` sends the string literally instead of interpreting key names.
        self.run(&["send-keys", "-t", target, "-l", keys]).await
    }

    async fn send_enter(&self, target: &str) -> Result<(), TmuxError> {
        self.run(&["send-keys", "-t", target, "Enter"]).await
    }

    async fn send_interrupt(&self, target: &str) -> Result<(), TmuxError> {
        self.run(&["send-keys", "-t", target, "C-c"]).await
    }

    async fn display_message(&self, target: &str, text: &str) -> Result<(), TmuxError> {
        self.run(&["display-message", "-t", target, text]).await
    }
}
