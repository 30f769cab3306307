use {adrift_common::PlatformId, async_trait::async_trait, serde::Serialize};

use crate::Result;

/// Lifecycle of an adapter instance.
///
/// `Disconnected → Connecting → Connected → Watching → (Reconnecting ⇄
/// Watching) → Stopped`. `Failed` is the unhealthy terminal state after the
/// loop's retry budget is exhausted; it requires an explicit restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterPhase {
    Disconnected,
    Connecting,
    Connected,
    Watching,
    Reconnecting,
    Stopped,
    Failed,
}

impl AdapterPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Watching => "watching",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    /// Whether the watch loop is no longer running and will not resume on
    /// its own.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// One platform adapter: owns the session, the watermark-driven poll loop,
/// and outbound sends for its platform.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn platform(&self) -> PlatformId;

    fn phase(&self) -> AdapterPhase;

    /// Authenticate with the provider. Called lazily before authenticated
    /// calls once the session cooldown elapses.
    async fn connect(&self) -> Result<()>;

    /// Run a single poll cycle: fetch inbound items past the watermark,
    /// process them in timestamp order, advance the watermark. Returns the
    /// number of items processed. A cycle invoked while the previous one is
    /// still running is a no-op returning zero, not queued.
    async fn poll_once(&self) -> Result<u32>;

    /// Deliver text to one user; returns the provider message id.
    async fn send(&self, recipient_id: &str, text: &str) -> Result<String>;

    /// Publish a public status post. Optional capability.
    async fn post(&self, _text: &str) -> Result<String> {
        Err(crate::Error::unsupported("posting is not available"))
    }

    /// Start the recurring watch loop. Idempotent: a second call while the
    /// loop runs does nothing.
    async fn watch(&self) -> Result<()>;

    /// Signal the watch loop to exit at its next safe point and release
    /// resources. Idempotent and callable while a cycle is in flight.
    async fn cleanup(&self);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases() {
        assert!(AdapterPhase::Stopped.is_terminal());
        assert!(AdapterPhase::Failed.is_terminal());
        assert!(!AdapterPhase::Watching.is_terminal());
        assert!(!AdapterPhase::Reconnecting.is_terminal());
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&AdapterPhase::Reconnecting).unwrap();
        assert_eq!(json, "\"reconnecting\"");
    }
}
