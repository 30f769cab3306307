use async_trait::async_trait;

use crate::Result;

/// One normalized inbound direct message from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundItem {
    pub sender_id: String,
    pub text: String,
    /// Provider timestamp in unix milliseconds; drives watermark dedup.
    pub timestamp_ms: i64,
    pub provider_msg_id: String,
}

/// Opaque wire collaborator for one platform. The concrete login,
/// notification-listing, and DM-creation protocols live entirely behind
/// this trait; the core never sees a wire format.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Establish (or re-establish) an authenticated session.
    async fn login(&self) -> Result<()>;

    /// Fetch inbound direct messages newer than `since_ms`, oldest first
    /// not required — the adapter sorts before processing.
    async fn list_inbound_since(&self, since_ms: Option<i64>) -> Result<Vec<InboundItem>>;

    /// Send a direct message; returns the provider-assigned message id.
    async fn send_direct(&self, recipient_id: &str, text: &str) -> Result<String>;

    /// Publish a public status post. Optional capability; the default
    /// refuses.
    async fn post(&self, _text: &str) -> Result<String> {
        Err(crate::Error::unsupported("posting is not available"))
    }
}
