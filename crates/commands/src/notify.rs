use {
    adrift_store::types::{MessageRecord, NewMessage},
    async_trait::async_trait,
};

/// Outbound seam for cross-platform notifications. The relay dispatcher
/// implements this; the interpreter only hands it a delivery request and
/// never inspects the outcome beyond logging.
#[async_trait]
pub trait RelaySink: Send + Sync {
    async fn relay(&self, message: NewMessage) -> anyhow::Result<MessageRecord>;
}
