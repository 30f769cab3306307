use {adrift_common::PlatformId, async_trait::async_trait};

/// Response produced for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReply {
    pub text: String,
    pub is_error: bool,
}

/// Where adapters forward normalized inbound text. The command interpreter
/// provides the concrete implementation; it never fails — failures come
/// back as templated error replies.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn handle(&self, platform: PlatformId, sender_id: &str, text: &str) -> SinkReply;
}
