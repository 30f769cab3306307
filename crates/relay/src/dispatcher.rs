//! Routes one rendered notification to the adapter for its target platform
//! and records the outcome. Delivery records are audit data; nothing reads
//! them back for control flow.

use std::sync::{Arc, PoisonError, RwLock};

use {
    adrift_channels::{AdapterRegistry, Result},
    adrift_commands::RelaySink,
    adrift_store::{
        MailboxStore,
        types::{MessageRecord, NewMessage},
    },
    async_trait::async_trait,
    tracing::{info, warn},
};

/// Stateless dispatcher over the shared adapter registry.
pub struct RelayDispatcher {
    registry: Arc<RwLock<AdapterRegistry>>,
    store: Arc<dyn MailboxStore>,
}

impl RelayDispatcher {
    #[must_use]
    pub fn new(registry: Arc<RwLock<AdapterRegistry>>, store: Arc<dyn MailboxStore>) -> Self {
        Self { registry, store }
    }

    /// Persist the message as pending, attempt exactly one delivery, and
    /// record the terminal status. A failed send still returns `Ok` with
    /// the failed record; only a missing adapter or a store failure is an
    /// error for the caller.
    pub async fn dispatch(&self, message: NewMessage) -> Result<MessageRecord> {
        let record = self.store.create_message(message).await?;

        let resolved = {
            let registry = self
                .registry
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            registry.resolve(record.target_platform)
        };
        let adapter = match resolved {
            Ok(adapter) => adapter,
            Err(e) => {
                self.store
                    .mark_message_failed(record.id, &e.to_string())
                    .await?;
                warn!(
                    message_id = record.id,
                    platform = %record.target_platform,
                    "relay target platform is not running"
                );
                return Err(e);
            }
        };

        match adapter.send(&record.source_user, &record.content).await {
            Ok(provider_id) => {
                let sent = self.store.mark_message_sent(record.id, &provider_id).await?;
                info!(
                    message_id = sent.id,
                    platform = %sent.target_platform,
                    provider_id,
                    "relayed message"
                );
                Ok(sent)
            }
            Err(e) => {
                let failed = self
                    .store
                    .mark_message_failed(record.id, &e.to_string())
                    .await?;
                warn!(
                    message_id = failed.id,
                    platform = %failed.target_platform,
                    error = %e,
                    "relay delivery failed"
                );
                Ok(failed)
            }
        }
    }
}

#[async_trait]
impl RelaySink for RelayDispatcher {
    async fn relay(&self, message: NewMessage) -> anyhow::Result<MessageRecord> {
        let record = self.dispatch(message).await?;
        if let Some(error) = &record.error {
            anyhow::bail!("delivery failed: {error}");
        }
        Ok(record)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {
        adrift_channels::{AdapterPhase, ChannelAdapter, Error},
        adrift_common::{PlatformId, UserRef},
        adrift_store::{MemoryStore, types::DeliveryStatus},
    };

    use super::*;

    struct StubAdapter {
        platform: PlatformId,
        fail: bool,
    }

    #[async_trait]
    impl ChannelAdapter for StubAdapter {
        fn platform(&self) -> PlatformId {
            self.platform
        }

        fn phase(&self) -> AdapterPhase {
            AdapterPhase::Watching
        }

        async fn connect(&self) -> Result<()> {
            Ok(())
        }

        async fn poll_once(&self) -> Result<u32> {
            Ok(0)
        }

        async fn send(&self, recipient_id: &str, _text: &str) -> Result<String> {
            if self.fail {
                return Err(Error::transient("provider outage"));
            }
            Ok(format!("sent-to-{recipient_id}"))
        }

        async fn watch(&self) -> Result<()> {
            Ok(())
        }

        async fn cleanup(&self) {}
    }

    fn message() -> NewMessage {
        NewMessage {
            source: UserRef::new(PlatformId::Nostr, "bob"),
            source_user: "alice".into(),
            target_platform: PlatformId::Bluesky,
            content: "someone replied".into(),
        }
    }

    fn dispatcher(adapter: Option<StubAdapter>, store: Arc<MemoryStore>) -> RelayDispatcher {
        let mut registry = AdapterRegistry::new();
        if let Some(a) = adapter {
            registry.register(Arc::new(a));
        }
        RelayDispatcher::new(Arc::new(RwLock::new(registry)), store)
    }

    #[tokio::test]
    async fn successful_dispatch_records_sent() {
        let store = Arc::new(MemoryStore::new());
        let d = dispatcher(
            Some(StubAdapter {
                platform: PlatformId::Bluesky,
                fail: false,
            }),
            Arc::clone(&store),
        );

        let record = d.dispatch(message()).await.unwrap();
        assert_eq!(record.status, DeliveryStatus::Sent);
        assert_eq!(record.target_id.as_deref(), Some("sent-to-alice"));

        let audit = store.messages(10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn failed_send_returns_failed_record() {
        let store = Arc::new(MemoryStore::new());
        let d = dispatcher(
            Some(StubAdapter {
                platform: PlatformId::Bluesky,
                fail: true,
            }),
            Arc::clone(&store),
        );

        let record = d.dispatch(message()).await.unwrap();
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("provider outage"));
        assert!(record.target_id.is_none());
    }

    #[tokio::test]
    async fn missing_adapter_is_an_error_with_audit_trail() {
        let store = Arc::new(MemoryStore::new());
        let d = dispatcher(None, Arc::clone(&store));

        let outcome = d.dispatch(message()).await;
        assert!(matches!(
            outcome,
            Err(Error::NoAdapter {
                platform: PlatformId::Bluesky
            })
        ));

        let audit = store.messages(10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].status, DeliveryStatus::Failed);
    }
}
