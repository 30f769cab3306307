//! Wires store, interpreter, dispatcher, and platform adapters into one
//! runnable unit. Wire clients are injected, so the whole context runs
//! against scripted clients in tests.

use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use {
    adrift_bluesky::BlueskyAdapter,
    adrift_channels::{
        AdapterPhase, AdapterRegistry, Broadcaster, ChannelAdapter, CommandSink, PlatformClient,
    },
    adrift_commands::{CommandInterpreter, RelaySink},
    adrift_common::PlatformId,
    adrift_nostr::NostrAdapter,
    adrift_store::MailboxStore,
    serde::Serialize,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{config::BotConfig, dispatcher::RelayDispatcher};

/// Phase snapshot for one running platform.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformStatus {
    pub platform: PlatformId,
    pub phase: AdapterPhase,
}

/// Builder for [`RelayContext`]. Adapters are created only for platforms
/// with complete credentials *and* an injected wire client.
pub struct RelayContextBuilder {
    config: BotConfig,
    store: Arc<dyn MailboxStore>,
    bluesky_client: Option<Arc<dyn PlatformClient>>,
    nostr_client: Option<Arc<dyn PlatformClient>>,
}

impl RelayContextBuilder {
    #[must_use]
    pub fn new(config: BotConfig, store: Arc<dyn MailboxStore>) -> Self {
        Self {
            config,
            store,
            bluesky_client: None,
            nostr_client: None,
        }
    }

    #[must_use]
    pub fn bluesky_client(mut self, client: Arc<dyn PlatformClient>) -> Self {
        self.bluesky_client = Some(client);
        self
    }

    #[must_use]
    pub fn nostr_client(mut self, client: Arc<dyn PlatformClient>) -> Self {
        self.nostr_client = Some(client);
        self
    }

    #[must_use]
    pub fn build(self) -> RelayContext {
        let registry = Arc::new(RwLock::new(AdapterRegistry::new()));
        let dispatcher = Arc::new(RelayDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&self.store),
        ));
        let interpreter = Arc::new(
            CommandInterpreter::new(Arc::clone(&self.store))
                .with_notifier(Arc::clone(&dispatcher) as Arc<dyn RelaySink>),
        );
        let sink = Arc::clone(&interpreter) as Arc<dyn CommandSink>;

        {
            let mut reg = registry.write().unwrap_or_else(PoisonError::into_inner);

            match (&self.bluesky_client, self.config.bluesky.is_complete()) {
                (Some(client), true) => {
                    reg.register(Arc::new(BlueskyAdapter::new(
                        Arc::clone(client),
                        Arc::clone(&sink),
                        Arc::clone(&self.store),
                        self.config.bluesky.clone(),
                    )));
                }
                (Some(_), false) => {
                    warn!("bluesky credentials incomplete; platform disabled");
                }
                (None, _) => {}
            }

            match (&self.nostr_client, self.config.nostr.is_complete()) {
                (Some(client), true) => {
                    reg.register(Arc::new(NostrAdapter::new(
                        Arc::clone(client),
                        Arc::clone(&sink),
                        Arc::clone(&self.store),
                        self.config.nostr.clone(),
                    )));
                }
                (Some(_), false) => {
                    warn!("nostr credentials incomplete; platform disabled");
                }
                (None, _) => {}
            }
        }

        RelayContext {
            config: self.config,
            store: self.store,
            registry,
            dispatcher,
            interpreter,
            started: AtomicBool::new(false),
            broadcast_cancel: std::sync::Mutex::new(None),
        }
    }
}

/// The running bot: owns the adapter registry and the shared services.
pub struct RelayContext {
    config: BotConfig,
    store: Arc<dyn MailboxStore>,
    registry: Arc<RwLock<AdapterRegistry>>,
    dispatcher: Arc<RelayDispatcher>,
    interpreter: Arc<CommandInterpreter>,
    started: AtomicBool,
    broadcast_cancel: std::sync::Mutex<Option<CancellationToken>>,
}

impl RelayContext {
    #[must_use]
    pub fn builder(config: BotConfig, store: Arc<dyn MailboxStore>) -> RelayContextBuilder {
        RelayContextBuilder::new(config, store)
    }

    /// Start every registered adapter's watch loop, plus the broadcast task
    /// when configured. Idempotent; a platform that fails to start is
    /// logged and skipped so the other platform still runs.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(platforms = ?self.platforms(), "starting relay context");

        for adapter in self.adapters() {
            if let Err(e) = adapter.watch().await {
                warn!(platform = %adapter.platform(), error = %e, "platform failed to start");
            }
        }

        if self.config.bluesky.broadcast {
            if let Some(adapter) = self.adapter(PlatformId::Bluesky) {
                let broadcaster = Broadcaster::new(
                    adapter,
                    Arc::clone(&self.store),
                    self.config.bluesky.broadcast_template.clone(),
                    std::time::Duration::from_secs(self.config.bluesky.broadcast_interval_secs),
                );
                let token = broadcaster.spawn();
                *self
                    .broadcast_cancel
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(token);
            }
        }
    }

    /// Honor `auto_start` from the config.
    pub async fn start_if_configured(&self) {
        if self.config.auto_start {
            self.start().await;
        }
    }

    /// Stop the watch loops and the broadcast task. Idempotent.
    pub async fn stop(&self) {
        let token = self
            .broadcast_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
        for adapter in self.adapters() {
            adapter.cleanup().await;
        }
        self.started.store(false, Ordering::SeqCst);
        info!("relay context stopped");
    }

    /// Phase snapshot of every registered platform.
    #[must_use]
    pub fn status(&self) -> Vec<PlatformStatus> {
        let mut statuses: Vec<PlatformStatus> = self
            .adapters()
            .into_iter()
            .map(|a| PlatformStatus {
                platform: a.platform(),
                phase: a.phase(),
            })
            .collect();
        statuses.sort_by_key(|s| s.platform.as_str());
        statuses
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<PlatformId> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .platforms()
    }

    #[must_use]
    pub fn adapter(&self, platform: PlatformId) -> Option<Arc<dyn ChannelAdapter>> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(platform)
    }

    #[must_use]
    pub fn dispatcher(&self) -> Arc<RelayDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    #[must_use]
    pub fn interpreter(&self) -> Arc<CommandInterpreter> {
        Arc::clone(&self.interpreter)
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn MailboxStore> {
        Arc::clone(&self.store)
    }

    fn adapters(&self) -> Vec<Arc<dyn ChannelAdapter>> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, a)| Arc::clone(a))
            .collect()
    }
}
