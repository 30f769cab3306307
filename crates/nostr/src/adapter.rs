//! The Nostr poll adapter. Unlike Bluesky there is no slash convention:
//! anyone DMing the bot is talking to the bot, so every inbound event is
//! forwarded to the command sink.

use std::{
    sync::{
        Arc, Mutex as StdMutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    adrift_channels::{
        AdapterPhase, Backoff, ChannelAdapter, CommandSink, Error, InboundItem, PlatformClient,
        Result,
    },
    adrift_common::PlatformId,
    adrift_store::MailboxStore,
    async_trait::async_trait,
    tokio::sync::Mutex,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::config::NostrConfig;

/// Wait before the single in-cycle send retry.
const SEND_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Watermark-driven Nostr adapter over an injected relay client.
pub struct NostrAdapter {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn PlatformClient>,
    sink: Arc<dyn CommandSink>,
    store: Arc<dyn MailboxStore>,
    config: NostrConfig,
    phase: StdMutex<AdapterPhase>,
    connected: AtomicBool,
    // Overlapping poll cycles are dropped, not queued.
    cycle: Mutex<()>,
    watch_cancel: StdMutex<Option<CancellationToken>>,
}

impl NostrAdapter {
    #[must_use]
    pub fn new(
        client: Arc<dyn PlatformClient>,
        sink: Arc<dyn CommandSink>,
        store: Arc<dyn MailboxStore>,
        config: NostrConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                sink,
                store,
                config,
                phase: StdMutex::new(AdapterPhase::Disconnected),
                connected: AtomicBool::new(false),
                cycle: Mutex::new(()),
                watch_cancel: StdMutex::new(None),
            }),
        }
    }
}

impl Inner {
    fn set_phase(&self, phase: AdapterPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn current_phase(&self) -> AdapterPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect to the relay once; the connection is reused until cleanup or
    /// a failed cycle forces a reconnect.
    async fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.set_phase(AdapterPhase::Connecting);
        debug!(relay = %self.config.relay_url, "connecting to relay");
        if let Err(e) = self.client.login().await {
            self.set_phase(AdapterPhase::Disconnected);
            return Err(e);
        }
        self.connected.store(true, Ordering::SeqCst);
        self.set_phase(AdapterPhase::Connected);
        info!(relay = %self.config.relay_url, "relay connection ready");
        Ok(())
    }

    async fn run_cycle(&self) -> Result<u32> {
        let Ok(_guard) = self.cycle.try_lock() else {
            debug!("poll cycle already in flight; skipping");
            return Ok(0);
        };

        self.ensure_connected().await?;

        let watermark = self.store.watermark(PlatformId::Nostr).await?;
        let mut items = match self.client.list_inbound_since(watermark).await {
            Ok(items) => items,
            Err(e) => {
                // Stream errors invalidate the relay connection.
                self.connected.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        items.sort_by_key(|i| i.timestamp_ms);

        let mut advanced = watermark;
        let mut processed = 0u32;
        let mut held: Option<Error> = None;

        for item in items {
            if watermark.is_some_and(|w| item.timestamp_ms <= w) {
                continue;
            }
            if self
                .config
                .ignore_before_ms
                .is_some_and(|floor| item.timestamp_ms < floor)
            {
                advanced = Some(item.timestamp_ms);
                continue;
            }
            // The subscription echoes the bot's own outbound events.
            if item.sender_id == self.config.public_key {
                advanced = Some(item.timestamp_ms);
                continue;
            }

            match self.process(&item).await {
                Ok(()) => {
                    advanced = Some(item.timestamp_ms);
                    processed += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        provider_msg_id = %item.provider_msg_id,
                        error = %e,
                        "relay delivery failing; holding watermark"
                    );
                    held = Some(e);
                    break;
                }
                Err(e) => {
                    warn!(
                        provider_msg_id = %item.provider_msg_id,
                        error = %e,
                        "dropping undeliverable response"
                    );
                    advanced = Some(item.timestamp_ms);
                    processed += 1;
                }
            }
        }

        if advanced != watermark {
            if let Some(ts) = advanced {
                self.store.set_watermark(PlatformId::Nostr, ts).await?;
            }
        }

        match held {
            Some(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(e)
            }
            None => Ok(processed),
        }
    }

    async fn send_with_retry(&self, recipient_id: &str, text: &str) -> Result<String> {
        match self.client.send_direct(recipient_id, text).await {
            Err(e) if e.is_transient() => {
                debug!(recipient_id, error = %e, "send failed; retrying once");
                tokio::time::sleep(SEND_RETRY_DELAY).await;
                self.client.send_direct(recipient_id, text).await
            }
            other => other,
        }
    }

    async fn process(&self, item: &InboundItem) -> Result<()> {
        debug!(sender_id = %item.sender_id, ts = item.timestamp_ms, "handling inbound DM");
        let reply = self
            .sink
            .handle(PlatformId::Nostr, &item.sender_id, &item.text)
            .await;
        self.send_with_retry(&item.sender_id, &reply.text).await?;
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for NostrAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Nostr
    }

    fn phase(&self) -> AdapterPhase {
        self.inner.current_phase()
    }

    async fn connect(&self) -> Result<()> {
        self.inner.ensure_connected().await
    }

    async fn poll_once(&self) -> Result<u32> {
        self.inner.run_cycle().await
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<String> {
        self.inner.ensure_connected().await?;
        self.inner.send_with_retry(recipient_id, text).await
    }

    async fn watch(&self) -> Result<()> {
        let cancel = CancellationToken::new();
        {
            let mut guard = self
                .inner
                .watch_cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if guard.as_ref().is_some_and(|t| !t.is_cancelled()) {
                debug!("nostr watch loop already running");
                return Ok(());
            }
            *guard = Some(cancel.clone());
        }

        if let Err(e) = self.inner.ensure_connected().await {
            let mut guard = self
                .inner
                .watch_cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *guard = None;
            return Err(e);
        }

        self.inner.set_phase(AdapterPhase::Watching);
        info!(
            interval_secs = self.inner.config.poll_interval_secs,
            "nostr watch loop started"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let interval = Duration::from_secs(inner.config.poll_interval_secs);
            let mut backoff = Backoff::default();
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        inner.set_phase(AdapterPhase::Stopped);
                        debug!("nostr watch loop stopped");
                        break;
                    }
                    () = tokio::time::sleep(interval) => {}
                }
                match inner.run_cycle().await {
                    Ok(n) => {
                        if n > 0 {
                            debug!(processed = n, "nostr poll cycle complete");
                        }
                        backoff.reset();
                        inner.set_phase(AdapterPhase::Watching);
                    }
                    Err(e) => {
                        match backoff.next_delay() {
                            Some(delay) => {
                                warn!(
                                    error = %e,
                                    retry_in_ms = delay.as_millis() as u64,
                                    attempt = backoff.attempts(),
                                    "nostr poll cycle failed"
                                );
                                inner.set_phase(AdapterPhase::Reconnecting);
                                tokio::select! {
                                    () = cancel.cancelled() => {
                                        inner.set_phase(AdapterPhase::Stopped);
                                        break;
                                    }
                                    () = tokio::time::sleep(delay) => {}
                                }
                            }
                            None => {
                                error!(error = %e, "nostr retry budget exhausted; giving up");
                                inner.set_phase(AdapterPhase::Failed);
                                break;
                            }
                        }
                    }
                }
            }
        });
        Ok(())
    }

    async fn cleanup(&self) {
        let token = self
            .inner
            .watch_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
        self.inner.connected.store(false, Ordering::SeqCst);
        if self.inner.current_phase() != AdapterPhase::Failed {
            self.inner.set_phase(AdapterPhase::Stopped);
        }
    }
}
