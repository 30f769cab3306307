//! The Bluesky poll adapter. Only slash-prefixed DMs are treated as
//! commands; everything else is acknowledged by watermark and ignored.

use std::{
    sync::{Arc, Mutex as StdMutex, PoisonError},
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
    tokio::{sync::Mutex, time::Instant},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::config::BlueskyConfig;

/// Wait before the single in-cycle send retry.
const SEND_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Watermark-driven Bluesky adapter over an injected wire client.
pub struct BlueskyAdapter {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn PlatformClient>,
    sink: Arc<dyn CommandSink>,
    store: Arc<dyn MailboxStore>,
    config: BlueskyConfig,
    phase: StdMutex<AdapterPhase>,
    last_login: Mutex<Option<Instant>>,
    /// Held for the duration of one poll cycle; `try_lock` makes an
    /// overlapping cycle a no-op instead of a queue.
    cycle: Mutex<()>,
    watch_cancel: StdMutex<Option<CancellationToken>>,
}

impl BlueskyAdapter {
    #[must_use]
    pub fn new(
        client: Arc<dyn PlatformClient>,
        sink: Arc<dyn CommandSink>,
        store: Arc<dyn MailboxStore>,
        config: BlueskyConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                sink,
                store,
                config,
                phase: StdMutex::new(AdapterPhase::Disconnected),
                last_login: Mutex::new(None),
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

    /// Log in unless a session was established within the cooldown window.
    async fn ensure_session(&self) -> Result<()> {
        let mut last = self.last_login.lock().await;
        let cooldown = Duration::from_secs(self.config.session_cooldown_secs);
        let stale = last.is_none_or(|at| at.elapsed() >= cooldown);
        if stale {
            self.set_phase(AdapterPhase::Connecting);
            debug!(identifier = %self.config.identifier, "creating bluesky session");
            if let Err(e) = self.client.login().await {
                self.set_phase(AdapterPhase::Disconnected);
                return Err(e);
            }
            *last = Some(Instant::now());
            self.set_phase(AdapterPhase::Connected);
            info!(identifier = %self.config.identifier, "bluesky session ready");
        }
        Ok(())
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

    /// One poll cycle. Items are processed oldest-first; the watermark
    /// advances over everything consumed or deliberately skipped, and is
    /// held back at a transient delivery failure so the item is retried on
    /// the next cycle.
    async fn run_cycle(&self) -> Result<u32> {
        let Ok(_guard) = self.cycle.try_lock() else {
            debug!("poll cycle already in flight; skipping");
            return Ok(0);
        };

        self.ensure_session().await?;

        let watermark = self.store.watermark(PlatformId::Bluesky).await?;
        let mut items = self.client.list_inbound_since(watermark).await?;
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
            // Only slash-prefixed DMs are commands on Bluesky.
            if !item.text.starts_with('/') {
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
                        "delivery still failing; holding watermark"
                    );
                    held = Some(e);
                    break;
                }
                Err(e) => {
                    // Command side effects are committed; only the response
                    // was lost. Move on rather than replay the command.
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
                self.store.set_watermark(PlatformId::Bluesky, ts).await?;
            }
        }

        match held {
            Some(e) => Err(e),
            None => Ok(processed),
        }
    }

    async fn process(&self, item: &InboundItem) -> Result<()> {
        debug!(sender_id = %item.sender_id, ts = item.timestamp_ms, "handling inbound command");
        let reply = self
            .sink
            .handle(PlatformId::Bluesky, &item.sender_id, &item.text)
            .await;
        self.send_with_retry(&item.sender_id, &reply.text).await?;
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for BlueskyAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Bluesky
    }

    fn phase(&self) -> AdapterPhase {
        self.inner.current_phase()
    }

    async fn connect(&self) -> Result<()> {
        self.inner.ensure_session().await
    }

    async fn poll_once(&self) -> Result<u32> {
        self.inner.run_cycle().await
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<String> {
        self.inner.ensure_session().await?;
        self.inner.send_with_retry(recipient_id, text).await
    }

    async fn post(&self, text: &str) -> Result<String> {
        self.inner.ensure_session().await?;
        self.inner.client.post(text).await
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
                debug!("bluesky watch loop already running");
                return Ok(());
            }
            *guard = Some(cancel.clone());
        }

        if let Err(e) = self.inner.ensure_session().await {
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
            "bluesky watch loop started"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let interval = Duration::from_secs(inner.config.poll_interval_secs);
            let mut backoff = Backoff::default();
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        inner.set_phase(AdapterPhase::Stopped);
                        debug!("bluesky watch loop stopped");
                        break;
                    }
                    () = tokio::time::sleep(interval) => {}
                }
                match inner.run_cycle().await {
                    Ok(n) => {
                        if n > 0 {
                            debug!(processed = n, "bluesky poll cycle complete");
                        }
                        backoff.reset();
                        inner.set_phase(AdapterPhase::Watching);
                    }
                    Err(e) => match backoff.next_delay() {
                        Some(delay) => {
                            warn!(
                                error = %e,
                                retry_in_ms = delay.as_millis() as u64,
                                attempt = backoff.attempts(),
                                "bluesky poll cycle failed"
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
                            error!(error = %e, "bluesky retry budget exhausted; giving up");
                            inner.set_phase(AdapterPhase::Failed);
                            break;
                        }
                    },
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
        if self.inner.current_phase() != AdapterPhase::Failed {
            self.inner.set_phase(AdapterPhase::Stopped);
        }
    }
}
