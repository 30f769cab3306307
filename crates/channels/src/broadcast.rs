//! Periodic status broadcast, decoupled from the inbound watch loop.

use std::{sync::Arc, time::Duration};

use {
    adrift_common::render_template,
    adrift_store::MailboxStore,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::{Result, adapter::ChannelAdapter};

/// Default broadcast template. Overridable per deployment; placeholders are
/// substituted with live counters at post time.
pub const DEFAULT_TEMPLATE: &str = "🌊 {activeBottles} bottles adrift, {archivedBottles} found, \
                                    {totalReplies} replies across {totalBottles} bottles.";

/// Publishes a status post on its own timer through an adapter's optional
/// `post` capability. Failures are logged and never affect the watch loop.
pub struct Broadcaster {
    adapter: Arc<dyn ChannelAdapter>,
    store: Arc<dyn MailboxStore>,
    template: String,
    interval: Duration,
}

impl Broadcaster {
    pub fn new(
        adapter: Arc<dyn ChannelAdapter>,
        store: Arc<dyn MailboxStore>,
        template: Option<String>,
        interval: Duration,
    ) -> Self {
        Self {
            adapter,
            store,
            template: template.unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            interval,
        }
    }

    /// Render the template with live counters and publish it once.
    pub async fn broadcast_once(&self) -> Result<String> {
        let counts = self.store.bottle_counts().await?;
        let text = render_template(
            &self.template,
            &[
                ("activeBottles", &counts.active.to_string()),
                ("archivedBottles", &counts.archived.to_string()),
                ("totalReplies", &counts.total_replies.to_string()),
                ("totalBottles", &counts.total_bottles().to_string()),
            ],
        );
        self.adapter.post(&text).await?;
        Ok(text)
    }

    /// Spawn the recurring broadcast task. The returned token stops it.
    pub fn spawn(self) -> CancellationToken {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let platform = self.adapter.platform();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!(%platform, "broadcast task stopped");
                        break;
                    }
                    () = tokio::time::sleep(self.interval) => {}
                }
                match self.broadcast_once().await {
                    Ok(text) => debug!(%platform, chars = text.len(), "published broadcast"),
                    Err(e) => warn!(%platform, error = %e, "broadcast failed"),
                }
            }
        });
        cancel
    }
}
