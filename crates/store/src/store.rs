use {
    adrift_common::{PlatformId, UserRef},
    async_trait::async_trait,
};

use crate::{Result, types::*};

/// Persistence boundary for the mailbox. All mutations from concurrent
/// pollers go through here; implementations must serialize the bottle
/// claim transition so each bottle reaches exactly one finder.
#[async_trait]
pub trait MailboxStore: Send + Sync {
    // ── Bottles ─────────────────────────────────────────────────────────

    async fn create_bottle(&self, bottle: NewBottle) -> Result<Bottle>;

    async fn bottle(&self, id: i64) -> Result<Option<Bottle>>;

    /// Pick one random active bottle not authored by `picker` and archive
    /// it in the same conditional update. Returns `None` when nothing is
    /// adrift for this user.
    async fn claim_random_bottle(&self, picker: &UserRef) -> Result<Option<Bottle>>;

    /// The caller's own bottles, most-recently-replied-to first, creation
    /// order as fallback, capped at `limit`.
    async fn user_bottles(&self, user: &UserRef, limit: u32) -> Result<Vec<BottleListing>>;

    // ── Replies ─────────────────────────────────────────────────────────

    async fn create_reply(&self, reply: NewReply) -> Result<BottleReply>;

    /// Replies for one bottle in creation order.
    async fn replies(&self, bottle_id: i64) -> Result<Vec<BottleReply>>;

    // ── User stats ──────────────────────────────────────────────────────

    /// Atomically bump one counter and the last-activity timestamp,
    /// creating the row if needed.
    async fn increment_stat(&self, user: &UserRef, field: StatField) -> Result<()>;

    async fn user_stats(&self, user: &UserRef) -> Result<Option<UserStats>>;

    // ── Watermarks ──────────────────────────────────────────────────────

    async fn watermark(&self, platform: PlatformId) -> Result<Option<i64>>;

    async fn set_watermark(&self, platform: PlatformId, last_processed_ms: i64) -> Result<()>;

    // ── Relay records ───────────────────────────────────────────────────

    async fn create_message(&self, message: NewMessage) -> Result<MessageRecord>;

    async fn mark_message_sent(&self, id: i64, target_id: &str) -> Result<MessageRecord>;

    async fn mark_message_failed(&self, id: i64, error: &str) -> Result<MessageRecord>;

    /// Most recent relay records first.
    async fn messages(&self, limit: u32) -> Result<Vec<MessageRecord>>;

    // ── Audit log ───────────────────────────────────────────────────────

    async fn log_command(&self, user: &UserRef, raw_text: &str) -> Result<()>;

    /// Most recent audited commands first.
    async fn command_log(&self, limit: u32) -> Result<Vec<CommandLogEntry>>;

    // ── Response templates ──────────────────────────────────────────────

    /// Per-platform template override for a response kind, if configured.
    async fn response_template(&self, platform: PlatformId, kind: &str) -> Result<Option<String>>;

    async fn set_response_template(
        &self,
        platform: PlatformId,
        kind: &str,
        message: &str,
    ) -> Result<()>;

    // ── Aggregates ──────────────────────────────────────────────────────

    async fn bottle_counts(&self) -> Result<BottleCounts>;
}
