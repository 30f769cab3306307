//! In-memory mailbox store for tests and ephemeral deployments.

use std::collections::HashMap;

use {
    adrift_common::{PlatformId, UserRef, now_ms},
    async_trait::async_trait,
    rand::Rng,
    tokio::sync::Mutex,
};

use crate::{Error, Result, store::MailboxStore, types::*};

#[derive(Default)]
struct Inner {
    bottles: Vec<Bottle>,
    replies: Vec<BottleReply>,
    stats: HashMap<UserRef, UserStats>,
    watermarks: HashMap<PlatformId, i64>,
    messages: Vec<MessageRecord>,
    templates: HashMap<(PlatformId, String), String>,
    command_log: Vec<CommandLogEntry>,
    next_bottle_id: i64,
    next_reply_id: i64,
    next_message_id: i64,
    next_log_id: i64,
}

/// Mailbox store backed by a single mutex-guarded map set.
///
/// The mutex doubles as the claim transaction: pick-and-archive happens in
/// one critical section, so concurrent `check` commands can never claim the
/// same bottle twice.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MailboxStore for MemoryStore {
    async fn create_bottle(&self, bottle: NewBottle) -> Result<Bottle> {
        let mut inner = self.inner.lock().await;
        inner.next_bottle_id += 1;
        let created = Bottle {
            id: inner.next_bottle_id,
            content: bottle.content,
            sender: bottle.sender,
            created_at_ms: now_ms(),
            status: BottleStatus::Active,
        };
        inner.bottles.push(created.clone());
        Ok(created)
    }

    async fn bottle(&self, id: i64) -> Result<Option<Bottle>> {
        let inner = self.inner.lock().await;
        Ok(inner.bottles.iter().find(|b| b.id == id).cloned())
    }

    async fn claim_random_bottle(&self, picker: &UserRef) -> Result<Option<Bottle>> {
        let mut inner = self.inner.lock().await;
        let candidates: Vec<usize> = inner
            .bottles
            .iter()
            .enumerate()
            .filter(|(_, b)| b.status == BottleStatus::Active && b.sender != *picker)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        let idx = candidates[rand::rng().random_range(0..candidates.len())];
        inner.bottles[idx].status = BottleStatus::Archived;
        Ok(Some(inner.bottles[idx].clone()))
    }

    async fn user_bottles(&self, user: &UserRef, limit: u32) -> Result<Vec<BottleListing>> {
        let inner = self.inner.lock().await;
        let mut listings: Vec<BottleListing> = inner
            .bottles
            .iter()
            .filter(|b| b.sender == *user)
            .map(|b| {
                let replies: Vec<&BottleReply> =
                    inner.replies.iter().filter(|r| r.bottle_id == b.id).collect();
                BottleListing {
                    bottle: b.clone(),
                    reply_count: replies.len() as i64,
                    last_reply_ms: replies.iter().map(|r| r.created_at_ms).max(),
                }
            })
            .collect();
        listings.sort_by(|a, b| {
            let a_key = (a.last_reply_ms.unwrap_or(0), a.bottle.created_at_ms);
            let b_key = (b.last_reply_ms.unwrap_or(0), b.bottle.created_at_ms);
            b_key.cmp(&a_key)
        });
        listings.truncate(limit as usize);
        Ok(listings)
    }

    async fn create_reply(&self, reply: NewReply) -> Result<BottleReply> {
        let mut inner = self.inner.lock().await;
        if !inner.bottles.iter().any(|b| b.id == reply.bottle_id) {
            return Err(Error::not_found("bottle", reply.bottle_id));
        }
        inner.next_reply_id += 1;
        let created = BottleReply {
            id: inner.next_reply_id,
            bottle_id: reply.bottle_id,
            content: reply.content,
            author: reply.author,
            created_at_ms: now_ms(),
        };
        inner.replies.push(created.clone());
        Ok(created)
    }

    async fn replies(&self, bottle_id: i64) -> Result<Vec<BottleReply>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .replies
            .iter()
            .filter(|r| r.bottle_id == bottle_id)
            .cloned()
            .collect())
    }

    async fn increment_stat(&self, user: &UserRef, field: StatField) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let stats = inner
            .stats
            .entry(user.clone())
            .or_insert_with(|| UserStats {
                user: user.clone(),
                bottles_sent: 0,
                bottles_received: 0,
                replies_sent: 0,
                last_activity_ms: 0,
            });
        match field {
            StatField::BottlesSent => stats.bottles_sent += 1,
            StatField::BottlesReceived => stats.bottles_received += 1,
            StatField::RepliesSent => stats.replies_sent += 1,
        }
        stats.last_activity_ms = now_ms();
        Ok(())
    }

    async fn user_stats(&self, user: &UserRef) -> Result<Option<UserStats>> {
        let inner = self.inner.lock().await;
        Ok(inner.stats.get(user).cloned())
    }

    async fn watermark(&self, platform: PlatformId) -> Result<Option<i64>> {
        let inner = self.inner.lock().await;
        Ok(inner.watermarks.get(&platform).copied())
    }

    async fn set_watermark(&self, platform: PlatformId, last_processed_ms: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.watermarks.insert(platform, last_processed_ms);
        Ok(())
    }

    async fn create_message(&self, message: NewMessage) -> Result<MessageRecord> {
        let mut inner = self.inner.lock().await;
        inner.next_message_id += 1;
        let created = MessageRecord {
            id: inner.next_message_id,
            source: message.source,
            source_user: message.source_user,
            target_platform: message.target_platform,
            target_id: None,
            content: message.content,
            created_at_ms: now_ms(),
            status: DeliveryStatus::Pending,
            error: None,
        };
        inner.messages.push(created.clone());
        Ok(created)
    }

    async fn mark_message_sent(&self, id: i64, target_id: &str) -> Result<MessageRecord> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(Error::not_found("message", id))?;
        record.status = DeliveryStatus::Sent;
        record.target_id = Some(target_id.to_string());
        Ok(record.clone())
    }

    async fn mark_message_failed(&self, id: i64, error: &str) -> Result<MessageRecord> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(Error::not_found("message", id))?;
        record.status = DeliveryStatus::Failed;
        record.error = Some(error.to_string());
        Ok(record.clone())
    }

    async fn messages(&self, limit: u32) -> Result<Vec<MessageRecord>> {
        let inner = self.inner.lock().await;
        let mut out: Vec<MessageRecord> = inner.messages.clone();
        out.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms).then(b.id.cmp(&a.id)));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn log_command(&self, user: &UserRef, raw_text: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.next_log_id += 1;
        let entry = CommandLogEntry {
            id: inner.next_log_id,
            user: user.clone(),
            raw_text: raw_text.to_string(),
            created_at_ms: now_ms(),
        };
        inner.command_log.push(entry);
        Ok(())
    }

    async fn command_log(&self, limit: u32) -> Result<Vec<CommandLogEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .command_log
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn response_template(&self, platform: PlatformId, kind: &str) -> Result<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.templates.get(&(platform, kind.to_string())).cloned())
    }

    async fn set_response_template(
        &self,
        platform: PlatformId,
        kind: &str,
        message: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .templates
            .insert((platform, kind.to_string()), message.to_string());
        Ok(())
    }

    async fn bottle_counts(&self) -> Result<BottleCounts> {
        let inner = self.inner.lock().await;
        Ok(BottleCounts {
            active: inner
                .bottles
                .iter()
                .filter(|b| b.status == BottleStatus::Active)
                .count() as i64,
            archived: inner
                .bottles
                .iter()
                .filter(|b| b.status == BottleStatus::Archived)
                .count() as i64,
            total_replies: inner.replies.len() as i64,
        })
    }
}
