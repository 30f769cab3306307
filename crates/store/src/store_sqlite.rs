//! SQLite-backed mailbox store using sqlx.

use {
    adrift_common::{PlatformId, UserRef, now_ms},
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions, sqlite::SqliteRow},
};

use crate::{Error, Result, store::MailboxStore, types::*};

/// SQLite persistence for the mailbox.
///
/// The bottle claim is a single conditional `UPDATE … RETURNING`, so the
/// at-most-one-finder transition is enforced by the database, not by
/// read-then-write sequencing in the caller.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store with its own connection pool and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        // A single connection: in-memory SQLite databases are
        // per-connection, and file databases serialize writers anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be
    /// run via [`crate::run_migrations`]).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn platform_col(row: &SqliteRow, col: &str) -> Result<PlatformId> {
    let value: String = row.get(col);
    value.parse().map_err(Error::corrupt)
}

fn bottle_from_row(row: &SqliteRow) -> Result<Bottle> {
    let status: String = row.get("status");
    Ok(Bottle {
        id: row.get("id"),
        content: row.get("content"),
        sender: UserRef {
            platform: platform_col(row, "sender_platform")?,
            user_id: row.get("sender_id"),
        },
        created_at_ms: row.get("created_at_ms"),
        status: BottleStatus::parse(&status)
            .ok_or_else(|| Error::corrupt(format!("bottle status: {status}")))?,
    })
}

fn reply_from_row(row: &SqliteRow) -> Result<BottleReply> {
    Ok(BottleReply {
        id: row.get("id"),
        bottle_id: row.get("bottle_id"),
        content: row.get("content"),
        author: UserRef {
            platform: platform_col(row, "sender_platform")?,
            user_id: row.get("sender_id"),
        },
        created_at_ms: row.get("created_at_ms"),
    })
}

fn message_from_row(row: &SqliteRow) -> Result<MessageRecord> {
    let status: String = row.get("status");
    Ok(MessageRecord {
        id: row.get("id"),
        source: UserRef {
            platform: platform_col(row, "source_platform")?,
            user_id: row.get("source_id"),
        },
        source_user: row.get("source_user"),
        target_platform: platform_col(row, "target_platform")?,
        target_id: row.get("target_id"),
        content: row.get("content"),
        created_at_ms: row.get("created_at_ms"),
        status: DeliveryStatus::parse(&status)
            .ok_or_else(|| Error::corrupt(format!("message status: {status}")))?,
        error: row.get("error"),
    })
}

const BOTTLE_COLS: &str = "id, content, sender_platform, sender_id, created_at_ms, status";
const MESSAGE_COLS: &str = "id, source_platform, source_id, source_user, target_platform, \
                            target_id, content, created_at_ms, status, error";

#[async_trait]
impl MailboxStore for SqliteStore {
    async fn create_bottle(&self, bottle: NewBottle) -> Result<Bottle> {
        let row = sqlx::query(&format!(
            "INSERT INTO bottles (content, sender_platform, sender_id, created_at_ms, status)
             VALUES (?, ?, ?, ?, 'active')
             RETURNING {BOTTLE_COLS}"
        ))
        .bind(&bottle.content)
        .bind(bottle.sender.platform.as_str())
        .bind(&bottle.sender.user_id)
        .bind(now_ms())
        .fetch_one(&self.pool)
        .await?;
        bottle_from_row(&row)
    }

    async fn bottle(&self, id: i64) -> Result<Option<Bottle>> {
        let row = sqlx::query(&format!("SELECT {BOTTLE_COLS} FROM bottles WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(bottle_from_row).transpose()
    }

    async fn claim_random_bottle(&self, picker: &UserRef) -> Result<Option<Bottle>> {
        let row = sqlx::query(&format!(
            "UPDATE bottles SET status = 'archived'
             WHERE status = 'active'
               AND id = (SELECT id FROM bottles
                          WHERE status = 'active'
                            AND NOT (sender_platform = ? AND sender_id = ?)
                          ORDER BY RANDOM() LIMIT 1)
             RETURNING {BOTTLE_COLS}"
        ))
        .bind(picker.platform.as_str())
        .bind(&picker.user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(bottle_from_row).transpose()
    }

    async fn user_bottles(&self, user: &UserRef, limit: u32) -> Result<Vec<BottleListing>> {
        let rows = sqlx::query(
            "SELECT b.id, b.content, b.sender_platform, b.sender_id, b.created_at_ms, b.status,
                    COUNT(r.id) AS reply_count,
                    MAX(r.created_at_ms) AS last_reply_ms
             FROM bottles b
             LEFT JOIN bottle_replies r ON r.bottle_id = b.id
             WHERE b.sender_platform = ? AND b.sender_id = ?
             GROUP BY b.id
             ORDER BY COALESCE(MAX(r.created_at_ms), 0) DESC, b.created_at_ms DESC
             LIMIT ?",
        )
        .bind(user.platform.as_str())
        .bind(&user.user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut listings = Vec::with_capacity(rows.len());
        for row in &rows {
            listings.push(BottleListing {
                bottle: bottle_from_row(row)?,
                reply_count: row.get("reply_count"),
                last_reply_ms: row.get("last_reply_ms"),
            });
        }
        Ok(listings)
    }

    async fn create_reply(&self, reply: NewReply) -> Result<BottleReply> {
        if self.bottle(reply.bottle_id).await?.is_none() {
            return Err(Error::not_found("bottle", reply.bottle_id));
        }
        let row = sqlx::query(
            "INSERT INTO bottle_replies (bottle_id, content, sender_platform, sender_id, created_at_ms)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, bottle_id, content, sender_platform, sender_id, created_at_ms",
        )
        .bind(reply.bottle_id)
        .bind(&reply.content)
        .bind(reply.author.platform.as_str())
        .bind(&reply.author.user_id)
        .bind(now_ms())
        .fetch_one(&self.pool)
        .await?;
        reply_from_row(&row)
    }

    async fn replies(&self, bottle_id: i64) -> Result<Vec<BottleReply>> {
        let rows = sqlx::query(
            "SELECT id, bottle_id, content, sender_platform, sender_id, created_at_ms
             FROM bottle_replies WHERE bottle_id = ? ORDER BY created_at_ms, id",
        )
        .bind(bottle_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(reply_from_row).collect()
    }

    async fn increment_stat(&self, user: &UserRef, field: StatField) -> Result<()> {
        let (sent, received, replies) = match field {
            StatField::BottlesSent => (1, 0, 0),
            StatField::BottlesReceived => (0, 1, 0),
            StatField::RepliesSent => (0, 0, 1),
        };
        sqlx::query(
            "INSERT INTO user_stats
                 (platform, user_id, bottles_sent, bottles_received, replies_sent, last_activity_ms)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (platform, user_id) DO UPDATE SET
                 bottles_sent     = bottles_sent + excluded.bottles_sent,
                 bottles_received = bottles_received + excluded.bottles_received,
                 replies_sent     = replies_sent + excluded.replies_sent,
                 last_activity_ms = excluded.last_activity_ms",
        )
        .bind(user.platform.as_str())
        .bind(&user.user_id)
        .bind(sent)
        .bind(received)
        .bind(replies)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_stats(&self, user: &UserRef) -> Result<Option<UserStats>> {
        let row = sqlx::query(
            "SELECT platform, user_id, bottles_sent, bottles_received, replies_sent,
                    last_activity_ms
             FROM user_stats WHERE platform = ? AND user_id = ?",
        )
        .bind(user.platform.as_str())
        .bind(&user.user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(UserStats {
                user: UserRef {
                    platform: platform_col(&row, "platform")?,
                    user_id: row.get("user_id"),
                },
                bottles_sent: row.get("bottles_sent"),
                bottles_received: row.get("bottles_received"),
                replies_sent: row.get("replies_sent"),
                last_activity_ms: row.get("last_activity_ms"),
            })
        })
        .transpose()
    }

    async fn watermark(&self, platform: PlatformId) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT last_processed_ms FROM watermarks WHERE platform = ?")
            .bind(platform.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("last_processed_ms")))
    }

    async fn set_watermark(&self, platform: PlatformId, last_processed_ms: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO watermarks (platform, last_processed_ms) VALUES (?, ?)
             ON CONFLICT (platform) DO UPDATE SET last_processed_ms = excluded.last_processed_ms",
        )
        .bind(platform.as_str())
        .bind(last_processed_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_message(&self, message: NewMessage) -> Result<MessageRecord> {
        let row = sqlx::query(&format!(
            "INSERT INTO messages
                 (source_platform, source_id, source_user, target_platform, content,
                  created_at_ms, status)
             VALUES (?, ?, ?, ?, ?, ?, 'pending')
             RETURNING {MESSAGE_COLS}"
        ))
        .bind(message.source.platform.as_str())
        .bind(&message.source.user_id)
        .bind(&message.source_user)
        .bind(message.target_platform.as_str())
        .bind(&message.content)
        .bind(now_ms())
        .fetch_one(&self.pool)
        .await?;
        message_from_row(&row)
    }

    async fn mark_message_sent(&self, id: i64, target_id: &str) -> Result<MessageRecord> {
        let row = sqlx::query(&format!(
            "UPDATE messages SET status = 'sent', target_id = ? WHERE id = ?
             RETURNING {MESSAGE_COLS}"
        ))
        .bind(target_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::not_found("message", id))?;
        message_from_row(&row)
    }

    async fn mark_message_failed(&self, id: i64, error: &str) -> Result<MessageRecord> {
        let row = sqlx::query(&format!(
            "UPDATE messages SET status = 'failed', error = ? WHERE id = ?
             RETURNING {MESSAGE_COLS}"
        ))
        .bind(error)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::not_found("message", id))?;
        message_from_row(&row)
    }

    async fn messages(&self, limit: u32) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLS} FROM messages ORDER BY created_at_ms DESC, id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(message_from_row).collect()
    }

    async fn log_command(&self, user: &UserRef, raw_text: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO command_log (platform, user_id, raw_text, created_at_ms)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user.platform.as_str())
        .bind(&user.user_id)
        .bind(raw_text)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn command_log(&self, limit: u32) -> Result<Vec<CommandLogEntry>> {
        let rows = sqlx::query(
            "SELECT id, platform, user_id, raw_text, created_at_ms
             FROM command_log ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(CommandLogEntry {
                id: row.get("id"),
                user: UserRef {
                    platform: platform_col(row, "platform")?,
                    user_id: row.get("user_id"),
                },
                raw_text: row.get("raw_text"),
                created_at_ms: row.get("created_at_ms"),
            });
        }
        Ok(entries)
    }

    async fn response_template(&self, platform: PlatformId, kind: &str) -> Result<Option<String>> {
        let row =
            sqlx::query("SELECT message FROM response_templates WHERE platform = ? AND kind = ?")
                .bind(platform.as_str())
                .bind(kind)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.get("message")))
    }

    async fn set_response_template(
        &self,
        platform: PlatformId,
        kind: &str,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO response_templates (platform, kind, message, updated_at_ms)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (platform, kind) DO UPDATE SET
                 message = excluded.message, updated_at_ms = excluded.updated_at_ms",
        )
        .bind(platform.as_str())
        .bind(kind)
        .bind(message)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn bottle_counts(&self) -> Result<BottleCounts> {
        let row = sqlx::query(
            "SELECT
                 (SELECT COUNT(*) FROM bottles WHERE status = 'active')   AS active,
                 (SELECT COUNT(*) FROM bottles WHERE status = 'archived') AS archived,
                 (SELECT COUNT(*) FROM bottle_replies)                    AS total_replies",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(BottleCounts {
            active: row.get("active"),
            archived: row.get("archived"),
            total_replies: row.get("total_replies"),
        })
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn make_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    fn user(platform: PlatformId, id: &str) -> UserRef {
        UserRef::new(platform, id)
    }

    async fn cast(store: &SqliteStore, sender: &UserRef, content: &str) -> Bottle {
        store
            .create_bottle(NewBottle {
                content: content.into(),
                sender: sender.clone(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn bottle_roundtrip() {
        let store = make_store().await;
        let alice = user(PlatformId::Bluesky, "alice");
        let b = cast(&store, &alice, "hello").await;
        assert_eq!(b.status, BottleStatus::Active);
        assert_eq!(store.bottle(b.id).await.unwrap().unwrap(), b);
        assert!(store.bottle(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_is_conditional_on_active() {
        let store = make_store().await;
        let alice = user(PlatformId::Bluesky, "alice");
        cast(&store, &alice, "only one").await;

        let bob = user(PlatformId::Nostr, "bob");
        assert!(store.claim_random_bottle(&bob).await.unwrap().is_some());
        assert!(store.claim_random_bottle(&bob).await.unwrap().is_none());

        let stored = store.bottle(1).await.unwrap().unwrap();
        assert_eq!(stored.status, BottleStatus::Archived);
    }

    #[tokio::test]
    async fn claim_never_returns_own_bottle() {
        let store = make_store().await;
        let alice = user(PlatformId::Bluesky, "alice");
        cast(&store, &alice, "mine").await;
        assert!(store.claim_random_bottle(&alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replies_ordered_and_counted() {
        let store = make_store().await;
        let alice = user(PlatformId::Bluesky, "alice");
        let bob = user(PlatformId::Nostr, "bob");
        let b = cast(&store, &alice, "hi").await;

        for text in ["first", "second"] {
            store
                .create_reply(NewReply {
                    bottle_id: b.id,
                    content: text.into(),
                    author: bob.clone(),
                })
                .await
                .unwrap();
        }

        let replies = store.replies(b.id).await.unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].content, "first");

        let listings = store.user_bottles(&alice, 10).await.unwrap();
        assert_eq!(listings[0].reply_count, 2);
    }

    #[tokio::test]
    async fn reply_requires_existing_bottle() {
        let store = make_store().await;
        let bob = user(PlatformId::Nostr, "bob");
        let result = store
            .create_reply(NewReply {
                bottle_id: 7,
                content: "hi".into(),
                author: bob,
            })
            .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn stat_upsert_accumulates() {
        let store = make_store().await;
        let alice = user(PlatformId::Bluesky, "alice");
        store.increment_stat(&alice, StatField::BottlesSent).await.unwrap();
        store.increment_stat(&alice, StatField::BottlesReceived).await.unwrap();
        store.increment_stat(&alice, StatField::BottlesSent).await.unwrap();

        let stats = store.user_stats(&alice).await.unwrap().unwrap();
        assert_eq!(stats.bottles_sent, 2);
        assert_eq!(stats.bottles_received, 1);
        assert_eq!(stats.replies_sent, 0);
    }

    #[tokio::test]
    async fn watermark_upsert() {
        let store = make_store().await;
        store.set_watermark(PlatformId::Nostr, 500).await.unwrap();
        store.set_watermark(PlatformId::Nostr, 900).await.unwrap();
        assert_eq!(store.watermark(PlatformId::Nostr).await.unwrap(), Some(900));
        assert!(store.watermark(PlatformId::Bluesky).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn message_lifecycle() {
        let store = make_store().await;
        let alice = user(PlatformId::Bluesky, "alice");
        let msg = store
            .create_message(NewMessage {
                source: alice,
                source_user: "npub1bob".into(),
                target_platform: PlatformId::Nostr,
                content: "ahoy".into(),
            })
            .await
            .unwrap();
        assert_eq!(msg.status, DeliveryStatus::Pending);
        assert!(msg.target_id.is_none());

        let sent = store.mark_message_sent(msg.id, "evt42").await.unwrap();
        assert_eq!(sent.status, DeliveryStatus::Sent);
        assert_eq!(sent.target_id.as_deref(), Some("evt42"));

        let listed = store.messages(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn mark_missing_message_errors() {
        let store = make_store().await;
        assert!(store.mark_message_sent(99, "x").await.is_err());
        assert!(store.mark_message_failed(99, "x").await.is_err());
    }

    #[tokio::test]
    async fn template_upsert_and_lookup() {
        let store = make_store().await;
        store
            .set_response_template(PlatformId::Bluesky, "help", "v1")
            .await
            .unwrap();
        store
            .set_response_template(PlatformId::Bluesky, "help", "v2")
            .await
            .unwrap();
        assert_eq!(
            store.response_template(PlatformId::Bluesky, "help").await.unwrap(),
            Some("v2".into())
        );
        assert!(store
            .response_template(PlatformId::Bluesky, "stats")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn command_log_and_counts() {
        let store = make_store().await;
        let alice = user(PlatformId::Bluesky, "alice");
        let bob = user(PlatformId::Nostr, "bob");
        store.log_command(&alice, "/new ahoy").await.unwrap();
        cast(&store, &alice, "ahoy").await;
        cast(&store, &alice, "two").await;
        store.claim_random_bottle(&bob).await.unwrap();

        let log = store.command_log(5).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].user, alice);

        let counts = store.bottle_counts().await.unwrap();
        assert_eq!(counts.active, 1);
        assert_eq!(counts.archived, 1);
        assert_eq!(counts.total_replies, 0);
    }
}
