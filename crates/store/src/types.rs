use {
    adrift_common::{PlatformId, UserRef},
    serde::{Deserialize, Serialize},
};

/// Lifecycle of a bottle. A bottle is archived the instant a finder claims
/// it, so it is delivered to at most one picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleStatus {
    Active,
    Archived,
}

impl BottleStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// An anonymous message awaiting pickup by one other user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bottle {
    pub id: i64,
    pub content: String,
    pub sender: UserRef,
    pub created_at_ms: i64,
    pub status: BottleStatus,
}

/// Insert form of [`Bottle`].
#[derive(Debug, Clone)]
pub struct NewBottle {
    pub content: String,
    pub sender: UserRef,
}

/// A reply attached to a bottle. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BottleReply {
    pub id: i64,
    pub bottle_id: i64,
    pub content: String,
    pub author: UserRef,
    pub created_at_ms: i64,
}

/// Insert form of [`BottleReply`].
#[derive(Debug, Clone)]
pub struct NewReply {
    pub bottle_id: i64,
    pub content: String,
    pub author: UserRef,
}

/// Per-user counters, one row per (platform, user id). Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub user: UserRef,
    pub bottles_sent: i64,
    pub bottles_received: i64,
    pub replies_sent: i64,
    pub last_activity_ms: i64,
}

/// Which counter an operation bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    BottlesSent,
    BottlesReceived,
    RepliesSent,
}

/// A caller-owned bottle with its reply summary, for the `list` command.
#[derive(Debug, Clone)]
pub struct BottleListing {
    pub bottle: Bottle,
    pub reply_count: i64,
    pub last_reply_ms: Option<i64>,
}

/// Terminal bookkeeping for one relay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One relay delivery, tracked for audit only, never for control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub id: i64,
    /// Who triggered the relay.
    pub source: UserRef,
    /// Delivery recipient user id on `target_platform`. The field name is
    /// kept from the audit schema.
    pub source_user: String,
    pub target_platform: PlatformId,
    /// Provider-assigned message id, set once the delivery succeeds.
    pub target_id: Option<String>,
    pub content: String,
    pub created_at_ms: i64,
    pub status: DeliveryStatus,
    pub error: Option<String>,
}

/// Insert form of [`MessageRecord`]; the dispatcher persists it as
/// [`DeliveryStatus::Pending`] before attempting the send.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub source: UserRef,
    pub source_user: String,
    pub target_platform: PlatformId,
    pub content: String,
}

/// Aggregate counters for the periodic broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BottleCounts {
    pub active: i64,
    pub archived: i64,
    pub total_replies: i64,
}

impl BottleCounts {
    #[must_use]
    pub fn total_bottles(&self) -> i64 {
        self.active + self.archived
    }
}

/// One audited inbound command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLogEntry {
    pub id: i64,
    pub user: UserRef,
    pub raw_text: String,
    pub created_at_ms: i64,
}
