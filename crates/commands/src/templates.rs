//! Response kinds and their built-in English templates. Per-platform
//! overrides come from the store; anything unset falls back to these.

/// Every templated response the interpreter can produce. `as_str` keys the
/// per-platform override table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Help,
    BottleSent,
    BottleReceived,
    ReplySent,
    /// Sent to the bottle sender when the finder replies.
    ReplyNotification,
    /// Sent to the finder when the sender replies back.
    SenderReplyNotification,
    List,
    Stats,
    NoBottles,
    NoStats,
    EmptyList,
    EmptyContent,
    ContentTooLong,
    MissingReplyArgs,
    InvalidBottleId,
    BottleNotFound,
    PermissionDenied,
    InvalidCommand,
    Internal,
}

impl ResponseKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::BottleSent => "bottle_sent",
            Self::BottleReceived => "bottle_received",
            Self::ReplySent => "reply_sent",
            Self::ReplyNotification => "reply_notification",
            Self::SenderReplyNotification => "sender_reply_notification",
            Self::List => "list",
            Self::Stats => "stats",
            Self::NoBottles => "no_bottles",
            Self::NoStats => "no_stats",
            Self::EmptyList => "empty_list",
            Self::EmptyContent => "empty_content",
            Self::ContentTooLong => "content_too_long",
            Self::MissingReplyArgs => "missing_reply_args",
            Self::InvalidBottleId => "invalid_bottle_id",
            Self::BottleNotFound => "bottle_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidCommand => "invalid_command",
            Self::Internal => "error",
        }
    }

    /// Built-in template used when no per-platform override is stored.
    #[must_use]
    pub fn default_template(self) -> &'static str {
        match self {
            Self::Help => {
                "🍾 Message in a bottle\n\n\
                 new <text> — set a bottle adrift (max {max} chars)\n\
                 check — pick up a random bottle\n\
                 reply <id> <text> — reply to a bottle\n\
                 list — your bottles and their replies\n\
                 stats — your activity\n\
                 help — this message\n\n\
                 The leading slash (/) is optional."
            }
            Self::BottleSent => "Your bottle is adrift! 🌊",
            Self::BottleReceived => {
                "🍾 Bottle #{id}\n\n{content}\n\nfrom {platform}{replies}"
            }
            Self::ReplySent => "Reply sent to bottle #{id}. 📨",
            Self::ReplyNotification => {
                "🍾 Someone found your bottle #{id} and replied:\n\n{content}\n\n\
                 Reply with: reply {id} <text>"
            }
            Self::SenderReplyNotification => {
                "📨 The sender of bottle #{id} wrote back:\n\n{content}\n\n\
                 Reply with: reply {id} <text>"
            }
            Self::List => "📜 Your bottles\n\n{bottleList}",
            Self::Stats => {
                "📊 Your stats\nBottles sent: {sent}\nBottles received: {received}\n\
                 Replies sent: {replies}\nLast activity: {activity}"
            }
            Self::NoBottles => "No bottles are adrift right now. Try again later. 🌊",
            Self::NoStats => "No activity yet. Send a bottle with: new <text>",
            Self::EmptyList => "You have no bottles yet. Send one with: new <text>",
            Self::EmptyContent => "The bottle needs a message. Usage: new <text>",
            Self::ContentTooLong => "That message is too long (max {max} characters).",
            Self::MissingReplyArgs => "Usage: reply <id> <text>",
            Self::InvalidBottleId => "\"{id}\" is not a bottle id. Usage: reply <id> <text>",
            Self::BottleNotFound => "Bottle #{id} does not exist.",
            Self::PermissionDenied => {
                "You can't reply to bottle #{id} right now — wait for the other side."
            }
            Self::InvalidCommand => "Unknown command. Send \"help\" for the list.",
            Self::Internal => "Something went wrong. Please try again. 🫧",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct() {
        let all = [
            ResponseKind::Help,
            ResponseKind::BottleSent,
            ResponseKind::BottleReceived,
            ResponseKind::ReplySent,
            ResponseKind::ReplyNotification,
            ResponseKind::SenderReplyNotification,
            ResponseKind::List,
            ResponseKind::Stats,
            ResponseKind::NoBottles,
            ResponseKind::NoStats,
            ResponseKind::EmptyList,
            ResponseKind::EmptyContent,
            ResponseKind::ContentTooLong,
            ResponseKind::MissingReplyArgs,
            ResponseKind::InvalidBottleId,
            ResponseKind::BottleNotFound,
            ResponseKind::PermissionDenied,
            ResponseKind::InvalidCommand,
            ResponseKind::Internal,
        ];
        let mut keys: Vec<&str> = all.iter().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), all.len());
    }
}
