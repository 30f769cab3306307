//! Who may reply to a bottle: strict two-party alternation.
//!
//! The conversation is pinned to the original sender and the first
//! non-sender replier (the finder). Replies alternate: whoever wrote the
//! most recent reply must wait for the counterpart.

use {
    adrift_common::UserRef,
    adrift_store::types::{Bottle, BottleReply},
};

/// Evaluate whether `caller` may append a reply, given the existing replies
/// in creation order.
#[must_use]
pub fn may_reply(bottle: &Bottle, replies: &[BottleReply], caller: &UserRef) -> bool {
    let sender = &bottle.sender;
    let finder = replies.iter().find(|r| r.author != *sender);
    let last = replies.last();

    if caller == sender {
        // The sender needs a counterpart reply to answer, and it must be
        // the counterpart's turn to have spoken last.
        finder.is_some() && last.is_some_and(|l| l.author != *caller)
    } else {
        match finder {
            // No finder yet: any non-sender may claim the conversation.
            None => true,
            Some(f) => f.author == *caller && last.is_some_and(|l| l.author != *caller),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        adrift_common::PlatformId,
        adrift_store::types::BottleStatus,
        rstest::rstest,
    };

    use super::*;

    fn sender() -> UserRef {
        UserRef::new(PlatformId::Bluesky, "alice")
    }

    fn finder() -> UserRef {
        UserRef::new(PlatformId::Nostr, "bob")
    }

    fn third_party() -> UserRef {
        UserRef::new(PlatformId::Nostr, "carol")
    }

    fn bottle() -> Bottle {
        Bottle {
            id: 1,
            content: "hello".into(),
            sender: sender(),
            created_at_ms: 0,
            status: BottleStatus::Archived,
        }
    }

    fn reply(n: i64, author: &UserRef) -> BottleReply {
        BottleReply {
            id: n,
            bottle_id: 1,
            content: format!("reply {n}"),
            author: author.clone(),
            created_at_ms: n,
        }
    }

    /// Reply sequences as (existing authors, caller, expected).
    #[rstest]
    // Fresh bottle: any non-sender may open the conversation.
    #[case(vec![], finder(), true)]
    #[case(vec![], third_party(), true)]
    // Fresh bottle: the sender talks to no one.
    #[case(vec![], sender(), false)]
    // After the finder replies, the sender's turn.
    #[case(vec![finder()], sender(), true)]
    #[case(vec![finder()], finder(), false)]
    #[case(vec![finder()], third_party(), false)]
    // After the sender answers, back to the finder.
    #[case(vec![finder(), sender()], finder(), true)]
    #[case(vec![finder(), sender()], sender(), false)]
    #[case(vec![finder(), sender()], third_party(), false)]
    // Longer alternation holds.
    #[case(vec![finder(), sender(), finder()], sender(), true)]
    #[case(vec![finder(), sender(), finder()], finder(), false)]
    fn alternation(
        #[case] authors: Vec<UserRef>,
        #[case] caller: UserRef,
        #[case] expected: bool,
    ) {
        let replies: Vec<BottleReply> = authors
            .iter()
            .enumerate()
            .map(|(i, a)| reply(i as i64 + 1, a))
            .collect();
        assert_eq!(may_reply(&bottle(), &replies, &caller), expected);
    }

    #[test]
    fn identity_is_platform_scoped() {
        // Same user id on the other platform is a different party.
        let impostor = UserRef::new(PlatformId::Nostr, "alice");
        assert!(may_reply(&bottle(), &[], &impostor));
        let replies = [reply(1, &finder())];
        assert!(!may_reply(&bottle(), &replies, &impostor));
    }
}
