//! End-to-end conversation flow across both platforms: release a bottle on
//! Bluesky, pick it up and reply on Nostr, and alternate replies with
//! cross-platform notifications, all against scripted wire clients.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use {
    adrift_channels::{InboundItem, PlatformClient, Result},
    adrift_common::PlatformId,
    adrift_relay::{BotConfig, RelayContext},
    adrift_store::{MailboxStore, MemoryStore, types::DeliveryStatus},
    async_trait::async_trait,
    secrecy::Secret,
};

/// Wire client whose inbox is appended to by the test. Watermark filtering
/// is the adapter's job, so every poll returns the full inbox.
struct ScriptedClient {
    inbox: Mutex<Vec<InboundItem>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inbox: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn push(&self, ts: i64, sender: &str, text: &str) {
        self.inbox.lock().unwrap().push(InboundItem {
            sender_id: sender.into(),
            text: text.into(),
            timestamp_ms: ts,
            provider_msg_id: format!("m{ts}"),
        });
    }

    fn sends(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn last_send(&self) -> (String, String) {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl PlatformClient for ScriptedClient {
    async fn login(&self) -> Result<()> {
        Ok(())
    }

    async fn list_inbound_since(&self, _since_ms: Option<i64>) -> Result<Vec<InboundItem>> {
        Ok(self.inbox.lock().unwrap().clone())
    }

    async fn send_direct(&self, recipient_id: &str, text: &str) -> Result<String> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((recipient_id.to_string(), text.to_string()));
        Ok(format!("out{}", sent.len()))
    }
}

fn config() -> BotConfig {
    let mut config = BotConfig::default();
    config.auto_start = false;
    config.bluesky.identifier = "bottle-bot.example.com".into();
    config.bluesky.password = Secret::new("app-pass".into());
    config.nostr.private_key = Secret::new("deadbeef".into());
    config.nostr.public_key = "botpubkey".into();
    config
}

#[tokio::test]
async fn bottle_conversation_crosses_platforms() {
    let store = Arc::new(MemoryStore::new());
    let bsky = ScriptedClient::new();
    let nostr = ScriptedClient::new();

    let ctx = RelayContext::builder(config(), Arc::clone(&store) as Arc<dyn MailboxStore>)
        .bluesky_client(Arc::clone(&bsky) as Arc<dyn PlatformClient>)
        .nostr_client(Arc::clone(&nostr) as Arc<dyn PlatformClient>)
        .build();

    let bsky_adapter = ctx.adapter(PlatformId::Bluesky).unwrap();
    let nostr_adapter = ctx.adapter(PlatformId::Nostr).unwrap();

    // Alice releases a bottle from Bluesky.
    bsky.push(1000, "alice", "/new Hello from the bay");
    assert_eq!(bsky_adapter.poll_once().await.unwrap(), 1);
    let (to, text) = bsky.last_send();
    assert_eq!(to, "alice");
    assert!(text.contains("adrift"));

    // Alice cannot reply before anyone picks it up.
    bsky.push(2000, "alice", "/reply 1 anyone out there?");
    assert_eq!(bsky_adapter.poll_once().await.unwrap(), 1);
    assert!(bsky.last_send().1.contains("wait for the other side"));

    // Bob picks it up on Nostr; no slash needed there.
    nostr.push(3000, "bob", "check");
    assert_eq!(nostr_adapter.poll_once().await.unwrap(), 1);
    let (to, text) = nostr.last_send();
    assert_eq!(to, "bob");
    assert!(text.contains("Hello from the bay"));
    assert!(text.contains("from bluesky"));

    // Bob replies; Alice is notified over on Bluesky.
    nostr.push(4000, "bob", "reply 1 Got it!");
    assert_eq!(nostr_adapter.poll_once().await.unwrap(), 1);
    assert!(nostr.last_send().1.contains("#1"));
    let (to, text) = bsky.last_send();
    assert_eq!(to, "alice");
    assert!(text.contains("Got it!"));
    assert!(text.contains("found your bottle"));

    // Bob must now wait for Alice.
    nostr.push(5000, "bob", "reply 1 me again");
    nostr_adapter.poll_once().await.unwrap();
    assert!(nostr.last_send().1.contains("wait for the other side"));

    // A third party never gets into the conversation.
    nostr.push(6000, "carol", "reply 1 let me join");
    nostr_adapter.poll_once().await.unwrap();
    assert!(nostr.last_send().1.contains("wait for the other side"));

    // Alice writes back; Bob is notified on Nostr.
    bsky.push(7000, "alice", "/reply 1 Glad it reached you");
    assert_eq!(bsky_adapter.poll_once().await.unwrap(), 1);
    let (to, text) = nostr.last_send();
    assert_eq!(to, "bob");
    assert!(text.contains("wrote back"));
    assert!(text.contains("Glad it reached you"));

    // Both notifications were recorded as sent deliveries.
    let deliveries = store.messages(10).await.unwrap();
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.iter().all(|d| d.status == DeliveryStatus::Sent));

    // Re-polling the full inboxes processes nothing new.
    let bsky_sends = bsky.sends().len();
    let nostr_sends = nostr.sends().len();
    assert_eq!(bsky_adapter.poll_once().await.unwrap(), 0);
    assert_eq!(nostr_adapter.poll_once().await.unwrap(), 0);
    assert_eq!(bsky.sends().len(), bsky_sends);
    assert_eq!(nostr.sends().len(), nostr_sends);
}

#[tokio::test]
async fn unknown_commands_answer_without_mutating_state() {
    let store = Arc::new(MemoryStore::new());
    let bsky = ScriptedClient::new();

    let ctx = RelayContext::builder(config(), Arc::clone(&store) as Arc<dyn MailboxStore>)
        .bluesky_client(Arc::clone(&bsky) as Arc<dyn PlatformClient>)
        .build();
    let adapter = ctx.adapter(PlatformId::Bluesky).unwrap();

    bsky.push(1000, "carol", "/frobnicate now");
    assert_eq!(adapter.poll_once().await.unwrap(), 1);
    assert!(bsky.last_send().1.contains("Unknown command"));

    let counts = store.bottle_counts().await.unwrap();
    assert_eq!(counts.total_bottles(), 0);
    // The attempt is still audited.
    assert_eq!(store.command_log(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn non_command_bluesky_chatter_is_ignored_but_consumed() {
    let store = Arc::new(MemoryStore::new());
    let bsky = ScriptedClient::new();

    let ctx = RelayContext::builder(config(), Arc::clone(&store) as Arc<dyn MailboxStore>)
        .bluesky_client(Arc::clone(&bsky) as Arc<dyn PlatformClient>)
        .build();
    let adapter = ctx.adapter(PlatformId::Bluesky).unwrap();

    bsky.push(1000, "alice", "hey bot how are you");
    assert_eq!(adapter.poll_once().await.unwrap(), 0);
    assert!(bsky.sends().is_empty());
    assert_eq!(
        store.watermark(PlatformId::Bluesky).await.unwrap(),
        Some(1000)
    );
}

#[tokio::test]
async fn stats_accumulate_across_the_conversation() {
    let store = Arc::new(MemoryStore::new());
    let bsky = ScriptedClient::new();
    let nostr = ScriptedClient::new();

    let ctx = RelayContext::builder(config(), Arc::clone(&store) as Arc<dyn MailboxStore>)
        .bluesky_client(Arc::clone(&bsky) as Arc<dyn PlatformClient>)
        .nostr_client(Arc::clone(&nostr) as Arc<dyn PlatformClient>)
        .build();
    let bsky_adapter = ctx.adapter(PlatformId::Bluesky).unwrap();
    let nostr_adapter = ctx.adapter(PlatformId::Nostr).unwrap();

    bsky.push(1000, "alice", "/new drifting thought");
    bsky_adapter.poll_once().await.unwrap();
    nostr.push(2000, "bob", "check");
    nostr.push(3000, "bob", "reply 1 caught it");
    nostr_adapter.poll_once().await.unwrap();

    nostr.push(4000, "bob", "stats");
    nostr_adapter.poll_once().await.unwrap();
    let text = nostr.last_send().1;
    assert!(text.contains("Bottles received: 1"));
    assert!(text.contains("Replies sent: 1"));

    bsky.push(5000, "alice", "/stats");
    bsky_adapter.poll_once().await.unwrap();
    assert!(bsky.last_send().1.contains("Bottles sent: 1"));
}
