use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Configuration for the Nostr identity and relay.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NostrConfig {
    /// Hex-encoded secp256k1 private key.
    #[serde(serialize_with = "serialize_secret")]
    pub private_key: Secret<String>,

    /// The bot's own public key, used to drop its own events from the
    /// inbound feed.
    pub public_key: String,

    /// Relay websocket URL.
    pub relay_url: String,

    /// Seconds between poll cycles. Relays are cheap to poll, so the
    /// default is tighter than Bluesky's.
    pub poll_interval_secs: u64,

    /// Inbound events older than this unix-ms floor are skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_before_ms: Option<i64>,
}

impl NostrConfig {
    /// Whether enough key material is present to build the adapter.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.private_key.expose_secret().is_empty() && !self.public_key.is_empty()
    }
}

impl std::fmt::Debug for NostrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NostrConfig")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field("relay_url", &self.relay_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for NostrConfig {
    fn default() -> Self {
        Self {
            private_key: Secret::new(String::new()),
            public_key: String::new(),
            relay_url: "wss://relay.damus.io".into(),
            poll_interval_secs: 10,
            ignore_before_ms: None,
        }
    }
}
