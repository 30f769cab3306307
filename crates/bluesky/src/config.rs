use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Configuration for the Bluesky account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueskyConfig {
    /// Handle or DID used to create the session.
    pub identifier: String,

    /// App password.
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,

    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,

    /// Minimum seconds between session logins. Within the window the
    /// existing session is reused as-is.
    pub session_cooldown_secs: u64,

    /// Inbound messages older than this unix-ms floor are skipped without
    /// processing. Used to ignore backlog from before the bot existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_before_ms: Option<i64>,

    /// Publish the periodic status post.
    pub broadcast: bool,

    /// Seconds between status posts.
    pub broadcast_interval_secs: u64,

    /// Override for the status post template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_template: Option<String>,
}

impl BlueskyConfig {
    /// Whether enough credentials are present to build the adapter.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.identifier.is_empty() && !self.password.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for BlueskyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueskyConfig")
            .field("identifier", &self.identifier)
            .field("password", &"[REDACTED]")
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("session_cooldown_secs", &self.session_cooldown_secs)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            password: Secret::new(String::new()),
            poll_interval_secs: 30,
            session_cooldown_secs: 300,
            ignore_before_ms: None,
            broadcast: false,
            broadcast_interval_secs: 3600,
            broadcast_template: None,
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = BlueskyConfig::default();
        assert_eq!(cfg.poll_interval_secs, 30);
        assert_eq!(cfg.session_cooldown_secs, 300);
        assert!(!cfg.is_complete());
    }

    #[test]
    fn completeness_needs_both_credentials() {
        let cfg: BlueskyConfig =
            serde_json::from_str(r#"{"identifier": "bot.example.com"}"#).unwrap();
        assert!(!cfg.is_complete());

        let cfg: BlueskyConfig = serde_json::from_str(
            r#"{"identifier": "bot.example.com", "password": "app-pass"}"#,
        )
        .unwrap();
        assert!(cfg.is_complete());
    }

    #[test]
    fn debug_redacts_password() {
        let cfg: BlueskyConfig = serde_json::from_str(
            r#"{"identifier": "bot.example.com", "password": "hunter2"}"#,
        )
        .unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }
}
