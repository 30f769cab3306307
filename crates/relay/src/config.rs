use std::path::Path;

use {
    adrift_bluesky::BlueskyConfig,
    adrift_nostr::NostrConfig,
    anyhow::Context,
    serde::{Deserialize, Serialize},
};

/// Top-level bot configuration, loaded from a TOML file. Every field has a
/// default so a partial file is fine; platforms without complete
/// credentials simply don't get an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Start the watch loops as soon as the context is built.
    pub auto_start: bool,

    /// SQLite connection URL for the mailbox store.
    pub database_url: String,

    /// Global inbound floor in unix ms, applied to any platform that does
    /// not set its own.
    pub ignore_before_ms: Option<i64>,

    pub bluesky: BlueskyConfig,

    pub nostr: NostrConfig,
}

impl BotConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(raw).context("parsing bot config")?;
        if let Some(floor) = config.ignore_before_ms {
            config.bluesky.ignore_before_ms.get_or_insert(floor);
            config.nostr.ignore_before_ms.get_or_insert(floor);
        }
        Ok(config)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            database_url: "sqlite:adrift.db?mode=rwc".into(),
            ignore_before_ms: None,
            bluesky: BlueskyConfig::default(),
            nostr: NostrConfig::default(),
        }
    }
}
