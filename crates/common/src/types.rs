use serde::{Deserialize, Serialize};

/// The two hard-wired platforms. The adapter boundary is uniform, but there
/// is no generalized plugin system behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    Bluesky,
    Nostr,
}

impl PlatformId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bluesky => "bluesky",
            Self::Nostr => "nostr",
        }
    }

    /// The counterpart platform, used when routing cross-platform
    /// notifications in tests and tooling.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Bluesky => Self::Nostr,
            Self::Nostr => Self::Bluesky,
        }
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlatformId {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bluesky" => Ok(Self::Bluesky),
            "nostr" => Ok(Self::Nostr),
            other => Err(UnknownPlatform {
                name: other.to_string(),
            }),
        }
    }
}

/// Parse error for [`PlatformId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlatform {
    pub name: String,
}

impl std::fmt::Display for UnknownPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown platform: {}", self.name)
    }
}

impl std::error::Error for UnknownPlatform {}

/// A user pinned to the platform they were seen on. Bottle permissions
/// compare identities as (platform, user id) pairs, never user id alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub platform: PlatformId,
    pub user_id: String,
}

impl UserRef {
    pub fn new(platform: PlatformId, user_id: impl Into<String>) -> Self {
        Self {
            platform,
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.user_id)
    }
}
