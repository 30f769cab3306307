use {adrift_common::PlatformId, std::error::Error as StdError};

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared by the adapter implementations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Retryable provider failure: rate limiting, network timeouts.
    #[error("transient channel failure: {context}")]
    Transient { context: String },

    /// Login or session refresh failed; not retryable within a cycle.
    #[error("channel authentication failed: {context}")]
    Auth { context: String },

    /// The adapter does not implement an optional capability.
    #[error("channel operation unsupported: {message}")]
    Unsupported { message: String },

    /// No adapter is configured and running for the requested platform.
    #[error("no adapter for platform: {platform}")]
    NoAdapter { platform: PlatformId },

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] adrift_store::Error),

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn transient(context: impl std::fmt::Display) -> Self {
        Self::Transient {
            context: context.to_string(),
        }
    }

    #[must_use]
    pub fn auth(context: impl std::fmt::Display) -> Self {
        Self::Auth {
            context: context.to_string(),
        }
    }

    #[must_use]
    pub fn unsupported(message: impl std::fmt::Display) -> Self {
        Self::Unsupported {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether a bounded wait-then-retry is worth attempting.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
