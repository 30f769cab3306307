//! Cross-platform relay: delivery bookkeeping, adapter wiring, and the
//! embedding surface for running the whole bot.

pub mod config;
pub mod context;
pub mod dispatcher;

pub use {
    config::BotConfig,
    context::{PlatformStatus, RelayContext, RelayContextBuilder},
    dispatcher::RelayDispatcher,
};
