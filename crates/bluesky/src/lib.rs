//! Bluesky channel adapter: session-cooldown login, slash-command DM
//! polling, and watermark-driven progress over the chat notification feed.

pub mod adapter;
pub mod config;

pub use {adapter::BlueskyAdapter, config::BlueskyConfig};
