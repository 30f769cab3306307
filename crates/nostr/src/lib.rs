//! Nostr channel adapter: encrypted-DM polling over a relay connection.
//! Every inbound DM is a command; the only filter is the bot's own events.

pub mod adapter;
pub mod config;

pub use {adapter::NostrAdapter, config::NostrConfig};
