//! Platform channel seams.
//!
//! Each platform (Bluesky, Nostr) implements [`ChannelAdapter`] over an
//! opaque [`PlatformClient`] that owns the wire protocol. The adapter owns
//! session lifetime, watermark-driven polling, and delivery retries; the
//! registry maps platform identifiers to running adapters for the relay
//! dispatcher.

pub mod adapter;
pub mod backoff;
pub mod broadcast;
pub mod client;
pub mod error;
pub mod registry;
pub mod sink;

pub use {
    adapter::{AdapterPhase, ChannelAdapter},
    backoff::Backoff,
    broadcast::Broadcaster,
    client::{InboundItem, PlatformClient},
    error::{Error, Result},
    registry::AdapterRegistry,
    sink::{CommandSink, SinkReply},
};
