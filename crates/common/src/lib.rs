//! Shared types for the adrift workspace: platform identifiers, epoch
//! timestamps, and the response-template renderer.

pub mod template;
pub mod types;

pub use {
    template::render_template,
    types::{PlatformId, UserRef},
};

/// Maximum length of a bottle or reply body, in characters.
pub const MAX_CONTENT_CHARS: usize = 140;

/// Current unix time in milliseconds.
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Format an epoch-millisecond timestamp for user-facing text.
///
/// Falls back to the raw number if the value is out of chrono's range.
pub fn format_ms(ms: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => ms.to_string(),
    }
}
