//! Durable state for bottles, replies, per-user counters, per-platform
//! watermarks, relay records, and response templates.
//!
//! No business logic lives here; the store only promises atomicity where the
//! interpreter needs it (the bottle claim and the stat increments).

pub mod error;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use {
    error::{Error, Result},
    store::MailboxStore,
    store_memory::MemoryStore,
    store_sqlite::SqliteStore,
};

/// Run database migrations for the mailbox store.
///
/// Creates every table the store uses. Call at application startup when
/// using [`store_sqlite::SqliteStore::with_pool`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
