//! Repository layer
//!
//! Session store backends. A backend is a key-value store with per-entry
//! expiry: it maps a session identifier to a serialized credential and
//! enforces expiry when entries are read. It knows nothing about
//! credentials or connectivity; that lives in the session service.
//!
//! All backends are trait-based so the service can be tested in memory.

mod memory;
mod session;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use jobwatch_core::domain::session::SessionId;
use std::time::Duration;
use thiserror::Error;

pub use memory::MemorySessionStore;
pub use session::PgSessionStore;

/// Errors raised by a session store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A raw, unexpired store entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub id: SessionId,
    /// Serialized credential
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Key-value store with per-entry expiry
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `payload` under `id` for exactly `ttl`
    async fn put(&self, id: &SessionId, payload: String, ttl: Duration) -> Result<(), StoreError>;

    /// Returns the entry if it exists and has not expired
    async fn get(&self, id: &SessionId) -> Result<Option<SessionEntry>, StoreError>;

    /// Point-in-time snapshot of every unexpired entry, in no particular order
    async fn list_active(&self) -> Result<Vec<SessionEntry>, StoreError>;
}

/// Absolute expiry for an entry created at `created_at`
pub(crate) fn expiry_after(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| created_at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
