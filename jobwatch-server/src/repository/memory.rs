//! In-process session store
//!
//! Used when no external store is configured, and by tests. Deadlines are
//! tracked on the tokio clock so expiry follows paused test time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobwatch_core::domain::session::SessionId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use super::{SessionEntry, SessionStore, StoreError, expiry_after};

struct StoredSession {
    payload: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    deadline: Instant,
}

impl StoredSession {
    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }

    fn to_entry(&self, id: &SessionId) -> SessionEntry {
        SessionEntry {
            id: id.clone(),
            payload: self.payload.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Session store backed by a map guarded by a read-write lock
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<SessionId, StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, id: &SessionId, payload: String, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let created_at = Utc::now();
        let stored = StoredSession {
            payload,
            created_at,
            expires_at: expiry_after(created_at, ttl),
            deadline: now + ttl,
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(id.clone(), stored);
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionEntry>, StoreError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(id) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.to_entry(id))),
                Some(_) => {}
            }
        }

        // Expired: drop it so the identifier can never resolve again.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(id).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(id);
        }
        Ok(None)
    }

    async fn list_active(&self) -> Result<Vec<SessionEntry>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(id, entry)| entry.to_entry(id))
            .collect())
    }
}
