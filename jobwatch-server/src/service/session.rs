//! Session Service
//!
//! Creates, resolves and enumerates sessions on top of a session store
//! backend. A credential only becomes a session after a successful
//! connectivity probe.

use jobwatch_core::domain::credential::Credential;
use jobwatch_core::domain::session::{Session, SessionId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::error::{Result, WatchError};
use crate::remote::Connector;
use crate::repository::{SessionEntry, SessionStore, StoreError};

/// Session registry with absolute expiry
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    connector: Connector,
    ttl: Duration,
    store_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn SessionStore>,
        connector: Connector,
        ttl: Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            connector,
            ttl,
            store_timeout,
        }
    }

    /// Creates a session for `credential`
    ///
    /// The credential is validated and probed before anything is stored, so
    /// a credential that cannot connect never yields an identifier.
    pub async fn create(&self, credential: Credential) -> Result<SessionId> {
        credential.validate()?;

        self.connector
            .probe(&credential)
            .await
            .map_err(|e| WatchError::Connectivity(e.to_string()))?;

        let payload = serde_json::to_string(&credential)?;
        let id = SessionId::generate();
        self.bounded(self.store.put(&id, payload, self.ttl)).await?;

        tracing::info!(
            "Session {} created for {} (expires in {:?})",
            id,
            credential.target(),
            self.ttl
        );

        Ok(id)
    }

    /// Resolves a live session to its credential
    pub async fn get(&self, id: &SessionId) -> Result<Credential> {
        let entry = self
            .bounded(self.store.get(id))
            .await?
            .ok_or_else(|| WatchError::NotFound(id.to_string()))?;

        Ok(decode(entry)?.credential)
    }

    /// Snapshot of every live session
    ///
    /// Entries whose payload cannot be decoded are logged and left out, so
    /// one corrupt entry does not hide the others.
    pub async fn list_active(&self) -> Result<Vec<Session>> {
        let entries = self.bounded(self.store.list_active()).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let id = entry.id.clone();
                match decode(entry) {
                    Ok(session) => Some(session),
                    Err(e) => {
                        tracing::warn!("Skipping unreadable session {}: {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, StoreError>>,
    ) -> std::result::Result<T, StoreError> {
        time::timeout(self.store_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.store_timeout)))
    }
}

fn decode(entry: SessionEntry) -> std::result::Result<Session, serde_json::Error> {
    Ok(Session {
        credential: serde_json::from_str(&entry.payload)?,
        id: entry.id,
        created_at: entry.created_at,
        expires_at: entry.expires_at,
    })
}
