//! PostgreSQL session store
//!
//! Sessions live in the `sessions` table. Reads only return rows whose
//! `expires_at` is still in the future; expired rows are purged on write.

use async_trait::async_trait;
use chrono::Utc;
use jobwatch_core::domain::session::SessionId;
use sqlx::PgPool;
use std::time::Duration;

use super::{SessionEntry, SessionStore, StoreError, expiry_after};

/// Session store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, id: &SessionId, payload: String, ttl: Duration) -> Result<(), StoreError> {
        let created_at = Utc::now();
        let expires_at = expiry_after(created_at, ttl);

        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            tracing::debug!("Purged {} expired session(s)", purged);
        }

        sqlx::query(
            r#"
            INSERT INTO sessions (id, credential, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id.as_str())
        .bind(payload)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionEntry>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, credential, created_at, expires_at
            FROM sessions
            WHERE id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_active(&self) -> Result<Vec<SessionEntry>, StoreError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, credential, created_at, expires_at
            FROM sessions
            WHERE expires_at > NOW()
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    credential: String,
    created_at: chrono::DateTime<chrono::Utc>,
    expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<SessionRow> for SessionEntry {
    fn from(row: SessionRow) -> Self {
        SessionEntry {
            id: SessionId::from(row.id),
            payload: row.credential,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}
