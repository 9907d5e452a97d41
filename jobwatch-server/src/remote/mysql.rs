//! MySQL connection factory

use async_trait::async_trait;
use jobwatch_core::domain::credential::Credential;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Row as _};

use super::{ConnectionFactory, RemoteConnection, RemoteError, Row};

/// Opens one MySQL connection per call
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnectionFactory;

#[async_trait]
impl ConnectionFactory for MySqlConnectionFactory {
    async fn open(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteConnection>, RemoteError> {
        let port = credential
            .port_number()
            .map_err(|e| RemoteError::Connection(e.to_string()))?;

        tracing::debug!("Connecting to {}", credential.target());

        let conn = MySqlConnectOptions::new()
            .host(&credential.hostname)
            .port(port)
            .username(&credential.username)
            .password(&credential.password)
            .database(&credential.database)
            .connect()
            .await
            .map_err(|e| RemoteError::Connection(e.to_string()))?;

        Ok(Box::new(MySqlRemote { conn }))
    }
}

struct MySqlRemote {
    conn: MySqlConnection,
}

#[async_trait]
impl RemoteConnection for MySqlRemote {
    async fn ping(&mut self) -> Result<(), RemoteError> {
        self.conn
            .ping()
            .await
            .map_err(|e| RemoteError::Connection(e.to_string()))
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, RemoteError> {
        let rows = sqlx::query(sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| RemoteError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| row.try_get::<Option<String>, _>(i))
                    .collect::<Result<Row, _>>()
            })
            .collect::<Result<Vec<Row>, _>>()
            .map_err(|e| RemoteError::Query(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        let MySqlRemote { conn } = *self;
        if let Err(e) = conn.close().await {
            tracing::debug!("Error closing MySQL connection: {}", e);
        }
    }
}
