//! Remote database access
//!
//! Each check opens its own short-lived connection through a
//! [`ConnectionFactory`], runs a fixed set of read queries through the
//! [`JobStatusFetcher`], and closes the connection again. Connections are
//! never shared between checks or sessions.
//!
//! Factories never retry; retry policy belongs to the caller.

pub mod fetcher;
mod mysql;

use async_trait::async_trait;
use jobwatch_core::domain::credential::Credential;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time;

pub use fetcher::JobStatusFetcher;
pub use mysql::MySqlConnectionFactory;

/// One result row, every column rendered as text
pub type Row = Vec<Option<String>>;

/// Errors raised while talking to a remote database
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Host unreachable, credentials rejected, or unknown database
    #[error("{0}")]
    Connection(String),

    /// Query rejected or returned an unexpected shape
    #[error("{0}")]
    Query(String),
}

/// An open connection to a remote database
#[async_trait]
pub trait RemoteConnection: Send {
    /// Round-trips to the server to prove the connection is usable
    async fn ping(&mut self) -> Result<(), RemoteError>;

    /// Executes a read query and returns every row
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, RemoteError>;

    /// Closes the connection
    async fn close(self: Box<Self>);
}

/// Opens connections from credentials
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn open(&self, credential: &Credential)
    -> Result<Box<dyn RemoteConnection>, RemoteError>;
}

/// A connection factory with a bound on how long opening may take
#[derive(Clone)]
pub struct Connector {
    factory: Arc<dyn ConnectionFactory>,
    timeout: Duration,
}

impl Connector {
    pub fn new(factory: Arc<dyn ConnectionFactory>, timeout: Duration) -> Self {
        Self { factory, timeout }
    }

    /// Opens a connection; the caller must hand it back to [`Connector::release`]
    pub async fn open(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteConnection>, RemoteError> {
        match time::timeout(self.timeout, self.factory.open(credential)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Connection(format!(
                "connecting to {} timed out after {:?}",
                credential.target(),
                self.timeout
            ))),
        }
    }

    /// Closes a connection, giving up after the connect timeout
    pub async fn release(&self, connection: Box<dyn RemoteConnection>) {
        if time::timeout(self.timeout, connection.close()).await.is_err() {
            tracing::debug!("Closing connection timed out after {:?}", self.timeout);
        }
    }

    /// Opens, pings and closes a connection for `credential`
    pub async fn probe(&self, credential: &Credential) -> Result<(), RemoteError> {
        let mut connection = self.open(credential).await?;

        let result = match time::timeout(self.timeout, connection.ping()).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Connection(format!(
                "ping timed out after {:?}",
                self.timeout
            ))),
        };

        self.release(connection).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFactory, FakeResource};

    fn credential(host: &str) -> Credential {
        Credential::new(host, "3306", "u", "p", "sales")
    }

    #[tokio::test]
    async fn test_probe_opens_and_closes() {
        let factory = FakeFactory::new().with_resource("db1", FakeResource::reachable("db1-host"));
        let connector = Connector::new(Arc::new(factory.clone()), Duration::from_secs(5));

        connector.probe(&credential("db1")).await.unwrap();

        assert_eq!(factory.opens("db1"), 1);
        assert_eq!(factory.closes("db1"), 1);
    }

    #[tokio::test]
    async fn test_probe_fails_for_unreachable_host() {
        let factory = FakeFactory::new().with_resource("db1", FakeResource::unreachable());
        let connector = Connector::new(Arc::new(factory.clone()), Duration::from_secs(5));

        let err = connector.probe(&credential("db1")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Connection(_)));
        assert_eq!(factory.closes("db1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_times_out_on_hung_host() {
        let factory = FakeFactory::new().with_resource("db1", FakeResource::hung());
        let connector = Connector::new(Arc::new(factory), Duration::from_secs(5));

        let err = connector.open(&credential("db1")).await.err().unwrap();
        assert!(matches!(err, RemoteError::Connection(msg) if msg.contains("timed out")));
    }
}
