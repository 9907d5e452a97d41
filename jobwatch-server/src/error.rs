//! Error types for the session and job services

use jobwatch_core::domain::credential::CredentialError;
use thiserror::Error;

use crate::remote::RemoteError;
use crate::repository::StoreError;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors surfaced by session creation and job listing
#[derive(Debug, Error)]
pub enum WatchError {
    /// Credential is missing fields or has an unusable port
    #[error("invalid credential: {0}")]
    Validation(#[from] CredentialError),

    /// Connectivity probe failed while creating a session
    #[error("unable to connect to database: {0}")]
    Connectivity(String),

    /// Connection to a session's database could not be opened
    #[error("failed to connect to database: {0}")]
    Connection(String),

    /// Unknown or expired session
    #[error("session {0} not found")]
    NotFound(String),

    /// Remote query failed
    #[error("query failed: {0}")]
    Query(String),

    /// Stored credential could not be encoded or decoded
    #[error("session data is unreadable: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session store unreachable
    #[error("session store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl From<RemoteError> for WatchError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Connection(msg) => WatchError::Connection(msg),
            RemoteError::Query(msg) => WatchError::Query(msg),
        }
    }
}
