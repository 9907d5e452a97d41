//! Session DTOs

use serde::{Deserialize, Serialize};

use crate::domain::session::SessionId;

/// Response to a successful connect request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub message: String,
    pub session_id: SessionId,
}

impl ConnectResponse {
    pub fn connected(session_id: SessionId) -> Self {
        Self {
            message: "Connected successfully".to_string(),
            session_id,
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}
