//! Credential domain type
//!
//! Connection parameters for one remote database plus the poll interval the
//! client asked for. A credential is immutable once stored in a session.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

/// Poll interval used when a credential carries no usable interval
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Connection parameters for a remote database
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub hostname: String,

    /// Accepted as a JSON string or integer, stored as text
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub database: String,

    /// Requested poll interval in seconds, kept exactly as supplied
    ///
    /// Anything that is not an integral number is treated as missing.
    /// Use [`Credential::effective_interval`] to get the interval the
    /// scheduler actually uses.
    #[serde(default, deserialize_with = "deserialize_interval")]
    pub interval: Option<i64>,
}

/// Reasons a credential cannot be used to open a session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("all fields are required (missing {0})")]
    MissingField(&'static str),

    #[error("invalid port: {0}")]
    InvalidPort(String),
}

impl Credential {
    pub fn new(
        hostname: impl Into<String>,
        port: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: port.into(),
            username: username.into(),
            password: password.into(),
            database: database.into(),
            interval: None,
        }
    }

    pub fn with_interval(mut self, seconds: i64) -> Self {
        self.interval = Some(seconds);
        self
    }

    /// Checks that every identity field is present and the port is usable
    pub fn validate(&self) -> Result<(), CredentialError> {
        let fields = [
            ("hostname", &self.hostname),
            ("port", &self.port),
            ("username", &self.username),
            ("password", &self.password),
            ("database", &self.database),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(CredentialError::MissingField(name));
            }
        }

        self.port_number()?;
        Ok(())
    }

    /// Parses the port as a TCP port number
    pub fn port_number(&self) -> Result<u16, CredentialError> {
        match self.port.trim().parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(CredentialError::InvalidPort(self.port.clone())),
        }
    }

    /// The polling period for this credential
    ///
    /// This is the only place a requested interval is coerced: a missing,
    /// zero or negative value becomes the default.
    pub fn effective_interval(&self) -> Duration {
        match self.interval {
            Some(seconds) if seconds > 0 => Duration::from_secs(seconds as u64),
            _ => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// Connection target for logs, without the password
    pub fn target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.hostname, self.port, self.database
        )
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("interval", &self.interval)
            .finish()
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(text)) => text,
        Some(JsonValue::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(requested_seconds))
}

fn requested_seconds(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
