//! Service configuration
//!
//! Defines the listen address, session store location, session lifetime,
//! scheduler cadence and the timeouts applied to every external call.

use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address (e.g., "0.0.0.0:8080")
    pub bind_addr: String,

    /// PostgreSQL URL for the session store; `None` keeps sessions in process
    pub session_store_url: Option<String>,

    /// Absolute lifetime of a session
    pub session_ttl: Duration,

    /// Pause between successful discovery passes
    pub discovery_interval: Duration,

    /// Pause after a failed discovery pass
    pub discovery_backoff: Duration,

    /// Upper bound on opening a remote connection
    pub connect_timeout: Duration,

    /// Upper bound on a single remote query
    pub query_timeout: Duration,

    /// Upper bound on a single session store call
    pub store_timeout: Duration,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognised environment variables (all optional):
    /// - BIND_ADDR (default: 0.0.0.0:8080)
    /// - SESSION_STORE_URL (default: in-process store)
    /// - SESSION_TTL (seconds, default: 1800)
    /// - DISCOVERY_INTERVAL (seconds, default: 5)
    /// - DISCOVERY_BACKOFF (seconds, default: 10)
    /// - CONNECT_TIMEOUT (seconds, default: 5)
    /// - QUERY_TIMEOUT (seconds, default: 10)
    /// - STORE_TIMEOUT (seconds, default: 5)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let seconds = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", key)),
                None => Ok(default),
            }
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_store_url: lookup("SESSION_STORE_URL").filter(|url| !url.trim().is_empty()),
            session_ttl: seconds("SESSION_TTL", defaults.session_ttl)?,
            discovery_interval: seconds("DISCOVERY_INTERVAL", defaults.discovery_interval)?,
            discovery_backoff: seconds("DISCOVERY_BACKOFF", defaults.discovery_backoff)?,
            connect_timeout: seconds("CONNECT_TIMEOUT", defaults.connect_timeout)?,
            query_timeout: seconds("QUERY_TIMEOUT", defaults.query_timeout)?,
            store_timeout: seconds("STORE_TIMEOUT", defaults.store_timeout)?,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if let Some(url) = &self.session_store_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!("session_store_url must be a postgres:// URL");
            }
        }

        let positive = [
            ("session_ttl", self.session_ttl),
            ("discovery_interval", self.discovery_interval),
            ("discovery_backoff", self.discovery_backoff),
            ("connect_timeout", self.connect_timeout),
            ("query_timeout", self.query_timeout),
            ("store_timeout", self.store_timeout),
        ];
        for (name, value) in positive {
            if value.is_zero() {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            session_store_url: None,
            session_ttl: Duration::from_secs(30 * 60),
            discovery_interval: Duration::from_secs(5),
            discovery_backoff: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert_eq!(config.discovery_backoff, Duration::from_secs(10));
        assert!(config.session_store_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("SESSION_STORE_URL", "postgres://jobwatch@localhost/jobwatch"),
            ("SESSION_TTL", "60"),
            ("QUERY_TIMEOUT", "3"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(
            config.session_store_url.as_deref(),
            Some("postgres://jobwatch@localhost/jobwatch")
        );
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.query_timeout, Duration::from_secs(3));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_rejects_non_numeric_seconds() {
        assert!(Config::from_lookup(lookup(&[("SESSION_TTL", "half an hour")])).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.session_store_url = Some("redis://localhost:6379".to_string());
        assert!(config.validate().is_err());

        config.session_store_url = None;
        config.discovery_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.discovery_interval = Duration::from_secs(1);
        assert!(config.validate().is_ok());
    }
}
