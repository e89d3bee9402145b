//! Session configuration.
//!
//! Every [`Session`](crate::Session) and [`Router`](crate::Router) owns its
//! own `SessionConfig`; there is no process-wide connection state.
//!
//! # Example
//!
//! ```
//! use routeros_client::SessionConfig;
//!
//! let config = SessionConfig::from_json_str(
//!     r#"{ "host": "10.0.0.1", "username": "api", "password": "secret" }"#,
//! )
//! .unwrap();
//! assert_eq!(config.port, 8728);
//! assert!(!format!("{config:?}").contains("secret"));
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RouterOsError};
use crate::protocol::{Termination, DEFAULT_MAX_WORD_LEN};
use crate::transport::{DEFAULT_API_PORT, DEFAULT_CONNECT_TIMEOUT};

/// Default login name.
pub const DEFAULT_USERNAME: &str = "admin";

/// Environment variable names read by [`SessionConfig::from_env`].
pub mod env {
    /// Device host name or address (required).
    pub const HOST: &str = "ROUTEROS_HOST";
    /// API port.
    pub const PORT: &str = "ROUTEROS_PORT";
    /// Login name.
    pub const USER: &str = "ROUTEROS_USER";
    /// Login password.
    pub const PASSWORD: &str = "ROUTEROS_PASSWORD";
    /// Connect timeout in milliseconds.
    pub const CONNECT_TIMEOUT_MS: &str = "ROUTEROS_CONNECT_TIMEOUT_MS";
}

/// Connection and protocol settings for one device.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Device host name or address.
    pub host: String,
    /// API port (default 8728).
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login password, sent in plain text.
    pub password: String,
    /// Time allowed for the TCP connect (JSON: `connect_timeout_ms`).
    #[serde(rename = "connect_timeout_ms", with = "duration_ms")]
    pub connect_timeout: Duration,
    /// Largest word accepted from the device.
    pub max_word_len: usize,
    /// Which reply markers end a response.
    pub termination: Termination,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_API_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_word_len: DEFAULT_MAX_WORD_LEN,
            termination: Termination::default(),
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("max_word_len", &self.max_word_len)
            .field("termination", &self.termination)
            .finish()
    }
}

impl SessionConfig {
    /// Create a config for `host` with defaults for everything else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Check that the config can be used to connect.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RouterOsError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(RouterOsError::Config("port must not be 0".to_string()));
        }
        if self.connect_timeout.is_zero() {
            return Err(RouterOsError::Config(
                "connect timeout must be positive".to_string(),
            ));
        }
        if self.max_word_len == 0 {
            return Err(RouterOsError::Config(
                "max_word_len must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Build a config from `ROUTEROS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup (environment-like).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(env::HOST)
            .ok_or_else(|| RouterOsError::Config(format!("{} is not set", env::HOST)))?;
        let mut config = Self::new(host);

        if let Some(port) = lookup(env::PORT) {
            config.port = parse_var(env::PORT, &port)?;
        }
        if let Some(user) = lookup(env::USER) {
            config.username = user;
        }
        if let Some(password) = lookup(env::PASSWORD) {
            config.password = password;
        }
        if let Some(ms) = lookup(env::CONNECT_TIMEOUT_MS) {
            let ms: u64 = parse_var(env::CONNECT_TIMEOUT_MS, &ms)?;
            config.connect_timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RouterOsError::Config(format!("{name}: invalid value '{value}'")))
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new("router");
        assert_eq!(config.port, 8728);
        assert_eq!(config.username, "admin");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.max_word_len, DEFAULT_MAX_WORD_LEN);
        assert_eq!(config.termination, Termination::DoneOrFatal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_host_rejected() {
        let err = SessionConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn test_from_json_full() {
        let config = SessionConfig::from_json_str(
            r#"{
                "host": "10.1.1.1",
                "port": 18728,
                "username": "api",
                "password": "pw",
                "connect_timeout_ms": 1500,
                "max_word_len": 4096,
                "termination": "any_reply_marker"
            }"#,
        )
        .unwrap();
        assert_eq!(config.port, 18728);
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_word_len, 4096);
        assert_eq!(config.termination, Termination::AnyReplyMarker);
    }

    #[test]
    fn test_from_json_unknown_field() {
        let err = SessionConfig::from_json_str(r#"{"host":"a","colour":"red"}"#).unwrap_err();
        assert!(matches!(err, RouterOsError::Json(_)));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.json");
        std::fs::write(&path, r#"{"host":"192.168.88.1"}"#).unwrap();
        let config = SessionConfig::from_json_file(&path).unwrap();
        assert_eq!(config.host, "192.168.88.1");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (env::HOST, "gw"),
            (env::PORT, "8729"),
            (env::USER, "ops"),
            (env::PASSWORD, "hunter2"),
            (env::CONNECT_TIMEOUT_MS, "250"),
        ]
        .into_iter()
        .collect();
        let config = SessionConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.host, "gw");
        assert_eq!(config.port, 8729);
        assert_eq!(config.username, "ops");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_lookup_errors() {
        let err = SessionConfig::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains(env::HOST));

        let err = SessionConfig::from_lookup(|k| match k {
            env::HOST => Some("gw".to_string()),
            env::PORT => Some("http".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, RouterOsError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = SessionConfig::new("gw");
        config.password = "topsecret".to_string();
        let debug = format!("{config:?}");
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("<redacted>"));
    }
}
