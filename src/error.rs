//! Error types for routeros-client.

use std::time::Duration;

use thiserror::Error;

/// Remediation hint attached to every reported failure.
pub const REMEDIATION_HINT: &str = "verify the device is reachable and credentials are correct";

/// Remediation hint for lookups that matched nothing.
pub const NOT_FOUND_HINT: &str = "verify the object name is correct";

/// Coarse classification of a [`RouterOsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connect failure, socket closed mid-read, incomplete word.
    Transport,
    /// Malformed length prefix or impossible word size.
    Protocol,
    /// Login rejected.
    Auth,
    /// The device answered with `!trap` or `!fatal`.
    Device,
    /// Operation attempted in the wrong session state.
    State,
    /// Bad configuration or input record.
    Config,
    /// Named object does not exist on the device.
    NotFound,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Auth => "auth",
            Self::Device => "device",
            Self::State => "state",
            Self::Config => "config",
            Self::NotFound => "not_found",
        };
        f.write_str(name)
    }
}

/// Main error type for all RouterOS API operations.
#[derive(Debug, Error)]
pub enum RouterOsError {
    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TCP connect did not complete in time.
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Address that was dialled.
        addr: String,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// Peer closed the stream before a length prefix could be read.
    #[error("connection closed")]
    ConnectionClosed,

    /// Stream ended inside a word.
    #[error("incomplete word: expected {expected} bytes, received {received}")]
    IncompleteWord {
        /// Bytes announced by the length prefix (or prefix bytes needed).
        expected: usize,
        /// Bytes actually received before end of stream.
        received: usize,
    },

    /// Malformed data on the wire.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Word length exceeds the configured or representable maximum.
    #[error("word length {length} exceeds maximum {max}")]
    WordTooLarge {
        /// Announced or requested length.
        length: u64,
        /// Limit in force.
        max: u64,
    },

    /// Login was not acknowledged with `!done`.
    #[error("login failed: {reason}")]
    Auth {
        /// Human-readable reason (trap message when available).
        reason: String,
        /// The raw reply, one word list per sentence.
        response: Vec<Vec<String>>,
    },

    /// Command rejected with `!trap`.
    #[error("command failed: {message}")]
    Trap {
        /// `=category=` attribute, when present.
        category: Option<String>,
        /// `=message=` attribute.
        message: String,
    },

    /// Device reported `!fatal` and closed the session.
    #[error("fatal device error: {message}")]
    Fatal {
        /// Reason reported by the device.
        message: String,
    },

    /// Operation needs a different session state.
    #[error("invalid session state: expected {expected}, session is {actual}")]
    InvalidState {
        /// State required by the operation.
        expected: &'static str,
        /// State the session was in.
        actual: &'static str,
    },

    /// Bad configuration value or input record.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error (config and record files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A named object was not found on the device.
    #[error("{what} with name '{name}' not found")]
    NotFound {
        /// Object type, e.g. "secret".
        what: &'static str,
        /// Name that was looked up.
        name: String,
    },
}

impl RouterOsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::ConnectTimeout { .. }
            | Self::ConnectionClosed
            | Self::IncompleteWord { .. } => ErrorKind::Transport,
            Self::Protocol(_) | Self::WordTooLarge { .. } => ErrorKind::Protocol,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Trap { .. } | Self::Fatal { .. } => ErrorKind::Device,
            Self::InvalidState { .. } => ErrorKind::State,
            Self::Config(_) | Self::Json(_) => ErrorKind::Config,
            Self::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Remediation hint for reporting.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => NOT_FOUND_HINT,
            _ => REMEDIATION_HINT,
        }
    }

    /// Returns true if the transport can no longer be used after this error.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

/// Result type alias using RouterOsError.
pub type Result<T> = std::result::Result<T, RouterOsError>;
