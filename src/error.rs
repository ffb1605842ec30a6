//! Engine error type.
//!
//! Transport failures surface from `connect`/`reconnect` unchanged; a lost
//! session is not an error (it is a state transition that fires
//! `connection-lost`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("TCP connect to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        source: std::io::Error,
    },

    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("inbound line is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("could not parse line {line:?}: {reason}")]
    Parse { line: String, reason: String },

    /// A bus handler failed; the rest of that emission's fan-out was skipped.
    #[error("handler for `{signal}` failed: {reason}")]
    Handler { signal: String, reason: anyhow::Error },

    #[error("connection is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, EngineError>;
