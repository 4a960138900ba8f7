//! Error types for the WebSocket upgrade engine.
//!
//! Errors fall into three families: configuration errors that abort before any
//! handshake I/O, handshake failures reported through the server's error
//! channel, and connection-lifetime errors surfaced from send/close operations.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while upgrading and driving a WebSocket connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The public address and upgrade path cannot form a valid `ws://`/`wss://`
    /// URI. Fatal configuration error, raised before any handshake attempt.
    #[error("Invalid upgrade URI: {0}")]
    InvalidUpgradeUri(String),

    /// The upgrade request does not satisfy RFC 6455 handshake requirements.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// A header value would corrupt the handshake response.
    #[error("Invalid header value for {header}: {reason}")]
    InvalidHeaderValue {
        /// The offending header name.
        header: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Close status code that RFC 6455 forbids sending on the wire.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// The connection is no longer open.
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(String),

    /// Application error raised from `on_open`. Displays as the bare message
    /// so it can be carried verbatim in a 1011 close reason.
    #[error("{0}")]
    App(String),
}

impl Error {
    /// Create an application error carrying the given message.
    pub fn app(message: impl Into<String>) -> Self {
        Error::App(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
