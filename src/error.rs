//! Error types for the WebSocket client endpoint.
//!
//! Exactly three error kinds can escape an established connection: I/O
//! failures, protocol violations by the server, and local interruption.
//! The remaining variants are precondition and argument failures of the
//! public entry points.

use thiserror::Error;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the WebSocket endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The underlying socket failed to connect, read, or write.
    #[error("I/O error: {0}")]
    Io(String),

    /// The server violated the WebSocket protocol or asked for an
    /// unsupported feature (bad handshake, reserved bits, oversize or
    /// fragmented frames).
    #[error("wrong websocket response: {0}")]
    WrongResponse(String),

    /// A send was attempted while the connection was not established.
    #[error("not connected")]
    NotConnected,

    /// The connection was cancelled locally via [`interrupt`].
    ///
    /// [`interrupt`]: crate::WebSocket::interrupt
    #[error("interrupted")]
    Interrupted,

    /// `connect` was called while a connection was already in progress.
    #[error("connect may only be called when disconnected")]
    AlreadyConnected,

    /// The URI is not a usable `ws://` or `wss://` endpoint.
    #[error("invalid websocket uri: {0}")]
    InvalidUri(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
