//! # wsclient - Blocking RFC 6455 WebSocket client endpoint
//!
//! `wsclient` provides a single long-lived client connection over plain
//! or TLS-secured TCP: it performs the opening HTTP Upgrade handshake,
//! reads inbound frames and dispatches them as semantic events, and
//! accepts outbound messages from any number of concurrent threads,
//! serializing them as masked frames on the wire.
//!
//! ## Model
//!
//! - The thread that calls [`WebSocket::connect`] becomes the frame
//!   reader and blocks for the connection's lifetime; `connect` always
//!   returns an error describing why the session ended.
//! - Any other thread may call `send_text` / `send_binary` /
//!   `send_ping`; frames are never interleaved on the wire.
//! - [`WebSocket::interrupt`] cancels a blocked connect or read from
//!   any thread by closing the socket underneath it; the connect thread
//!   then returns [`Error::Interrupted`].
//! - Events arrive through a caller-supplied [`WebSocketListener`] on
//!   the reader thread.
//!
//! ## Limitations
//!
//! Fragmented messages are not supported in either direction: non-final
//! frames and continuation frames are rejected as protocol errors.
//! Inbound payloads are capped (1 MiB by default, see [`Config`]). The
//! endpoint never initiates a close handshake; it reports the server's
//! close frame and tears down when the socket drops.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use url::Url;
//! use wsclient::{Result, WebSocket, WebSocketListener};
//!
//! struct Echo;
//! impl WebSocketListener for Echo {
//!     fn on_text(&self, message: String) -> Result<()> {
//!         println!("received: {message}");
//!         Ok(())
//!     }
//! }
//!
//! let ws = WebSocket::new(Echo);
//! let uri = Url::parse("wss://example.com/stream").unwrap();
//! let err = ws.connect(&uri).unwrap_err();
//! eprintln!("session ended: {err}");
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod protocol;

mod net;
mod random;

pub use config::Config;
pub use connection::{ConnectionState, WebSocket};
pub use error::{Error, Result};
pub use listener::WebSocketListener;
pub use protocol::{apply_mask, compute_accept_key, Frame, Opcode, WS_GUID};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    struct Silent;
    impl WebSocketListener for Silent {}

    #[test]
    fn test_public_types_are_send_and_sync() {
        assert_send::<Error>();
        assert_sync::<Error>();
        assert_send::<Config>();
        assert_sync::<Config>();
        assert_send::<ConnectionState>();
        assert_sync::<ConnectionState>();
        assert_send::<Frame>();
        assert_sync::<Frame>();
        assert_send::<WebSocket<Silent>>();
        assert_sync::<WebSocket<Silent>>();
    }
}
