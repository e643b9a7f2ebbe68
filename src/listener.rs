//! The event sink every connection reports into.

use crate::error::Result;

/// Receiver for the semantic events of one connection.
///
/// All callbacks run synchronously on the thread that called
/// [`connect`](crate::WebSocket::connect); a slow callback backpressures
/// frame reads. A callback returning an error terminates the reader loop
/// and thereby the connection.
///
/// Events may be delivered while one of the listener's own sends is
/// still in flight on another thread; implementations must tolerate
/// that interleaving.
///
/// Every method has a no-op default so implementors only handle the
/// events they care about.
pub trait WebSocketListener: Send + Sync {
    /// The handshake completed and frames may now be sent.
    fn on_connected(&self) -> Result<()> {
        Ok(())
    }

    /// A text frame arrived.
    fn on_text(&self, message: String) -> Result<()> {
        let _ = message;
        Ok(())
    }

    /// A binary frame arrived.
    fn on_binary(&self, payload: Vec<u8>) -> Result<()> {
        let _ = payload;
        Ok(())
    }

    /// A ping frame arrived. After this returns, the endpoint replies
    /// with a pong carrying the same payload.
    fn on_ping(&self, payload: Vec<u8>) -> Result<()> {
        let _ = payload;
        Ok(())
    }

    /// A pong frame arrived.
    fn on_pong(&self, payload: Vec<u8>) -> Result<()> {
        let _ = payload;
        Ok(())
    }

    /// The server sent a close frame. The endpoint does not reply with
    /// a close frame of its own; the connection ends when the server
    /// drops the socket.
    fn on_server_requested_close(&self, payload: Vec<u8>) -> Result<()> {
        let _ = payload;
        Ok(())
    }

    /// A frame with an opcode outside the recognized set arrived.
    fn on_unknown(&self, payload: Vec<u8>) -> Result<()> {
        let _ = payload;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;
    impl WebSocketListener for Silent {}

    #[test]
    fn test_defaults_are_noops() {
        let l = Silent;
        assert!(l.on_connected().is_ok());
        assert!(l.on_text("hi".into()).is_ok());
        assert!(l.on_binary(vec![1, 2]).is_ok());
        assert!(l.on_ping(vec![]).is_ok());
        assert!(l.on_pong(vec![]).is_ok());
        assert!(l.on_server_requested_close(vec![]).is_ok());
        assert!(l.on_unknown(vec![0xFF]).is_ok());
    }
}
