//! Connection lifecycle states.

/// Lifecycle state of a WebSocket endpoint.
///
/// Within one `connect` invocation the state moves monotonically:
/// `Disconnected → Connecting → Connected → Disconnected`, with
/// `Disconnecting` interposed when the connection is cancelled locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No connection. The only state in which `connect` may be called.
    #[default]
    Disconnected,
    /// TCP connect and opening handshake in progress.
    Connecting,
    /// Handshake verified; frames flow in both directions.
    Connected,
    /// Local cancellation observed; the connecting thread is unwinding.
    Disconnecting,
}

impl ConnectionState {
    /// Check if sending frames is allowed in this state.
    #[inline]
    #[must_use]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if a live socket belongs to this state.
    #[inline]
    #[must_use]
    pub const fn has_socket(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}
