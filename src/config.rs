//! Configuration and limits for the client endpoint.

/// Configuration for a [`WebSocket`](crate::WebSocket) endpoint.
///
/// The single limit bounds memory consumed by a hostile or broken peer;
/// frames announcing a larger payload are rejected before their payload
/// is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum accepted inbound payload size in bytes.
    ///
    /// Default: 1 MiB.
    pub max_inbound_payload: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_inbound_payload: 1024 * 1024,
        }
    }
}

impl Config {
    /// Create a configuration with a custom inbound payload cap.
    #[must_use]
    pub const fn new(max_inbound_payload: usize) -> Self {
        Self {
            max_inbound_payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_payload_cap() {
        assert_eq!(Config::default().max_inbound_payload, 1024 * 1024);
    }

    #[test]
    fn test_custom_payload_cap() {
        assert_eq!(Config::new(4096).max_inbound_payload, 4096);
    }
}
