//! Randomness for handshake nonces and frame masks.

use std::sync::atomic::{AtomicBool, Ordering};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::warn;

/// CSPRNG provider with sticky failure.
///
/// Once a draw from the operating system's entropy source fails, the
/// provider never retries: handshake nonces degrade to all-zero bytes
/// and frame masks become unavailable, so outgoing frames are emitted
/// unmasked. The degradation is logged when it first occurs.
#[derive(Debug, Default)]
pub(crate) struct RandomSource {
    poisoned: AtomicBool,
}

impl RandomSource {
    pub(crate) const fn new() -> Self {
        Self {
            poisoned: AtomicBool::new(false),
        }
    }

    fn fill(&self, buf: &mut [u8]) -> bool {
        if self.poisoned.load(Ordering::Relaxed) {
            return false;
        }
        match getrandom::getrandom(buf) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "entropy source failed; frames will be sent unmasked");
                self.poisoned.store(true, Ordering::Relaxed);
                false
            }
        }
    }

    /// 16-byte handshake nonce, base64-encoded without line wrapping.
    ///
    /// Zero-filled after a sticky entropy failure.
    pub(crate) fn handshake_nonce(&self) -> String {
        let mut nonce = [0u8; 16];
        if !self.fill(&mut nonce) {
            nonce = [0u8; 16];
        }
        BASE64.encode(nonce)
    }

    /// Fresh 4-byte frame mask, or `None` after a sticky entropy failure.
    pub(crate) fn frame_mask(&self) -> Option<[u8; 4]> {
        let mut mask = [0u8; 4];
        self.fill(&mut mask).then_some(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_is_16_bytes_base64() {
        let source = RandomSource::new();
        let nonce = source.handshake_nonce();
        // 16 bytes encode to 24 base64 characters including padding.
        assert_eq!(nonce.len(), 24);
        assert_eq!(BASE64.decode(&nonce).unwrap().len(), 16);
        assert!(!nonce.contains('\n'));
    }

    #[test]
    fn test_masks_are_fresh() {
        let source = RandomSource::new();
        let masks: Vec<_> = (0..8).map(|_| source.frame_mask().unwrap()).collect();
        // Eight identical draws from a healthy CSPRNG would be
        // astronomically unlikely.
        assert!(masks.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_poisoned_source_degrades() {
        let source = RandomSource::new();
        source.poisoned.store(true, Ordering::Relaxed);
        assert_eq!(source.frame_mask(), None);
        assert_eq!(source.handshake_nonce(), BASE64.encode([0u8; 16]));
    }
}
