//! WebSocket protocol primitives: frame codec, opcodes, masking, and
//! the opening handshake.

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use frame::Frame;
pub use handshake::{compute_accept_key, WS_GUID};
pub use mask::apply_mask;
pub use opcode::Opcode;

pub(crate) use handshake::{read_upgrade_response, write_upgrade_request};
