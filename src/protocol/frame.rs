//! WebSocket frame codec over blocking streams (RFC 6455 Section 5.2).
//!
//! One call reads or writes exactly one complete frame. Reads are
//! until-full (`read_exact`), so a peer that closes mid-frame surfaces
//! as an I/O error rather than a truncated frame.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::protocol::mask::apply_mask;
use crate::protocol::opcode::Opcode;

/// Reserved bits RSV1-RSV3 in the first header byte.
const RESERVED: u8 = 0x70;
/// FIN flag in the first header byte.
const FIN: u8 = 0x80;
/// MASK flag in the second header byte.
const MASKED: u8 = 0x80;

/// A single WebSocket frame.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. Always `true` for frames produced by
    /// [`Frame::read_from`]; non-final frames are rejected.
    pub fin: bool,
    /// Frame opcode.
    pub opcode: Opcode,
    /// Unmasked payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a final frame with the given opcode and payload.
    #[must_use]
    pub fn new(opcode: Opcode, payload: Vec<u8>) -> Self {
        Self {
            fin: true,
            opcode,
            payload,
        }
    }

    /// Create a text frame.
    #[must_use]
    pub fn text(data: impl Into<String>) -> Self {
        Self::new(Opcode::Text, data.into().into_bytes())
    }

    /// Create a binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Opcode::Binary, data.into())
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Opcode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Opcode::Pong, data.into())
    }

    /// Read one complete frame from `reader`.
    ///
    /// Payloads announced as larger than `max_payload` are rejected
    /// before any payload byte is read. Masked payloads (unusual from a
    /// server, but accepted) are unmasked in place.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongResponse`] if a reserved bit is set, the payload
    ///   exceeds `max_payload`, or the frame is non-final or a
    ///   continuation frame.
    /// - [`Error::Io`] if the stream fails or ends mid-frame.
    pub fn read_from<R: Read>(reader: &mut R, max_payload: usize) -> Result<Self> {
        let first = read_u8(reader)?;
        if first & RESERVED != 0 {
            return Err(Error::WrongResponse(
                "server expected unsupported negotiation".into(),
            ));
        }
        let fin = first & FIN != 0;
        let opcode = Opcode::from_u8(first & 0x0F);

        let second = read_u8(reader)?;
        let masked = second & MASKED != 0;
        let mut payload_len = u64::from(second & !MASKED);
        if payload_len == 126 {
            payload_len = u64::from(read_u16(reader)?);
        } else if payload_len == 127 {
            payload_len = read_u64(reader)?;
        }

        let mask = if masked {
            let mut key = [0u8; 4];
            reader.read_exact(&mut key)?;
            Some(key)
        } else {
            None
        };

        if payload_len > max_payload as u64 {
            return Err(Error::WrongResponse("too large payload".into()));
        }
        if !fin || opcode == Opcode::Continuation {
            return Err(Error::WrongResponse(
                "fragmented frames are not supported".into(),
            ));
        }

        let mut payload = vec![0u8; payload_len as usize];
        reader.read_exact(&mut payload)?;
        if let Some(key) = mask {
            apply_mask(&mut payload, key);
        }

        Ok(Self {
            fin,
            opcode,
            payload,
        })
    }

    /// Write this frame to `writer`, masking the payload when a key is
    /// given.
    ///
    /// The header is emitted first (FIN | opcode, then the length byte
    /// with the MASK flag, then any extended length), followed by the
    /// masking key and the payload. The writer is not flushed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the stream fails.
    pub fn write_to<W: Write>(mut self, writer: &mut W, mask: Option<[u8; 4]>) -> Result<()> {
        let first = (if self.fin { FIN } else { 0 }) | self.opcode.as_u8();
        writer.write_all(&[first])?;

        let mask_flag = if mask.is_some() { MASKED } else { 0 };
        let len = self.payload.len();
        if len > 0xFFFF {
            writer.write_all(&[127 | mask_flag])?;
            writer.write_all(&(len as u64).to_be_bytes())?;
        } else if len >= 126 {
            writer.write_all(&[126 | mask_flag])?;
            writer.write_all(&(len as u16).to_be_bytes())?;
        } else {
            writer.write_all(&[len as u8 | mask_flag])?;
        }

        if let Some(key) = mask {
            writer.write_all(&key)?;
            apply_mask(&mut self.payload, key);
        }
        writer.write_all(&self.payload)?;
        Ok(())
    }

    /// The number of bytes this frame occupies on the wire.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let len = self.payload.len();
        let extended = if len > 0xFFFF {
            8
        } else if len >= 126 {
            2
        } else {
            0
        };
        2 + extended + if masked { 4 } else { 0 } + len
    }
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}
