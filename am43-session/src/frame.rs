//! AM43 frame structure and encoding/decoding
//!
//! Outbound frame layout:
//!
//! ```text
//! +----+----+----+----+----+--------+-----+-------------+----------+
//! | 00 | FF | 00 | 00 | 9A | opcode | len | payload ... | checksum |
//! +----+----+----+----+----+--------+-----+-------------+----------+
//! ```
//!
//! The checksum is the XOR of every preceding byte, inverted. Notifications
//! from the motor start at the `9A` marker and use the same layout from there
//! on, so byte offsets into a reply are counted from the marker.

use am43_core::constants::{MAX_PAYLOAD_LEN, PREAMBLE, REPLY_MARKER};
use am43_core::{Am43Error, Am43Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt::Write;

/// Marker, opcode and length byte
pub const HEADER_LEN: usize = 3;

/// Outbound preamble bytes that precede the marker
const LINK_PREFIX: [u8; 4] = [PREAMBLE[0], PREAMBLE[1], PREAMBLE[2], PREAMBLE[3]];

/// Compute the frame checksum of `data`
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc ^ b) ^ 0xFF
}

/// Encode a frame
///
/// # Errors
/// Returns `Am43Error::PayloadTooLong` if the payload does not fit the single
/// length byte. The payload is never truncated.
pub fn encode(opcode: u8, payload: &[u8]) -> Am43Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Am43Error::PayloadTooLong {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut buf = BytesMut::with_capacity(PREAMBLE.len() + 2 + payload.len() + 1);
    buf.put_slice(&PREAMBLE);
    buf.put_u8(opcode);
    buf.put_u8(payload.len() as u8);
    buf.put_slice(payload);
    let sum = checksum(&buf);
    buf.put_u8(sum);
    Ok(buf.freeze())
}

/// Decode an inbound buffer
///
/// Accepts buffers starting at the reply marker, or full frames that still
/// carry the outbound preamble. Notifications from the motor itself always
/// start at the marker; the preamble form only covers locally encoded frames.
///
/// # Returns
/// `None` if the buffer is too short to hold an opcode or does not start with
/// the marker. Partial frames are routine on this link and are dropped by the
/// caller without further reporting.
pub fn decode(data: &[u8]) -> Option<FrameView<'_>> {
    let bytes = data.strip_prefix(&LINK_PREFIX[..]).unwrap_or(data);
    if bytes.len() < 2 || bytes[0] != REPLY_MARKER {
        return None;
    }
    Some(FrameView { bytes })
}

/// Bounds-checked view over a decoded frame
///
/// Offsets are counted from the marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    bytes: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn opcode(&self) -> u8 {
        self.bytes[1]
    }

    /// Payload length announced by the frame, if the length byte arrived
    pub fn declared_len(&self) -> Option<usize> {
        self.bytes.get(2).map(|&len| len as usize)
    }

    /// Read the byte at `offset`
    ///
    /// Header bytes are readable whenever they arrived. Payload bytes are only
    /// readable if they lie inside the declared payload and inside the buffer.
    pub fn byte(&self, offset: usize) -> Option<u8> {
        if offset < HEADER_LEN {
            return self.bytes.get(offset).copied();
        }
        let declared = self.declared_len()?;
        if offset >= HEADER_LEN + declared {
            return None;
        }
        self.bytes.get(offset).copied()
    }

    /// Read a big-endian `u16` starting at `offset`
    pub fn u16_be(&self, offset: usize) -> Option<u16> {
        Some(u16::from_be_bytes([self.byte(offset)?, self.byte(offset + 1)?]))
    }

    /// Declared payload, if it arrived in full
    pub fn payload(&self) -> Option<&'a [u8]> {
        let len = self.declared_len()?;
        self.bytes.get(HEADER_LEN..HEADER_LEN + len)
    }

    /// Trailing checksum byte, if it arrived
    pub fn checksum_byte(&self) -> Option<u8> {
        self.bytes.get(HEADER_LEN + self.declared_len()?).copied()
    }

    /// Verify the trailing checksum
    ///
    /// The sum covers the full outbound preamble, so a reply and the request
    /// it answers are checked the same way.
    ///
    /// # Returns
    /// `None` if the frame is truncated before its checksum
    pub fn checksum_ok(&self) -> Option<bool> {
        let end = HEADER_LEN + self.declared_len()?;
        let received = *self.bytes.get(end)?;
        let expected = checksum(&self.bytes[..end]) ^ checksum(&LINK_PREFIX) ^ 0xFF;
        Some(received == expected)
    }

    /// Raw bytes starting at the marker
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Format bytes as contiguous uppercase hex, as the motor logs are usually read
pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(out, "{:02X}", b);
    }
    out
}
