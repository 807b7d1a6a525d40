// SPDX-License-Identifier: MPL-2.0

//! Low-level buffer parsing shared by every control packet decoder.
//!
//! Decoders work over `&[u8]` slices with explicit offsets and report how
//! many bytes they consumed. Running out of input is not an error at the
//! packet level: `Decoded::NeedMore` carries a hint of how many further
//! bytes are required so a streaming caller can wait for exactly that much.

pub mod stream;

use thiserror::Error;

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType};

/// Largest value a Variable Byte Integer can encode (4 bytes of payload).
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The buffer ends mid-field. Carries the number of additional bytes
    /// needed before the decode can be retried. Never fatal.
    #[error("incomplete input, need {0} more byte(s)")]
    Incomplete(usize),

    /// A Variable Byte Integer ran past four bytes or left its final
    /// continuation bit set.
    #[error("malformed variable byte integer")]
    MalformedVariableByteInteger,

    /// A length-prefixed string field did not hold valid UTF-8.
    #[error("malformed utf-8 string: {0}")]
    MalformedUtf8(#[from] std::string::FromUtf8Error),

    /// The bytes violate the wire grammar: bad flag bits, unknown packet
    /// type, trailing garbage after the declared remaining length.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// The bytes parse but violate a protocol rule, e.g. a duplicated
    /// single-occurrence property or a zero packet identifier.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A string or binary field exceeds the 65,535 byte limit of its
    /// two-byte length prefix.
    #[error("field of {0} bytes exceeds the u16 length prefix")]
    FieldTooLong(usize),
}

impl DecodeError {
    /// Whether the error poisons the connection. `Incomplete` only means
    /// "feed me more bytes" and must never tear anything down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DecodeError::Incomplete(_))
    }
}

/// Outcome of attempting to decode one packet from a buffer.
#[derive(Debug)]
pub enum Decoded {
    /// A complete packet plus the total number of bytes it occupied,
    /// fixed header included.
    Packet(ControlPacket, usize),
    /// The buffer holds a valid prefix of a packet; at least this many
    /// further bytes are required.
    NeedMore(usize),
}

/// Parsed fixed header of a packet whose body is fully buffered.
#[derive(Debug, Clone, Copy)]
pub struct FixedHeader {
    /// Low nibble of the first byte.
    pub flags: u8,
    /// Offset of the first byte after the remaining-length field.
    pub body_start: usize,
    /// Total packet size, fixed header included.
    pub total_len: usize,
}

/// Outcome of [`FixedHeader::parse`].
#[derive(Debug, Clone, Copy)]
pub enum HeaderStatus {
    Complete(FixedHeader),
    /// Header parsed but the body is short by this many bytes.
    Partial(usize),
}

impl FixedHeader {
    /// Parses the fixed header and checks the packet type nibble against
    /// `expected`. Returns `Partial` when the declared body has not fully
    /// arrived yet.
    pub fn parse(buffer: &[u8], expected: ControlPacketType) -> Result<HeaderStatus, DecodeError> {
        let first = *buffer.first().ok_or(DecodeError::Incomplete(2))?;
        if first >> 4 != expected as u8 {
            return Err(DecodeError::MalformedPacket(format!(
                "expected packet type {}, found {}",
                expected as u8,
                first >> 4
            )));
        }
        let (remaining_length, vbi_len) = parse_remaining_length(buffer)?;
        let body_start = 1 + vbi_len;
        let total_len = body_start + remaining_length;
        if total_len > buffer.len() {
            return Ok(HeaderStatus::Partial(total_len - buffer.len()));
        }
        Ok(HeaderStatus::Complete(FixedHeader {
            flags: first & 0x0F,
            body_start,
            total_len,
        }))
    }
}

/// Reads the control packet type from the high nibble of the first byte.
pub fn packet_type(buffer: &[u8]) -> Result<u8, DecodeError> {
    match buffer.first() {
        Some(byte) => Ok(byte >> 4),
        None => Err(DecodeError::Incomplete(1)),
    }
}

/// Decodes a Variable Byte Integer starting at `offset`.
///
/// Returns the value and the number of bytes it occupied (1..=4).
pub fn decode_variable_byte_integer(
    buffer: &[u8],
    offset: usize,
) -> Result<(usize, usize), DecodeError> {
    let mut value: usize = 0;
    let mut multiplier: usize = 1;
    for i in 0..4 {
        let byte = match buffer.get(offset + i) {
            Some(b) => *b,
            None => return Err(DecodeError::Incomplete(1)),
        };
        value += (byte & 0x7F) as usize * multiplier;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        multiplier *= 128;
    }
    Err(DecodeError::MalformedVariableByteInteger)
}

/// Encodes a Variable Byte Integer, emitting the fewest bytes possible.
pub fn encode_variable_byte_integer(mut value: usize) -> Result<Vec<u8>, DecodeError> {
    if value > MAX_REMAINING_LENGTH {
        return Err(DecodeError::MalformedVariableByteInteger);
    }
    let mut out = Vec::with_capacity(4);
    loop {
        let mut byte = (value % 128) as u8;
        value /= 128;
        if value > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return Ok(out);
        }
    }
}

/// Reads the remaining-length field that follows the first byte of the
/// fixed header. Returns `(remaining_length, #bytes of the length field)`.
pub fn parse_remaining_length(buffer: &[u8]) -> Result<(usize, usize), DecodeError> {
    decode_variable_byte_integer(buffer, 1)
}

/// Reads a two-byte big-endian integer at `offset`.
pub fn parse_u16(buffer: &[u8], offset: usize) -> Result<(u16, usize), DecodeError> {
    if buffer.len() < offset + 2 {
        return Err(DecodeError::Incomplete(offset + 2 - buffer.len()));
    }
    let value = u16::from_be_bytes([buffer[offset], buffer[offset + 1]]);
    Ok((value, 2))
}

/// Reads a four-byte big-endian integer at `offset`.
pub fn parse_u32(buffer: &[u8], offset: usize) -> Result<(u32, usize), DecodeError> {
    if buffer.len() < offset + 4 {
        return Err(DecodeError::Incomplete(offset + 4 - buffer.len()));
    }
    let value = u32::from_be_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ]);
    Ok((value, 4))
}

/// Reads a length-prefixed UTF-8 string at `offset`.
pub fn parse_utf8_string(buffer: &[u8], offset: usize) -> Result<(String, usize), DecodeError> {
    let (len, _) = parse_u16(buffer, offset)?;
    let len = len as usize;
    let start = offset + 2;
    if buffer.len() < start + len {
        return Err(DecodeError::Incomplete(start + len - buffer.len()));
    }
    let value = String::from_utf8(buffer[start..start + len].to_vec())?;
    Ok((value, 2 + len))
}

/// Reads a length-prefixed binary blob at `offset`.
pub fn parse_binary_data(buffer: &[u8], offset: usize) -> Result<(Vec<u8>, usize), DecodeError> {
    let (len, _) = parse_u16(buffer, offset)?;
    let len = len as usize;
    let start = offset + 2;
    if buffer.len() < start + len {
        return Err(DecodeError::Incomplete(start + len - buffer.len()));
    }
    Ok((buffer[start..start + len].to_vec(), 2 + len))
}

/// Reads a nonzero packet identifier at `offset`.
pub fn parse_packet_id(buffer: &[u8], offset: usize) -> Result<(u16, usize), DecodeError> {
    let (id, consumed) = parse_u16(buffer, offset)?;
    if id == 0 {
        return Err(DecodeError::ProtocolError(
            "packet identifier must be nonzero".into(),
        ));
    }
    Ok((id, consumed))
}

/// Encodes a two-byte-length-prefixed UTF-8 string.
pub fn encode_utf8_string(value: &str) -> Result<Vec<u8>, DecodeError> {
    let bytes = value.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(DecodeError::FieldTooLong(bytes.len()));
    }
    let mut out = Vec::with_capacity(2 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Encodes a two-byte-length-prefixed binary blob.
pub fn encode_binary_data(value: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if value.len() > u16::MAX as usize {
        return Err(DecodeError::FieldTooLong(value.len()));
    }
    let mut out = Vec::with_capacity(2 + value.len());
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    Ok(out)
}
