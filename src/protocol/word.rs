//! Word length prefix encoding and decoding.
//!
//! Every word on the wire is `<length-prefix><raw bytes>`. The prefix is
//! variable-length; the high bits of its first byte say how many bytes
//! follow:
//! ```text
//! ┌─────────────────────────┬────────┬──────────────────────────────┐
//! │ length                  │ prefix │ first byte                   │
//! ├─────────────────────────┼────────┼──────────────────────────────┤
//! │ < 0x80                  │ 1 byte │ 0xxxxxxx                     │
//! │ < 0x4000                │ 2 bytes│ 10xxxxxx                     │
//! │ < 0x200000              │ 3 bytes│ 110xxxxx                     │
//! │ < 0x10000000            │ 4 bytes│ 1110xxxx                     │
//! │ <= u32::MAX             │ 5 bytes│ 11110000, then 4 bytes BE    │
//! │ reserved (control byte) │   -    │ 11111xxx                     │
//! └─────────────────────────┴────────┴──────────────────────────────┘
//! ```
//!
//! Continuation bytes are Big Endian.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, RouterOsError};

/// Largest possible length prefix in bytes.
pub const MAX_PREFIX_SIZE: usize = 5;

/// Default cap on a single decoded word (16 MiB).
pub const DEFAULT_MAX_WORD_LEN: usize = 16 * 1024 * 1024;

/// Upper bounds (exclusive) of the 1-, 2-, 3- and 4-byte bands.
pub const ONE_BYTE_LIMIT: u32 = 0x80;
/// Exclusive upper bound of the 2-byte band.
pub const TWO_BYTE_LIMIT: u32 = 0x4000;
/// Exclusive upper bound of the 3-byte band.
pub const THREE_BYTE_LIMIT: u32 = 0x20_0000;
/// Exclusive upper bound of the 4-byte band.
pub const FOUR_BYTE_LIMIT: u32 = 0x1000_0000;

/// Marker bits of the first prefix byte, per band.
pub mod markers {
    /// `10xxxxxx`: 2-byte prefix.
    pub const TWO_BYTE: u8 = 0x80;
    /// `110xxxxx`: 3-byte prefix.
    pub const THREE_BYTE: u8 = 0xC0;
    /// `1110xxxx`: 4-byte prefix.
    pub const FOUR_BYTE: u8 = 0xE0;
    /// `11110000`: 5-byte prefix.
    pub const FIVE_BYTE: u8 = 0xF0;
    /// `11111xxx`: reserved control byte, never a length.
    pub const CONTROL: u8 = 0xF8;
}

/// An encoded length prefix, stored inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthPrefix {
    buf: [u8; MAX_PREFIX_SIZE],
    len: u8,
}

impl LengthPrefix {
    /// The encoded prefix bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    /// Number of prefix bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false; a prefix has at least one byte.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for LengthPrefix {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode a word length as its variable-length prefix.
///
/// # Example
///
/// ```
/// use routeros_client::protocol::encode_length;
///
/// assert_eq!(encode_length(0x7F).as_bytes(), &[0x7F]);
/// assert_eq!(encode_length(0x80).as_bytes(), &[0x80, 0x80]);
/// assert_eq!(encode_length(0x4000).as_bytes(), &[0xC0, 0x40, 0x00]);
/// ```
pub fn encode_length(n: u32) -> LengthPrefix {
    let be = n.to_be_bytes();
    let mut buf = [0u8; MAX_PREFIX_SIZE];
    let len = if n < ONE_BYTE_LIMIT {
        buf[0] = be[3];
        1
    } else if n < TWO_BYTE_LIMIT {
        buf[0] = be[2] | markers::TWO_BYTE;
        buf[1] = be[3];
        2
    } else if n < THREE_BYTE_LIMIT {
        buf[0] = be[1] | markers::THREE_BYTE;
        buf[1..3].copy_from_slice(&be[2..4]);
        3
    } else if n < FOUR_BYTE_LIMIT {
        buf[0] = be[0] | markers::FOUR_BYTE;
        buf[1..4].copy_from_slice(&be[1..4]);
        4
    } else {
        buf[0] = markers::FIVE_BYTE;
        buf[1..5].copy_from_slice(&be);
        5
    };
    LengthPrefix { buf, len }
}

/// Encode a payload length, rejecting lengths the prefix cannot express.
pub fn encode_payload_length(len: usize) -> Result<LengthPrefix> {
    let n = u32::try_from(len).map_err(|_| RouterOsError::WordTooLarge {
        length: len as u64,
        max: u64::from(u32::MAX),
    })?;
    Ok(encode_length(n))
}

/// Encode a complete word: prefix followed by the raw payload.
pub fn encode_word(payload: &[u8]) -> Result<Bytes> {
    let prefix = encode_payload_length(payload.len())?;
    let mut buf = BytesMut::with_capacity(prefix.len() + payload.len());
    buf.put_slice(prefix.as_bytes());
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Total prefix size announced by the first prefix byte.
///
/// Marker masks are tested from most to least specific, since every
/// multi-byte marker also has the single `0x80` bit set.
pub fn prefix_len(first: u8) -> Result<usize> {
    if first & markers::CONTROL == markers::CONTROL {
        return Err(RouterOsError::Protocol(format!(
            "reserved control byte 0x{first:02X} in length prefix"
        )));
    }
    let len = if first & markers::FIVE_BYTE == markers::FIVE_BYTE {
        if first != markers::FIVE_BYTE {
            return Err(RouterOsError::Protocol(format!(
                "malformed 5-byte length marker 0x{first:02X}"
            )));
        }
        5
    } else if first & markers::FOUR_BYTE == markers::FOUR_BYTE {
        4
    } else if first & markers::THREE_BYTE == markers::THREE_BYTE {
        3
    } else if first & markers::TWO_BYTE == markers::TWO_BYTE {
        2
    } else {
        1
    };
    Ok(len)
}

/// Decode a length prefix from the start of `buf`.
///
/// Returns `Ok(None)` if `buf` does not yet hold the whole prefix, otherwise
/// the decoded length and the number of prefix bytes consumed.
///
/// # Example
///
/// ```
/// use routeros_client::protocol::decode_length;
///
/// assert_eq!(decode_length(&[0xC0, 0x40, 0x00]).unwrap(), Some((0x4000, 3)));
/// assert_eq!(decode_length(&[0xC0, 0x40]).unwrap(), None);
/// ```
pub fn decode_length(buf: &[u8]) -> Result<Option<(u32, usize)>> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };
    let size = prefix_len(first)?;
    if buf.len() < size {
        return Ok(None);
    }

    let n = match size {
        1 => u32::from(first),
        2 => u32::from_be_bytes([0, 0, first & !markers::TWO_BYTE, buf[1]]),
        3 => u32::from_be_bytes([0, first & !markers::THREE_BYTE, buf[1], buf[2]]),
        4 => u32::from_be_bytes([first & !markers::FOUR_BYTE, buf[1], buf[2], buf[3]]),
        _ => u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]),
    };
    Ok(Some((n, size)))
}

/// Reject a decoded length above `max` before anything is allocated for it.
#[inline]
pub fn check_word_len(len: u32, max: usize) -> Result<usize> {
    let len = len as usize;
    if len > max {
        return Err(RouterOsError::WordTooLarge {
            length: len as u64,
            max: max as u64,
        });
    }
    Ok(len)
}
