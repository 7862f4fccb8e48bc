//! BER length encoding (X.690 Section 8.1.3).
//!
//! Short form for lengths below 128, long form with up to four length
//! octets otherwise. Indefinite length (0x80) is rejected on decode.

use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, Result};

/// Largest number of octets following a long-form length byte.
pub const MAX_LENGTH_OCTETS: usize = 4;

/// Encode a length.
///
/// Returns the octets in wire order and the number of valid octets.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut out = [0u8; 5];
    if len < 0x80 {
        out[0] = len as u8;
        return (out, 1);
    }

    let bytes = (len as u32).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let count = 4 - skip;
    out[0] = 0x80 | count as u8;
    out[1..=count].copy_from_slice(&bytes[skip..]);
    (out, count + 1)
}

/// Number of octets needed to encode `len`.
pub fn length_size(len: usize) -> usize {
    encode_length(len).1
}

/// Check that a content length fits the 4-octet long form.
pub(crate) fn check_encodable(len: usize) -> Result<()> {
    if len > u32::MAX as usize {
        return Err(Error::encode(EncodeErrorKind::LengthOverflow { length: len }));
    }
    Ok(())
}

/// Decode a length starting at `offset`.
///
/// Returns `(length, next_offset)`.
pub fn decode_length(data: &[u8], offset: usize) -> Result<(usize, usize)> {
    let first = *data
        .get(offset)
        .ok_or_else(|| Error::decode(offset, DecodeErrorKind::TruncatedData))?;

    if first & 0x80 == 0 {
        return Ok((first as usize, offset + 1));
    }

    let octets = (first & 0x7F) as usize;
    if octets == 0 {
        return Err(Error::decode(offset, DecodeErrorKind::IndefiniteLength));
    }
    if octets > MAX_LENGTH_OCTETS {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::LengthTooLong { octets },
        ));
    }

    let start = offset + 1;
    let end = start + octets;
    let bytes = data
        .get(start..end)
        .ok_or_else(|| Error::decode(start, DecodeErrorKind::TruncatedData))?;

    let len = bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);
    Ok((len, end))
}
