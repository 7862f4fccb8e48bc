//! BER encoding.
//!
//! Two writers share the same integer and length helpers:
//!
//! - The `build_*` functions write forward into a caller-supplied buffer at
//!   an offset and return the next free offset. They hold no state and are
//!   what the SMI syntax types use for `encode_asn`.
//! - [`EncodeBuf`] writes from the end backwards to avoid needing to
//!   pre-calculate lengths, and assembles whole PDUs and messages.

use super::length::{check_encodable, encode_length};
use super::tag;
use crate::error::{EncodeErrorKind, Error, Result};
use crate::oid::Oid;
use bytes::Bytes;

/// Buffer for BER encoding that writes backwards.
///
/// This approach avoids needing to pre-calculate content lengths:
/// we write the content first, then prepend the length and tag.
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create a new encode buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    /// Create a new encode buffer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Push multiple bytes (prepends to front, reversed).
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    /// Push a BER length encoding.
    pub fn push_length(&mut self, len: usize) {
        let (bytes, count) = encode_length(len);
        self.push_bytes(&bytes[..count]);
    }

    /// Push a BER tag.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Get the current length of encoded data.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encode a constructed type (SEQUENCE, PDU, etc).
    ///
    /// Calls the closure to encode contents, then wraps with length and tag.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let start_len = self.len();
        f(self);
        let content_len = self.len() - start_len;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Encode a SEQUENCE.
    pub fn push_sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Encode an INTEGER.
    pub fn push_integer(&mut self, value: i32) {
        self.push_integer_tagged(tag::universal::INTEGER, value);
    }

    /// Encode a signed 32-bit integer with a specific tag.
    pub fn push_integer_tagged(&mut self, tag: u8, value: i32) {
        let (arr, len) = encode_integer_stack(value);
        // Valid bytes are at the end of the array
        self.push_bytes(&arr[4 - len..]);
        self.push_length(len);
        self.push_tag(tag);
    }

    /// Encode an unsigned 64-bit integer with a specific tag.
    pub fn push_unsigned64(&mut self, tag: u8, value: u64) {
        let (arr, len) = encode_unsigned64_stack(value);
        self.push_bytes(&arr[9 - len..]);
        self.push_length(len);
        self.push_tag(tag);
    }

    /// Encode an unsigned 32-bit integer with a specific tag.
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        let (arr, len) = encode_unsigned32_stack(value);
        self.push_bytes(&arr[5 - len..]);
        self.push_length(len);
        self.push_tag(tag);
    }

    /// Encode a byte string with a specific tag.
    pub fn push_string(&mut self, tag: u8, data: &[u8]) {
        self.push_bytes(data);
        self.push_length(data.len());
        self.push_tag(tag);
    }

    /// Encode an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_string(tag::universal::OCTET_STRING, data);
    }

    /// Encode a NULL-shaped value (empty content) with a specific tag.
    pub fn push_empty(&mut self, tag: u8) {
        self.push_length(0);
        self.push_tag(tag);
    }

    /// Encode a NULL.
    pub fn push_null(&mut self) {
        self.push_empty(tag::universal::NULL);
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &Oid) {
        let ber = oid.to_ber_smallvec();
        self.push_string(tag::universal::OBJECT_IDENTIFIER, &ber);
    }

    /// Encode an IP address.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_string(tag::application::IP_ADDRESS, &addr);
    }

    /// Finalize and return the encoded bytes.
    ///
    /// The buffer is reversed to produce the correct order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }

    /// Finalize and return as `Vec<u8>`.
    pub fn finish_vec(mut self) -> Vec<u8> {
        self.buf.reverse();
        self.buf
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `bytes` at `offset`, failing if the buffer is too short.
fn write_at(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<usize> {
    let end = offset + bytes.len();
    let available = buf.len().saturating_sub(offset);
    let slot = buf.get_mut(offset..end).ok_or_else(|| {
        Error::encode(EncodeErrorKind::BufferTooSmall {
            needed: bytes.len(),
            available,
        })
    })?;
    slot.copy_from_slice(bytes);
    Ok(end)
}

/// Write a tag and length header at `offset`.
pub fn build_header(buf: &mut [u8], offset: usize, tag: u8, len: usize) -> Result<usize> {
    check_encodable(len)?;
    let (arr, count) = encode_length(len);
    let offset = write_at(buf, offset, &[tag])?;
    write_at(buf, offset, &arr[..count])
}

/// Write a tagged TLV whose content is `content`.
fn build_tlv(buf: &mut [u8], offset: usize, tag: u8, content: &[u8]) -> Result<usize> {
    // Check the whole TLV fits before writing anything
    let (_, len_size) = encode_length(content.len());
    let needed = 1 + len_size + content.len();
    let available = buf.len().saturating_sub(offset);
    if needed > available {
        return Err(Error::encode(EncodeErrorKind::BufferTooSmall {
            needed,
            available,
        }));
    }
    let offset = build_header(buf, offset, tag, content.len())?;
    write_at(buf, offset, content)
}

/// Write a signed 32-bit integer.
pub fn build_integer32(buf: &mut [u8], offset: usize, tag: u8, value: i32) -> Result<usize> {
    let (arr, len) = encode_integer_stack(value);
    build_tlv(buf, offset, tag, &arr[4 - len..])
}

/// Write an unsigned 32-bit integer.
pub fn build_uinteger32(buf: &mut [u8], offset: usize, tag: u8, value: u32) -> Result<usize> {
    let (arr, len) = encode_unsigned32_stack(value);
    build_tlv(buf, offset, tag, &arr[5 - len..])
}

/// Write an unsigned 64-bit integer.
pub fn build_uinteger64(buf: &mut [u8], offset: usize, tag: u8, value: u64) -> Result<usize> {
    let (arr, len) = encode_unsigned64_stack(value);
    build_tlv(buf, offset, tag, &arr[9 - len..])
}

/// Write a byte string.
pub fn build_string(buf: &mut [u8], offset: usize, tag: u8, data: &[u8]) -> Result<usize> {
    build_tlv(buf, offset, tag, data)
}

/// Write an empty-content value (NULL and the v2 exceptions).
pub fn build_null(buf: &mut [u8], offset: usize, tag: u8) -> Result<usize> {
    build_tlv(buf, offset, tag, &[])
}

/// Write an object identifier.
pub fn build_oid(buf: &mut [u8], offset: usize, tag: u8, oid: &Oid) -> Result<usize> {
    build_tlv(buf, offset, tag, &oid.to_ber_smallvec())
}

/// Encode a signed 32-bit integer in minimal BER form.
///
/// Returns a stack-allocated array and the number of valid bytes.
/// The valid bytes are at the END of the array.
#[inline]
fn encode_integer_stack(value: i32) -> ([u8; 4], usize) {
    let bytes = value.to_be_bytes();

    // Find first significant byte
    let mut start = 0;
    if value >= 0 {
        // For positive/zero, skip leading 0x00 bytes (but keep one if needed for sign)
        while start < 3 && bytes[start] == 0 && bytes[start + 1] & 0x80 == 0 {
            start += 1;
        }
    } else {
        // For negative, skip leading 0xFF bytes (but keep one if needed for sign)
        while start < 3 && bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0 {
            start += 1;
        }
    }

    (bytes, 4 - start)
}

/// Encode an unsigned 32-bit integer.
///
/// Returns a stack-allocated array and the number of valid bytes.
/// The valid bytes are at the END of the array.
#[inline]
fn encode_unsigned32_stack(value: u32) -> ([u8; 5], usize) {
    if value == 0 {
        return ([0, 0, 0, 0, 0], 1);
    }

    let bytes = value.to_be_bytes();
    let mut start = 0;

    // Skip leading zeros, but add a 0x00 prefix if MSB is set (to avoid sign extension)
    while start < 3 && bytes[start] == 0 {
        start += 1;
    }

    let mut result = [0u8; 5];
    result[1..].copy_from_slice(&bytes);
    if bytes[start] & 0x80 != 0 {
        (result, 5 - start)
    } else {
        (result, 4 - start)
    }
}

/// Encode an unsigned 64-bit integer.
///
/// Returns a stack-allocated array and the number of valid bytes.
/// The valid bytes are at the END of the array.
#[inline]
fn encode_unsigned64_stack(value: u64) -> ([u8; 9], usize) {
    if value == 0 {
        return ([0; 9], 1);
    }

    let bytes = value.to_be_bytes();
    let mut start = 0;

    while start < 7 && bytes[start] == 0 {
        start += 1;
    }

    let mut result = [0u8; 9];
    result[1..].copy_from_slice(&bytes);
    if bytes[start] & 0x80 != 0 {
        (result, 9 - start)
    } else {
        (result, 8 - start)
    }
}
