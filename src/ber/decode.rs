//! BER decoding.
//!
//! The `parse_*` functions read one TLV starting at an offset in a borrowed
//! buffer and return the offset just past it, the tag byte that was read, and
//! the decoded content. They do not check the tag against an expected value:
//! callers that require a specific tag compare it themselves, which is how the
//! SMI types enforce their type-id contract.
//!
//! [`Decoder`] is a cursor over shared [`Bytes`] built on the same functions.

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use bytes::Bytes;

/// Read a tag and length at `offset`.
///
/// Returns `(content_offset, tag, content_length)`. The content is checked
/// to lie entirely within `data`.
pub fn parse_header(data: &[u8], offset: usize) -> Result<(usize, u8, usize)> {
    let tag = *data
        .get(offset)
        .ok_or_else(|| Error::decode(offset, DecodeErrorKind::TruncatedData))?;
    let (len, content) = decode_length(data, offset + 1)?;
    if len > data.len() - content {
        return Err(Error::decode(content, DecodeErrorKind::TlvOverflow));
    }
    Ok((content, tag, len))
}

/// Read a signed 32-bit integer.
pub fn parse_integer32(data: &[u8], offset: usize) -> Result<(usize, u8, i32)> {
    let (start, tag, len) = parse_header(data, offset)?;
    let content = &data[start..start + len];
    if content.is_empty() {
        return Err(Error::decode(start, DecodeErrorKind::ZeroLengthInteger));
    }
    if content.len() > 4 {
        return Err(Error::decode(start, DecodeErrorKind::IntegerOverflow));
    }
    Ok((start + len, tag, sign_extend(content) as i32))
}

/// Read an unsigned 32-bit integer.
///
/// Five content octets are accepted when the first is the 0x00 sign pad.
/// Shorter encodings with the high bit set are sign-extended and masked to
/// 32 bits, matching the permissive behavior of common agents.
pub fn parse_uinteger32(data: &[u8], offset: usize) -> Result<(usize, u8, u32)> {
    let (start, tag, len) = parse_header(data, offset)?;
    let content = &data[start..start + len];
    let value = match content {
        [] => return Err(Error::decode(start, DecodeErrorKind::ZeroLengthInteger)),
        [0, rest @ ..] if rest.len() == 4 => unsigned(rest),
        c if c.len() <= 4 => sign_extend(c) as u64 & 0xFFFF_FFFF,
        _ => return Err(Error::decode(start, DecodeErrorKind::IntegerOverflow)),
    };
    Ok((start + len, tag, value as u32))
}

/// Read an unsigned 64-bit integer.
pub fn parse_uinteger64(data: &[u8], offset: usize) -> Result<(usize, u8, u64)> {
    let (start, tag, len) = parse_header(data, offset)?;
    let content = &data[start..start + len];
    let value = match content {
        [] => return Err(Error::decode(start, DecodeErrorKind::ZeroLengthInteger)),
        [0, rest @ ..] if rest.len() == 8 => unsigned(rest),
        c if c.len() <= 8 => unsigned(c),
        _ => return Err(Error::decode(start, DecodeErrorKind::IntegerOverflow)),
    };
    Ok((start + len, tag, value))
}

/// Read a primitive byte string.
pub fn parse_string(data: &[u8], offset: usize) -> Result<(usize, u8, &[u8])> {
    let (start, tag, len) = parse_header(data, offset)?;
    // Net-snmp documents but does not parse constructed form; we follow suit.
    if tag == tag::universal::OCTET_STRING_CONSTRUCTED {
        return Err(Error::decode(offset, DecodeErrorKind::ConstructedOctetString));
    }
    Ok((start + len, tag, &data[start..start + len]))
}

/// Read an empty-content value.
pub fn parse_null(data: &[u8], offset: usize) -> Result<(usize, u8)> {
    let (start, tag, len) = parse_header(data, offset)?;
    if len != 0 {
        return Err(Error::decode(start, DecodeErrorKind::InvalidNull));
    }
    Ok((start, tag))
}

/// Read an object identifier.
pub fn parse_oid(data: &[u8], offset: usize) -> Result<(usize, u8, Oid)> {
    let (start, tag, len) = parse_header(data, offset)?;
    let oid = Oid::from_ber(&data[start..start + len])
        .map_err(|_| Error::decode(start, DecodeErrorKind::InvalidOidEncoding))?;
    Ok((start + len, tag, oid))
}

fn sign_extend(content: &[u8]) -> i64 {
    let init: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    content
        .iter()
        .fold(init, |acc, b| (acc << 8) | *b as i64)
}

fn unsigned(content: &[u8]) -> u64 {
    content.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}

fn expect_tag(offset: usize, expected: u8, actual: u8) -> Result<()> {
    if expected != actual {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::UnexpectedTag { expected, actual },
        ));
    }
    Ok(())
}

/// Cursor over BER-encoded data.
///
/// Sub-decoders for constructed values share the underlying buffer; error
/// offsets are always relative to the start of the original message.
#[derive(Debug, Clone)]
pub struct Decoder {
    data: Bytes,
    pos: usize,
    end: usize,
}

impl Decoder {
    /// Create a decoder over the whole buffer.
    pub fn new(data: Bytes) -> Self {
        let end = data.len();
        Self { data, pos: 0, end }
    }

    /// Create a decoder from a byte slice (copies).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Current offset from the start of the message.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Bytes left in this decoder's window.
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Whether the window is exhausted.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    fn window(&self) -> &[u8] {
        &self.data[..self.end]
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<u8> {
        self.window().get(self.pos).copied()
    }

    /// Read a tag and length header.
    pub fn read_header(&mut self) -> Result<(u8, usize)> {
        let (content, tag, len) = parse_header(self.window(), self.pos)?;
        self.pos = content;
        Ok((tag, len))
    }

    /// Read raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        if len > self.remaining() {
            return Err(Error::decode(self.pos, DecodeErrorKind::TruncatedData));
        }
        let out = self.data.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(out)
    }

    /// Create a decoder for the next `len` bytes and skip past them.
    pub fn sub_decoder(&mut self, len: usize) -> Result<Decoder> {
        if len > self.remaining() {
            return Err(Error::decode(self.pos, DecodeErrorKind::TlvOverflow));
        }
        let sub = Decoder {
            data: self.data.clone(),
            pos: self.pos,
            end: self.pos + len,
        };
        self.pos += len;
        Ok(sub)
    }

    /// Read a constructed value with the given tag.
    pub fn read_constructed(&mut self, expected: u8) -> Result<Decoder> {
        let at = self.pos;
        let (tag, len) = self.read_header()?;
        expect_tag(at, expected, tag)?;
        self.sub_decoder(len)
    }

    /// Read a SEQUENCE.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read an INTEGER.
    pub fn read_integer(&mut self) -> Result<i32> {
        self.read_integer_tagged(tag::universal::INTEGER)
    }

    /// Read a signed 32-bit integer with a specific tag.
    pub fn read_integer_tagged(&mut self, expected: u8) -> Result<i32> {
        let (next, tag, value) = parse_integer32(self.window(), self.pos)?;
        expect_tag(self.pos, expected, tag)?;
        self.pos = next;
        Ok(value)
    }

    /// Read an unsigned 32-bit integer with a specific tag.
    pub fn read_unsigned32(&mut self, expected: u8) -> Result<u32> {
        let (next, tag, value) = parse_uinteger32(self.window(), self.pos)?;
        expect_tag(self.pos, expected, tag)?;
        self.pos = next;
        Ok(value)
    }

    /// Read an unsigned 64-bit integer with a specific tag.
    pub fn read_unsigned64(&mut self, expected: u8) -> Result<u64> {
        let (next, tag, value) = parse_uinteger64(self.window(), self.pos)?;
        expect_tag(self.pos, expected, tag)?;
        self.pos = next;
        Ok(value)
    }

    /// Read a byte string with a specific tag.
    pub fn read_string(&mut self, expected: u8) -> Result<Bytes> {
        let (next, tag, len) = {
            let (next, tag, content) = parse_string(self.window(), self.pos)?;
            (next, tag, content.len())
        };
        expect_tag(self.pos, expected, tag)?;
        let out = self.data.slice(next - len..next);
        self.pos = next;
        Ok(out)
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        self.read_string(tag::universal::OCTET_STRING)
    }

    /// Read an empty-content value with a specific tag.
    pub fn read_empty(&mut self, expected: u8) -> Result<()> {
        let (next, tag) = parse_null(self.window(), self.pos)?;
        expect_tag(self.pos, expected, tag)?;
        self.pos = next;
        Ok(())
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        self.read_empty(tag::universal::NULL)
    }

    /// Read an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let (next, tag, oid) = parse_oid(self.window(), self.pos)?;
        expect_tag(self.pos, tag::universal::OBJECT_IDENTIFIER, tag)?;
        self.pos = next;
        Ok(oid)
    }

    /// Read an IpAddress.
    pub fn read_ip_address(&mut self) -> Result<[u8; 4]> {
        let at = self.pos;
        let data = self.read_string(tag::application::IP_ADDRESS)?;
        <[u8; 4]>::try_from(&data[..]).map_err(|_| {
            Error::decode(
                at,
                DecodeErrorKind::InvalidIpAddressLength { length: data.len() },
            )
        })
    }

    /// Fail if any bytes remain in this window.
    pub fn expect_end(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(Error::decode(
                self.pos,
                DecodeErrorKind::TrailingData {
                    remaining: self.remaining(),
                },
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::EncodeBuf;

    #[test]
    fn test_parse_integer32() {
        assert_eq!(parse_integer32(&[0x02, 0x01, 0x2A], 0).unwrap(), (3, 0x02, 42));
        assert_eq!(parse_integer32(&[0x02, 0x01, 0xFF], 0).unwrap(), (3, 0x02, -1));
        assert_eq!(
            parse_integer32(&[0x02, 0x02, 0xFF, 0x7F], 0).unwrap(),
            (4, 0x02, -129)
        );
        assert_eq!(
            parse_integer32(&[0x02, 0x04, 0x80, 0, 0, 0], 0).unwrap().2,
            i32::MIN
        );
    }

    #[test]
    fn test_parse_integer32_errors() {
        assert!(matches!(
            parse_integer32(&[0x02, 0x00], 0).unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::ZeroLengthInteger,
                ..
            }
        ));
        assert!(matches!(
            parse_integer32(&[0x02, 0x05, 1, 2, 3, 4, 5], 0).unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::IntegerOverflow,
                ..
            }
        ));
        assert!(matches!(
            parse_integer32(&[0x02, 0x03, 1], 0).unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::TlvOverflow,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_uinteger32_edges() {
        assert_eq!(parse_uinteger32(&[0x42, 0x01, 0x00], 0).unwrap(), (3, 0x42, 0));
        assert_eq!(
            parse_uinteger32(&[0x42, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF], 0).unwrap(),
            (7, 0x42, u32::MAX)
        );
        // Sign-extended short form is masked
        assert_eq!(parse_uinteger32(&[0x42, 0x01, 0xFF], 0).unwrap().2, u32::MAX);
        assert!(parse_uinteger32(&[0x42, 0x05, 0x01, 0, 0, 0, 0], 0).is_err());
    }

    #[test]
    fn test_parse_uinteger64() {
        let mut buf = EncodeBuf::new();
        buf.push_unsigned64(0x46, u64::MAX);
        let bytes = buf.finish();
        assert_eq!(parse_uinteger64(&bytes, 0).unwrap(), (11, 0x46, u64::MAX));
    }

    #[test]
    fn test_parse_string_and_null() {
        let data = [0x04, 0x03, b'a', b'b', b'c', 0x05, 0x00];
        let (next, tag, s) = parse_string(&data, 0).unwrap();
        assert_eq!((next, tag, s), (5, 0x04, &b"abc"[..]));
        assert_eq!(parse_null(&data, next).unwrap(), (7, 0x05));
        assert!(parse_null(&[0x05, 0x01, 0x00], 0).is_err());
        assert!(matches!(
            parse_string(&[0x24, 0x00], 0).unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::ConstructedOctetString,
                ..
            }
        ));
    }

    #[test]
    fn test_decoder_sequence() {
        let data = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        let mut decoder = Decoder::from_slice(&data);
        let mut seq = decoder.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), 1);
        assert_eq!(seq.read_integer().unwrap(), 2);
        assert!(seq.is_empty());
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_decoder_window_limits_reads() {
        // SEQUENCE of length 3 followed by bytes that belong to the parent
        let data = [0x30, 0x03, 0x02, 0x01, 0x07, 0x02, 0x01, 0x09];
        let mut decoder = Decoder::from_slice(&data);
        let mut seq = decoder.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), 7);
        assert!(seq.read_integer().is_err());
        assert_eq!(decoder.read_integer().unwrap(), 9);
    }

    #[test]
    fn test_decoder_tag_mismatch_offset() {
        let data = [0x30, 0x03, 0x04, 0x01, 0x41];
        let mut decoder = Decoder::from_slice(&data);
        let mut seq = decoder.read_sequence().unwrap();
        let err = seq.read_integer().unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                offset: 2,
                kind: DecodeErrorKind::UnexpectedTag {
                    expected: 0x02,
                    actual: 0x04
                }
            }
        ));
    }

    #[test]
    fn test_decoder_ip_address() {
        let data = [0x40, 0x04, 10, 0, 0, 1];
        let mut decoder = Decoder::from_slice(&data);
        assert_eq!(decoder.read_ip_address().unwrap(), [10, 0, 0, 1]);

        let data = [0x40, 0x03, 10, 0, 0];
        let mut decoder = Decoder::from_slice(&data);
        assert!(matches!(
            decoder.read_ip_address().unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::InvalidIpAddressLength { length: 3 },
                ..
            }
        ));
    }

    #[test]
    fn test_expect_end() {
        let mut decoder = Decoder::from_slice(&[0x05, 0x00, 0xFF]);
        decoder.read_null().unwrap();
        assert!(decoder.expect_end().is_err());
    }
}
