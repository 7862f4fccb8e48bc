//! SNMP SMI syntax types.
//!
//! Each syntax implements [`SmiSyntax`]: a fixed one-byte type identifier
//! plus offset-based BER encode/decode over caller-supplied buffers.
//! [`SmiValue`] is the tagged union carried in variable bindings.

mod octets;
mod unsigned;

use std::fmt;
use std::net::Ipv4Addr;

use bytes::Bytes;

pub use octets::{IpAddress, Null, OctetString, Opaque};
pub use unsigned::{Counter32, Counter64, Gauge32, Int32, TimeTicks, UInt32};

use crate::ber::{self, Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// Contract shared by every SMI syntax.
///
/// `decode_asn` fails with [`DecodeErrorKind::UnexpectedTag`] when the tag at
/// `offset` is not [`Self::TYPE_ID`]; no syntax accepts another's encoding.
pub trait SmiSyntax: Clone + fmt::Debug {
    /// The BER tag for this syntax.
    const TYPE_ID: u8;

    /// The BER tag for this syntax.
    fn type_id(&self) -> u8 {
        Self::TYPE_ID
    }

    /// Encode at `offset`, returning the offset just past the encoding.
    fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize>;

    /// Decode at `offset`, returning the offset just past the value.
    fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)>
    where
        Self: Sized;

    /// Independent deep copy.
    fn duplicate(&self) -> Self
    where
        Self: Sized,
    {
        self.clone()
    }
}

/// Check the tag at `offset` before any content is interpreted.
pub(crate) fn check_tag(buf: &[u8], offset: usize, expected: u8) -> Result<()> {
    let actual = *buf
        .get(offset)
        .ok_or_else(|| Error::decode(offset, DecodeErrorKind::TruncatedData))?;
    if expected != actual {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::UnexpectedTag { expected, actual },
        ));
    }
    Ok(())
}

/// A value of any SMI syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SmiValue {
    Int32(Int32),
    Unsigned32(UInt32),
    Counter32(Counter32),
    TimeTicks(TimeTicks),
    Counter64(Counter64),
    OctetString(OctetString),
    Opaque(Opaque),
    IpAddress(IpAddress),
    ObjectId(Oid),
    Null,
    /// SNMPv2 exception: no such object.
    NoSuchObject,
    /// SNMPv2 exception: no such instance.
    NoSuchInstance,
    /// SNMPv2 exception: end of MIB view.
    EndOfMibView,
}

impl SmiValue {
    /// The BER tag of the contained syntax.
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Int32(_) => Int32::TYPE_ID,
            Self::Unsigned32(_) => UInt32::TYPE_ID,
            Self::Counter32(_) => Counter32::TYPE_ID,
            Self::TimeTicks(_) => TimeTicks::TYPE_ID,
            Self::Counter64(_) => Counter64::TYPE_ID,
            Self::OctetString(_) => OctetString::TYPE_ID,
            Self::Opaque(_) => Opaque::TYPE_ID,
            Self::IpAddress(_) => IpAddress::TYPE_ID,
            Self::ObjectId(_) => Oid::TYPE_ID,
            Self::Null => Null::TYPE_ID,
            Self::NoSuchObject => tag::context::NO_SUCH_OBJECT,
            Self::NoSuchInstance => tag::context::NO_SUCH_INSTANCE,
            Self::EndOfMibView => tag::context::END_OF_MIB_VIEW,
        }
    }

    /// Whether this is one of the SNMPv2 exception values.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView
        )
    }

    /// Independent deep copy.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Encode at `offset`, returning the offset just past the encoding.
    pub fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        match self {
            Self::Int32(v) => v.encode_asn(buf, offset),
            Self::Unsigned32(v) => v.encode_asn(buf, offset),
            Self::Counter32(v) => v.encode_asn(buf, offset),
            Self::TimeTicks(v) => v.encode_asn(buf, offset),
            Self::Counter64(v) => v.encode_asn(buf, offset),
            Self::OctetString(v) => v.encode_asn(buf, offset),
            Self::Opaque(v) => v.encode_asn(buf, offset),
            Self::IpAddress(v) => v.encode_asn(buf, offset),
            Self::ObjectId(v) => v.encode_asn(buf, offset),
            Self::Null | Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView => {
                ber::build_null(buf, offset, self.type_id())
            }
        }
    }

    /// Decode at `offset`, choosing the syntax from the tag.
    pub fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)> {
        let found = *buf
            .get(offset)
            .ok_or_else(|| Error::decode(offset, DecodeErrorKind::TruncatedData))?;
        match found {
            tag::universal::INTEGER => wrap(Int32::decode_asn(buf, offset), Self::Int32),
            tag::application::UNSIGNED32 => {
                wrap(UInt32::decode_asn(buf, offset), Self::Unsigned32)
            }
            tag::application::COUNTER32 => {
                wrap(Counter32::decode_asn(buf, offset), Self::Counter32)
            }
            tag::application::TIMETICKS => {
                wrap(TimeTicks::decode_asn(buf, offset), Self::TimeTicks)
            }
            tag::application::COUNTER64 => {
                wrap(Counter64::decode_asn(buf, offset), Self::Counter64)
            }
            tag::universal::OCTET_STRING => {
                wrap(OctetString::decode_asn(buf, offset), Self::OctetString)
            }
            tag::application::OPAQUE => wrap(Opaque::decode_asn(buf, offset), Self::Opaque),
            tag::application::IP_ADDRESS => {
                wrap(IpAddress::decode_asn(buf, offset), Self::IpAddress)
            }
            tag::universal::OBJECT_IDENTIFIER => {
                wrap(Oid::decode_asn(buf, offset), Self::ObjectId)
            }
            tag::universal::NULL => wrap(Null::decode_asn(buf, offset), |_| Self::Null),
            tag::context::NO_SUCH_OBJECT => {
                let (next, _) = ber::parse_null(buf, offset)?;
                Ok((next, Self::NoSuchObject))
            }
            tag::context::NO_SUCH_INSTANCE => {
                let (next, _) = ber::parse_null(buf, offset)?;
                Ok((next, Self::NoSuchInstance))
            }
            tag::context::END_OF_MIB_VIEW => {
                let (next, _) = ber::parse_null(buf, offset)?;
                Ok((next, Self::EndOfMibView))
            }
            other => Err(Error::decode(
                offset,
                DecodeErrorKind::UnknownValueType(other),
            )),
        }
    }

    /// Encode into a reverse buffer.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Self::Int32(v) => buf.push_integer(v.value()),
            Self::Unsigned32(v) => buf.push_unsigned32(UInt32::TYPE_ID, v.value()),
            Self::Counter32(v) => buf.push_unsigned32(Counter32::TYPE_ID, v.value()),
            Self::TimeTicks(v) => buf.push_unsigned32(TimeTicks::TYPE_ID, v.value()),
            Self::Counter64(v) => buf.push_unsigned64(Counter64::TYPE_ID, v.value()),
            Self::OctetString(v) => buf.push_octet_string(v.as_bytes()),
            Self::Opaque(v) => buf.push_string(Opaque::TYPE_ID, v.as_bytes()),
            Self::IpAddress(v) => buf.push_ip_address(v.addr().octets()),
            Self::ObjectId(v) => buf.push_oid(v),
            Self::Null | Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView => {
                buf.push_empty(self.type_id())
            }
        }
    }

    /// Decode from a cursor, choosing the syntax from the tag.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let at = decoder.offset();
        let found = decoder
            .peek_tag()
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::TruncatedData))?;
        let value = match found {
            tag::universal::INTEGER => Self::Int32(Int32(decoder.read_integer()?)),
            tag::application::UNSIGNED32 => {
                Self::Unsigned32(UInt32::new(decoder.read_unsigned32(found)?))
            }
            tag::application::COUNTER32 => {
                Self::Counter32(Counter32::new(decoder.read_unsigned32(found)?))
            }
            tag::application::TIMETICKS => {
                Self::TimeTicks(TimeTicks::new(decoder.read_unsigned32(found)?))
            }
            tag::application::COUNTER64 => {
                Self::Counter64(Counter64(decoder.read_unsigned64(found)?))
            }
            tag::universal::OCTET_STRING => {
                Self::OctetString(OctetString::new(decoder.read_string(found)?))
            }
            tag::application::OPAQUE => Self::Opaque(Opaque::new(decoder.read_string(found)?)),
            tag::application::IP_ADDRESS => {
                Self::IpAddress(IpAddress(Ipv4Addr::from(decoder.read_ip_address()?)))
            }
            tag::universal::OBJECT_IDENTIFIER => Self::ObjectId(decoder.read_oid()?),
            tag::universal::NULL => {
                decoder.read_null()?;
                Self::Null
            }
            tag::context::NO_SUCH_OBJECT => {
                decoder.read_empty(found)?;
                Self::NoSuchObject
            }
            tag::context::NO_SUCH_INSTANCE => {
                decoder.read_empty(found)?;
                Self::NoSuchInstance
            }
            tag::context::END_OF_MIB_VIEW => {
                decoder.read_empty(found)?;
                Self::EndOfMibView
            }
            other => {
                return Err(Error::decode(
                    at,
                    DecodeErrorKind::UnknownValueType(other),
                ));
            }
        };
        Ok(value)
    }

    /// Integer value, if this is an `Integer32`.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(v) => Some(v.value()),
            _ => None,
        }
    }

    /// Value of any 32-bit unsigned syntax.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Unsigned32(v) => Some(v.value()),
            Self::Counter32(v) => Some(v.value()),
            Self::TimeTicks(v) => Some(v.value()),
            _ => None,
        }
    }

    /// Value of any unsigned syntax, widened to 64 bits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Counter64(v) => Some(v.value()),
            other => other.as_u32().map(u64::from),
        }
    }

    /// Payload of the octet-family syntaxes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::OctetString(v) => Some(v.as_bytes()),
            Self::Opaque(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    /// The OID, if this is an `OBJECT IDENTIFIER`.
    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Self::ObjectId(oid) => Some(oid),
            _ => None,
        }
    }
}

fn wrap<T>(decoded: Result<(usize, T)>, f: impl FnOnce(T) -> SmiValue) -> Result<(usize, SmiValue)> {
    decoded.map(|(next, v)| (next, f(v)))
}

impl fmt::Display for SmiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32(v) => write!(f, "{}", v),
            Self::Unsigned32(v) => write!(f, "{}", v),
            Self::Counter32(v) => write!(f, "{}", v),
            Self::TimeTicks(v) => write!(f, "{}", v),
            Self::Counter64(v) => write!(f, "{}", v),
            Self::OctetString(v) => match v.as_str() {
                Some(s) if s.chars().all(|c| !c.is_control() || c.is_whitespace()) => {
                    f.write_str(s)
                }
                _ => write!(f, "{}", v),
            },
            Self::Opaque(v) => write!(f, "{}", v),
            Self::IpAddress(v) => write!(f, "{}", v),
            Self::ObjectId(v) => write!(f, "{}", v),
            Self::Null => f.write_str("NULL"),
            Self::NoSuchObject => f.write_str("noSuchObject"),
            Self::NoSuchInstance => f.write_str("noSuchInstance"),
            Self::EndOfMibView => f.write_str("endOfMibView"),
        }
    }
}

impl From<i32> for SmiValue {
    fn from(v: i32) -> Self {
        Self::Int32(Int32(v))
    }
}

impl From<u64> for SmiValue {
    fn from(v: u64) -> Self {
        Self::Counter64(Counter64(v))
    }
}

impl From<&str> for SmiValue {
    fn from(s: &str) -> Self {
        Self::OctetString(OctetString::from(s))
    }
}

impl From<Bytes> for SmiValue {
    fn from(data: Bytes) -> Self {
        Self::OctetString(OctetString::new(data))
    }
}

impl From<Oid> for SmiValue {
    fn from(oid: Oid) -> Self {
        Self::ObjectId(oid)
    }
}

impl From<Ipv4Addr> for SmiValue {
    fn from(addr: Ipv4Addr) -> Self {
        Self::IpAddress(IpAddress(addr))
    }
}

impl From<UInt32> for SmiValue {
    fn from(v: UInt32) -> Self {
        Self::Unsigned32(v)
    }
}

impl From<Counter32> for SmiValue {
    fn from(v: Counter32) -> Self {
        Self::Counter32(v)
    }
}

impl From<TimeTicks> for SmiValue {
    fn from(v: TimeTicks) -> Self {
        Self::TimeTicks(v)
    }
}
