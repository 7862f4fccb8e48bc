//! Byte-payload syntaxes (`OCTET STRING`, `Opaque`, `IpAddress`) and `NULL`.

use std::fmt;
use std::net::Ipv4Addr;

use bytes::Bytes;

use super::{SmiSyntax, check_tag};
use crate::ber::{self, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// Render bytes as uppercase hex pairs, each followed by a space.
pub(crate) fn write_hex(f: &mut fmt::Formatter<'_>, data: &[u8]) -> fmt::Result {
    for b in data {
        write!(f, "{:02X} ", b)?;
    }
    Ok(())
}

macro_rules! octet_syntax {
    ($(#[$meta:meta])* $name:ident, $tag:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(Bytes);

        impl $name {
            /// Create from any byte container.
            pub fn new(data: impl Into<Bytes>) -> Self {
                Self(data.into())
            }

            /// The payload.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// The payload as shared [`Bytes`].
            pub fn bytes(&self) -> &Bytes {
                &self.0
            }

            /// Payload length.
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Whether the payload is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Replace the payload.
            pub fn set_value(&mut self, data: impl Into<Bytes>) {
                self.0 = data.into();
            }
        }

        impl SmiSyntax for $name {
            const TYPE_ID: u8 = $tag;

            fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
                ber::build_string(buf, offset, Self::TYPE_ID, &self.0)
            }

            fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)> {
                check_tag(buf, offset, Self::TYPE_ID)?;
                let (next, _, data) = ber::parse_string(buf, offset)?;
                Ok((next, Self(Bytes::copy_from_slice(data))))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(Bytes::copy_from_slice(s.as_bytes()))
            }
        }

        impl From<&[u8]> for $name {
            fn from(data: &[u8]) -> Self {
                Self(Bytes::copy_from_slice(data))
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(data: Vec<u8>) -> Self {
                Self(Bytes::from(data))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_hex(f, &self.0)
            }
        }
    };
}

octet_syntax!(
    /// `OCTET STRING` (tag 0x04).
    OctetString,
    tag::universal::OCTET_STRING
);

octet_syntax!(
    /// `Opaque` (tag 0x44): arbitrary pre-encoded data.
    Opaque,
    tag::application::OPAQUE
);

impl OctetString {
    /// The payload as UTF-8 text, if it is valid.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

/// `IpAddress` (tag 0x40), always four octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpAddress(pub Ipv4Addr);

impl IpAddress {
    /// The address.
    pub fn addr(&self) -> Ipv4Addr {
        self.0
    }
}

impl Default for IpAddress {
    fn default() -> Self {
        Self(Ipv4Addr::UNSPECIFIED)
    }
}

impl SmiSyntax for IpAddress {
    const TYPE_ID: u8 = tag::application::IP_ADDRESS;

    fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        ber::build_string(buf, offset, Self::TYPE_ID, &self.0.octets())
    }

    fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)> {
        check_tag(buf, offset, Self::TYPE_ID)?;
        let (next, _, data) = ber::parse_string(buf, offset)?;
        let octets = <[u8; 4]>::try_from(data).map_err(|_| {
            Error::decode(
                offset,
                DecodeErrorKind::InvalidIpAddressLength { length: data.len() },
            )
        })?;
        Ok((next, Self(Ipv4Addr::from(octets))))
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `NULL` (tag 0x05).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Null;

impl SmiSyntax for Null {
    const TYPE_ID: u8 = tag::universal::NULL;

    fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        ber::build_null(buf, offset, Self::TYPE_ID)
    }

    fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)> {
        check_tag(buf, offset, Self::TYPE_ID)?;
        let (next, _) = ber::parse_null(buf, offset)?;
        Ok((next, Null))
    }
}

impl fmt::Display for Null {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NULL")
    }
}

impl SmiSyntax for Oid {
    const TYPE_ID: u8 = tag::universal::OBJECT_IDENTIFIER;

    fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        ber::build_oid(buf, offset, Self::TYPE_ID, self)
    }

    fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)> {
        check_tag(buf, offset, Self::TYPE_ID)?;
        let (next, _, oid) = ber::parse_oid(buf, offset)?;
        Ok((next, oid))
    }
}
