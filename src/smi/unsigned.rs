//! Integer syntaxes: the 32-bit unsigned family, `Integer32` and `Counter64`.
//!
//! `Unsigned32`, `Counter32` and `TimeTicks` share one representation. Every
//! assignment keeps only the low 32 bits of its input, so out-of-range values
//! wrap instead of failing.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::{SmiSyntax, check_tag};
use crate::ber::{self, tag};
use crate::error::{Error, Result};

const MASK32: i64 = 0xFFFF_FFFF;

macro_rules! unsigned32_syntax {
    ($(#[$meta:meta])* $name:ident, $tag:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u32);

        impl $name {
            /// Create from a 32-bit value.
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Create from any signed value, keeping the low 32 bits.
            pub const fn from_i64(value: i64) -> Self {
                Self((value & MASK32) as u32)
            }

            /// Current value.
            pub const fn value(&self) -> u32 {
                self.0
            }

            /// Assign from any signed value, keeping the low 32 bits.
            pub fn set_value(&mut self, value: i64) {
                self.0 = (value & MASK32) as u32;
            }
        }

        impl SmiSyntax for $name {
            const TYPE_ID: u8 = $tag;

            fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
                ber::build_uinteger32(buf, offset, Self::TYPE_ID, self.0)
            }

            fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)> {
                check_tag(buf, offset, Self::TYPE_ID)?;
                let (next, _, value) = ber::parse_uinteger32(buf, offset)?;
                Ok((next, Self(value)))
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            /// Parse decimal text.
            ///
            /// Negative values are rejected; values wider than 32 bits are masked.
            fn from_str(s: &str) -> Result<Self> {
                parse_masked(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

unsigned32_syntax!(
    /// `Unsigned32` / `Gauge32` (tag 0x42).
    UInt32,
    tag::application::UNSIGNED32
);

unsigned32_syntax!(
    /// `Counter32` (tag 0x41).
    Counter32,
    tag::application::COUNTER32
);

unsigned32_syntax!(
    /// `TimeTicks` (tag 0x43), hundredths of a second.
    TimeTicks,
    tag::application::TIMETICKS
);

/// `Gauge32` is encoded identically to `Unsigned32`.
pub type Gauge32 = UInt32;

impl TimeTicks {
    /// The tick count as a duration.
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0 as u64 * 10)
    }
}

fn parse_masked(s: &str) -> Result<u32> {
    let trimmed = s.trim();
    let value: i64 = trimmed.parse().map_err(|_| Error::NumberFormat {
        input: trimmed.into(),
    })?;
    if value < 0 {
        return Err(Error::invalid_argument(format!(
            "unsigned value cannot be negative: {}",
            value
        )));
    }
    Ok((value & MASK32) as u32)
}

/// `Integer32` (tag 0x02).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Int32(pub i32);

impl Int32 {
    /// Current value.
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl SmiSyntax for Int32 {
    const TYPE_ID: u8 = tag::universal::INTEGER;

    fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        ber::build_integer32(buf, offset, Self::TYPE_ID, self.0)
    }

    fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)> {
        check_tag(buf, offset, Self::TYPE_ID)?;
        let (next, _, value) = ber::parse_integer32(buf, offset)?;
        Ok((next, Self(value)))
    }
}

impl fmt::Display for Int32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Counter64` (tag 0x46).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Counter64(pub u64);

impl Counter64 {
    /// Current value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl SmiSyntax for Counter64 {
    const TYPE_ID: u8 = tag::application::COUNTER64;

    fn encode_asn(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        ber::build_uinteger64(buf, offset, Self::TYPE_ID, self.0)
    }

    fn decode_asn(buf: &[u8], offset: usize) -> Result<(usize, Self)> {
        check_tag(buf, offset, Self::TYPE_ID)?;
        let (next, _, value) = ber::parse_uinteger64(buf, offset)?;
        Ok((next, Self(value)))
    }
}

impl fmt::Display for Counter64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;

    fn roundtrip<T: SmiSyntax + PartialEq>(value: T) -> T {
        let mut buf = [0u8; 16];
        let end = value.encode_asn(&mut buf, 3).unwrap();
        let (next, decoded) = T::decode_asn(&buf, 3).unwrap();
        assert_eq!(next, end);
        decoded
    }

    #[test]
    fn test_masking_on_assignment() {
        assert_eq!(UInt32::from_i64(-1).value(), 0xFFFF_FFFF);
        assert_eq!(UInt32::from_i64(0x1_0000_0005).value(), 5);

        let mut ticks = TimeTicks::default();
        ticks.set_value(0x2_0000_0000 + 42);
        assert_eq!(ticks.value(), 42);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("123".parse::<Counter32>().unwrap().value(), 123);
        assert_eq!(" 4294967296 ".parse::<UInt32>().unwrap().value(), 0);
        assert!(matches!(
            "-1".parse::<UInt32>().unwrap_err(),
            Error::InvalidArgument { .. }
        ));
        assert!(matches!(
            "twelve".parse::<UInt32>().unwrap_err(),
            Error::NumberFormat { .. }
        ));
    }

    #[test]
    fn test_extremes_roundtrip() {
        for v in [0u32, 1, 127, 128, 0x7FFF_FFFF, 0x8000_0000, u32::MAX] {
            assert_eq!(roundtrip(UInt32::new(v)).value(), v);
            assert_eq!(roundtrip(Counter32::new(v)).value(), v);
            assert_eq!(roundtrip(TimeTicks::new(v)).value(), v);
        }
        assert_eq!(roundtrip(Int32(i32::MIN)), Int32(i32::MIN));
        assert_eq!(roundtrip(Counter64(u64::MAX)), Counter64(u64::MAX));
    }

    #[test]
    fn test_decode_rejects_other_tag() {
        let mut buf = [0u8; 8];
        let end = Counter32::new(7).encode_asn(&mut buf, 0).unwrap();
        assert_eq!(&buf[..end], &[0x41, 0x01, 0x07]);

        let err = UInt32::decode_asn(&buf, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                offset: 0,
                kind: DecodeErrorKind::UnexpectedTag {
                    expected: 0x42,
                    actual: 0x41
                }
            }
        ));
        assert!(TimeTicks::decode_asn(&buf, 0).is_err());
        assert!(Int32::decode_asn(&buf, 0).is_err());
        assert!(Counter64::decode_asn(&buf, 0).is_err());
    }

    #[test]
    fn test_type_ids() {
        assert_eq!(UInt32::new(0).type_id(), 0x42);
        assert_eq!(Gauge32::TYPE_ID, 0x42);
        assert_eq!(Counter32::new(0).type_id(), 0x41);
        assert_eq!(TimeTicks::new(0).type_id(), 0x43);
        assert_eq!(Int32(0).type_id(), 0x02);
        assert_eq!(Counter64(0).type_id(), 0x46);
    }

    #[test]
    fn test_timeticks_duration() {
        assert_eq!(TimeTicks::new(150).as_duration(), Duration::from_millis(1500));
    }
}
