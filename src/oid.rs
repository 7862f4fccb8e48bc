//! Object identifier type.
//!
//! OIDs are stored inline for the common case (up to 16 arcs) using
//! [`SmallVec`], so most enterprise and trap OIDs never allocate.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{Error, OidErrorKind, Result};

/// Maximum number of arcs accepted (RFC 2578 Section 3.5).
pub const MAX_OID_LEN: usize = 128;

/// Construct an [`Oid`] from literal arcs.
///
/// ```
/// use snmp_poller::oid;
///
/// let sys_uptime = oid!(1, 3, 6, 1, 2, 1, 1, 3, 0);
/// assert_eq!(sys_uptime.to_string(), "1.3.6.1.2.1.1.3.0");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}

/// SNMP object identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create from any iterator of arcs.
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// The arcs of this OID.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Whether the OID has no arcs.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Whether `prefix` is a prefix of this OID (an OID is a prefix of itself).
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.starts_with(&prefix.arcs)
    }

    /// Return a new OID with `arc` appended.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Check the X.690 constraints on the first two arcs and the arc count.
    pub fn validate(&self) -> Result<()> {
        if self.arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                count: self.arcs.len(),
                max: MAX_OID_LEN,
            }));
        }
        if let Some(&first) = self.arcs.first() {
            if first > 2 {
                return Err(Error::invalid_oid(OidErrorKind::InvalidFirstArc(first)));
            }
            if let Some(&second) = self.arcs.get(1)
                && first < 2
                && second >= 40
            {
                return Err(Error::invalid_oid(OidErrorKind::InvalidSecondArc {
                    first,
                    second,
                }));
            }
        }
        Ok(())
    }

    /// Encode the OID content octets (without tag and length).
    ///
    /// An empty OID encodes as zero content octets; a single-arc OID encodes
    /// its arc as the combined first subidentifier.
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut out = SmallVec::new();
        let (first, rest) = match self.arcs.as_slice() {
            [] => return out,
            [a] => (*a as u64 * 40, &[][..]),
            [a, b, rest @ ..] => (*a as u64 * 40 + *b as u64, rest),
        };
        push_subidentifier(&mut out, first);
        for arc in rest {
            push_subidentifier(&mut out, *arc as u64);
        }
        out
    }

    /// Decode OID content octets (without tag and length).
    pub fn from_ber(content: &[u8]) -> Result<Self> {
        let mut arcs: SmallVec<[u32; 16]> = SmallVec::new();
        let mut acc: u64 = 0;
        let mut in_progress = false;

        for &byte in content {
            // Leading 0x80 is a non-minimal encoding (X.690 8.19.2)
            if !in_progress && byte == 0x80 {
                return Err(Error::invalid_oid(OidErrorKind::InvalidArc));
            }
            acc = (acc << 7) | (byte & 0x7F) as u64;
            if acc > u32::MAX as u64 + 80 {
                return Err(Error::invalid_oid(OidErrorKind::InvalidArc));
            }
            in_progress = byte & 0x80 != 0;
            if in_progress {
                continue;
            }

            if arcs.is_empty() {
                let (a, b) = match acc {
                    0..40 => (0, acc),
                    40..80 => (1, acc - 40),
                    _ => (2, acc - 80),
                };
                arcs.push(a as u32);
                arcs.push(u32::try_from(b).map_err(|_| Error::invalid_oid(OidErrorKind::InvalidArc))?);
            } else {
                arcs.push(u32::try_from(acc).map_err(|_| Error::invalid_oid(OidErrorKind::InvalidArc))?);
            }
            if arcs.len() > MAX_OID_LEN {
                return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                    count: arcs.len(),
                    max: MAX_OID_LEN,
                }));
            }
            acc = 0;
        }

        if in_progress {
            return Err(Error::invalid_oid(OidErrorKind::InvalidArc));
        }
        Ok(Oid { arcs })
    }
}

fn push_subidentifier(out: &mut SmallVec<[u8; 64]>, value: u64) {
    let mut tmp = [0u8; 10];
    let mut i = tmp.len();
    let mut v = value;
    loop {
        i -= 1;
        tmp[i] = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    let last = tmp.len() - 1;
    for (idx, byte) in tmp.iter().enumerate().skip(i) {
        out.push(if idx == last { *byte } else { *byte | 0x80 });
    }
}

impl FromStr for Oid {
    type Err = Error;

    /// Parse dotted notation. A single leading dot is accepted.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Err(Error::invalid_oid_with_input(OidErrorKind::Empty, s));
        }
        let arcs = trimmed
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<std::result::Result<SmallVec<[u32; 16]>, _>>()
            .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;
        let oid = Oid { arcs };
        oid.validate().map_err(|e| match e {
            Error::InvalidOid { kind, .. } => Error::invalid_oid_with_input(kind, s),
            other => other,
        })?;
        Ok(oid)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let oid: Oid = "1.3.6.1.4.1.5813.1".parse().unwrap();
        assert_eq!(oid, oid!(1, 3, 6, 1, 4, 1, 5813, 1));
        assert_eq!(oid.to_string(), "1.3.6.1.4.1.5813.1");
        let dotted: Oid = ".1.3.6".parse().unwrap();
        assert_eq!(dotted, oid!(1, 3, 6));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "".parse::<Oid>().unwrap_err(),
            Error::InvalidOid {
                kind: OidErrorKind::Empty,
                ..
            }
        ));
        assert!(matches!(
            "1.3.x".parse::<Oid>().unwrap_err(),
            Error::InvalidOid {
                kind: OidErrorKind::InvalidArc,
                ..
            }
        ));
        assert!(matches!(
            "3.1".parse::<Oid>().unwrap_err(),
            Error::InvalidOid {
                kind: OidErrorKind::InvalidFirstArc(3),
                ..
            }
        ));
        assert!(matches!(
            "1.40".parse::<Oid>().unwrap_err(),
            Error::InvalidOid {
                kind: OidErrorKind::InvalidSecondArc { first: 1, second: 40 },
                input: Some(_),
            }
        ));
    }

    #[test]
    fn test_ber_known_encoding() {
        // 1.3.6.1.4.1.5813 -> 2B 06 01 04 01 AD 35
        let oid = oid!(1, 3, 6, 1, 4, 1, 5813);
        assert_eq!(
            oid.to_ber_smallvec().as_slice(),
            &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xAD, 0x35]
        );
        assert_eq!(Oid::from_ber(&oid.to_ber_smallvec()).unwrap(), oid);
    }

    #[test]
    fn test_ber_large_arcs() {
        let oid = oid!(2, 999, u32::MAX);
        let ber = oid.to_ber_smallvec();
        assert_eq!(Oid::from_ber(&ber).unwrap(), oid);
    }

    #[test]
    fn test_from_ber_rejects_truncated_and_padded() {
        assert!(Oid::from_ber(&[0x2B, 0x86]).is_err());
        assert!(Oid::from_ber(&[0x2B, 0x80, 0x01]).is_err());
        assert_eq!(Oid::from_ber(&[]).unwrap(), Oid::default());
    }

    #[test]
    fn test_starts_with_and_child() {
        let base = oid!(1, 3, 6, 1, 6, 3, 1, 1, 5);
        let link_down = base.child(3);
        assert!(link_down.starts_with(&base));
        assert!(!base.starts_with(&link_down));
        assert_eq!(link_down.len(), 10);
    }

    #[test]
    fn test_ordering_is_arc_wise() {
        assert!(oid!(1, 3, 6, 1, 2) < oid!(1, 3, 6, 1, 2, 1));
        assert!(oid!(1, 3, 6, 1, 2, 1) < oid!(1, 3, 6, 1, 10));
    }
}
