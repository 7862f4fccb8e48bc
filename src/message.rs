//! Community-based message envelope (SNMPv1 and SNMPv2c).
//!
//! ```text
//! Message ::= SEQUENCE {
//!     version    INTEGER,
//!     community  OCTET STRING,
//!     data       PDUs
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::{Pdu, PduBody, TrapPdu};
use crate::smi::OctetString;
use crate::version::Version;

/// A v1/v2c message: version, community and one PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityMessage {
    /// SNMP version
    pub version: Version,
    /// Community string
    pub community: OctetString,
    /// Protocol data unit
    pub body: PduBody,
}

impl CommunityMessage {
    /// Create a new community message.
    pub fn new(version: Version, community: impl Into<OctetString>, body: impl Into<PduBody>) -> Self {
        Self {
            version,
            community: community.into(),
            body: body.into(),
        }
    }

    /// Create a V2c message carrying `pdu`.
    pub fn v2c(community: impl Into<OctetString>, pdu: Pdu) -> Self {
        Self::new(Version::V2c, community, pdu)
    }

    /// Create a V1 message carrying an SNMPv1 trap.
    pub fn v1_trap(community: impl Into<OctetString>, trap: TrapPdu) -> Self {
        Self::new(Version::V1, community, trap)
    }

    /// Encode to BER.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();

        buf.push_sequence(|buf| {
            self.body.encode(buf);
            buf.push_octet_string(self.community.as_bytes());
            buf.push_integer(self.version.as_i32());
        });

        buf.finish()
    }

    /// Decode a whole datagram.
    ///
    /// Trailing bytes after the message are rejected, as is an SNMPv1 trap
    /// inside an SNMPv2c envelope.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let msg = Self::decode_from(&mut decoder)?;
        decoder.expect_end()?;
        Ok(msg)
    }

    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;

        let at = seq.offset();
        let version_num = seq.read_integer()?;
        let version = Version::from_i32(version_num).ok_or_else(|| {
            tracing::debug!(target: "snmp_poller::ber", { offset = at, kind = %DecodeErrorKind::UnknownVersion(version_num) }, "decode error");
            Error::decode(at, DecodeErrorKind::UnknownVersion(version_num))
        })?;

        let community = OctetString::new(seq.read_octet_string()?);

        let body_at = seq.offset();
        if version == Version::V2c && seq.peek_tag() == Some(tag::pdu::TRAP_V1) {
            return Err(Error::decode(
                body_at,
                DecodeErrorKind::UnknownPduType(tag::pdu::TRAP_V1),
            ));
        }
        let body = PduBody::decode(&mut seq)?;
        seq.expect_end()?;

        Ok(CommunityMessage {
            version,
            community,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::pdu::{GenericTrap, PduType};
    use crate::smi::TimeTicks;
    use crate::varbind::VarBind;
    use std::net::Ipv4Addr;

    fn cold_start() -> TrapPdu {
        TrapPdu::new(
            oid!(1, 3, 6, 1, 4, 1, 5813),
            Ipv4Addr::new(192, 0, 2, 10),
            GenericTrap::ColdStart,
            0,
            TimeTicks::new(5),
            vec![],
        )
    }

    #[test]
    fn test_v1_trap_roundtrip() {
        let msg = CommunityMessage::v1_trap("public", cold_start());
        let decoded = CommunityMessage::decode(msg.encode()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.community.as_str(), Some("public"));
    }

    #[test]
    fn test_v2c_roundtrip() {
        let pdu = Pdu::trap_v2(
            123,
            TimeTicks::new(1),
            oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 1),
            vec![VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), "edge-1")],
        );
        let msg = CommunityMessage::v2c("private", pdu);
        let decoded = CommunityMessage::decode(msg.encode()).unwrap();
        assert_eq!(decoded.version, Version::V2c);
        assert_eq!(decoded.body.pdu_type(), PduType::TrapV2);
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let msg = CommunityMessage::v2c("public", Pdu::new(PduType::TrapV2, 1, vec![]));
        let mut bytes = msg.encode().to_vec();
        // SEQUENCE hdr (2) + INTEGER tag/len (2) -> version octet
        bytes[4] = 3;
        let err = CommunityMessage::decode(Bytes::from(bytes)).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::UnknownVersion(3),
                ..
            }
        ));
    }

    #[test]
    fn test_v1_trap_in_v2c_rejected() {
        let msg = CommunityMessage::new(Version::V2c, "public", cold_start());
        assert!(CommunityMessage::decode(msg.encode()).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let msg = CommunityMessage::v1_trap("public", cold_start());
        let mut bytes = msg.encode().to_vec();
        bytes.push(0x00);
        assert!(CommunityMessage::decode(Bytes::from(bytes)).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(CommunityMessage::decode(Bytes::from_static(b"not snmp")).is_err());
        assert!(CommunityMessage::decode(Bytes::new()).is_err());
    }
}
