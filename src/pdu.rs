//! SNMP Protocol Data Units (PDUs).
//!
//! [`Pdu`] covers every request/response shaped PDU, including SNMPv2 traps
//! and informs. [`TrapPdu`] is the structurally different SNMPv1 trap.

use std::net::Ipv4Addr;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::smi::{SmiValue, TimeTicks};
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// sysUpTime.0, the first varbind of every SNMPv2 notification.
pub const SYS_UPTIME_OID: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 3, 0];
/// snmpTrapOID.0, the second varbind of every SNMPv2 notification.
pub const SNMP_TRAP_OID: [u32; 11] = [1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0];
/// snmpTraps, the parent of the six generic trap OIDs.
pub const SNMP_TRAPS: [u32; 9] = [1, 3, 6, 1, 6, 3, 1, 1, 5];

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
    SetRequest = 0xA3,
    TrapV1 = 0xA4,
    GetBulkRequest = 0xA5,
    InformRequest = 0xA6,
    TrapV2 = 0xA7,
    Report = 0xA8,
}

impl PduType {
    /// Create from tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::SET_REQUEST => Some(Self::SetRequest),
            tag::pdu::TRAP_V1 => Some(Self::TrapV1),
            tag::pdu::GET_BULK_REQUEST => Some(Self::GetBulkRequest),
            tag::pdu::INFORM_REQUEST => Some(Self::InformRequest),
            tag::pdu::TRAP_V2 => Some(Self::TrapV2),
            tag::pdu::REPORT => Some(Self::Report),
            _ => None,
        }
    }

    /// Get the tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetRequest => write!(f, "GetRequest"),
            Self::GetNextRequest => write!(f, "GetNextRequest"),
            Self::Response => write!(f, "Response"),
            Self::SetRequest => write!(f, "SetRequest"),
            Self::TrapV1 => write!(f, "TrapV1"),
            Self::GetBulkRequest => write!(f, "GetBulkRequest"),
            Self::InformRequest => write!(f, "InformRequest"),
            Self::TrapV2 => write!(f, "TrapV2"),
            Self::Report => write!(f, "Report"),
        }
    }
}

/// Generic PDU structure for request/response operations and v2 notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    /// PDU type
    pub pdu_type: PduType,
    /// Request ID for correlating requests and responses
    pub request_id: i32,
    /// Error status (0 for requests, error code for responses)
    pub error_status: i32,
    /// Error index (1-based index of problematic varbind)
    pub error_index: i32,
    /// Variable bindings
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// Create a PDU with zero error fields.
    pub fn new(pdu_type: PduType, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Create an SNMPv2 trap.
    ///
    /// `sysUpTime.0` and `snmpTrapOID.0` are prepended to `varbinds`.
    pub fn trap_v2(request_id: i32, uptime: TimeTicks, trap_oid: Oid, varbinds: Vec<VarBind>) -> Self {
        Self::notification(PduType::TrapV2, request_id, uptime, trap_oid, varbinds)
    }

    /// Create an InformRequest.
    pub fn inform(request_id: i32, uptime: TimeTicks, trap_oid: Oid, varbinds: Vec<VarBind>) -> Self {
        Self::notification(PduType::InformRequest, request_id, uptime, trap_oid, varbinds)
    }

    fn notification(
        pdu_type: PduType,
        request_id: i32,
        uptime: TimeTicks,
        trap_oid: Oid,
        varbinds: Vec<VarBind>,
    ) -> Self {
        let mut all = Vec::with_capacity(varbinds.len() + 2);
        all.push(VarBind::new(Oid::from_slice(&SYS_UPTIME_OID), uptime));
        all.push(VarBind::new(Oid::from_slice(&SNMP_TRAP_OID), trap_oid));
        all.extend(varbinds);
        Self::new(pdu_type, request_id, all)
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let at = decoder.offset();
        let (found, len) = decoder.read_header()?;
        let pdu_type = PduType::from_tag(found)
            .filter(|t| *t != PduType::TrapV1)
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::UnknownPduType(found)))?;
        let mut pdu = decoder.sub_decoder(len)?;

        let request_id = pdu.read_integer()?;
        let error_status = pdu.read_integer()?;
        let error_index = pdu.read_integer()?;
        let varbinds = decode_varbind_list(&mut pdu)?;
        pdu.expect_end()?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error_status != 0
    }

    /// Get the error status as an enum.
    pub fn error_status_enum(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }

    /// Create a Response PDU from this PDU (for Inform handling).
    ///
    /// The response copies the request_id and variable bindings,
    /// sets error_status and error_index to 0, and changes the PDU type to Response.
    pub fn to_response(&self) -> Self {
        Self::new(PduType::Response, self.request_id, self.varbinds.clone())
    }

    /// Check if this is a notification PDU (Trap or Inform).
    pub fn is_notification(&self) -> bool {
        matches!(self.pdu_type, PduType::TrapV2 | PduType::InformRequest)
    }

    /// The `sysUpTime.0` value of a v2 notification.
    pub fn uptime(&self) -> Option<TimeTicks> {
        match self.varbinds.first() {
            Some(VarBind {
                oid,
                value: SmiValue::TimeTicks(ticks),
            }) if oid.arcs() == SYS_UPTIME_OID => Some(*ticks),
            _ => None,
        }
    }

    /// The `snmpTrapOID.0` value of a v2 notification.
    pub fn trap_oid(&self) -> Option<&Oid> {
        match self.varbinds.get(1) {
            Some(VarBind {
                oid,
                value: SmiValue::ObjectId(trap),
            }) if oid.arcs() == SNMP_TRAP_OID => Some(trap),
            _ => None,
        }
    }
}

/// SNMPv1 generic trap types (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum GenericTrap {
    /// coldStart(0) - agent is reinitializing, config may change
    ColdStart = 0,
    /// warmStart(1) - agent is reinitializing, config unchanged
    WarmStart = 1,
    /// linkDown(2) - communication link failure
    LinkDown = 2,
    /// linkUp(3) - communication link came up
    LinkUp = 3,
    /// authenticationFailure(4) - improperly authenticated message received
    AuthenticationFailure = 4,
    /// egpNeighborLoss(5) - EGP peer marked down
    EgpNeighborLoss = 5,
    /// enterpriseSpecific(6) - vendor-specific trap, see specific_trap field
    EnterpriseSpecific = 6,
}

impl GenericTrap {
    /// Create from integer value.
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::ColdStart),
            1 => Some(Self::WarmStart),
            2 => Some(Self::LinkDown),
            3 => Some(Self::LinkUp),
            4 => Some(Self::AuthenticationFailure),
            5 => Some(Self::EgpNeighborLoss),
            6 => Some(Self::EnterpriseSpecific),
            _ => None,
        }
    }

    /// Get the integer value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// SNMPv1 Trap PDU (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapPdu {
    /// Enterprise OID (sysObjectID of the entity generating the trap)
    pub enterprise: Oid,
    /// Address of the agent generating the trap
    pub agent_addr: Ipv4Addr,
    /// Generic trap type (raw, agents may send values outside 0-6)
    pub generic_trap: i32,
    /// Specific trap code (meaningful when generic_trap is enterpriseSpecific)
    pub specific_trap: i32,
    /// Time since the agent was last (re)initialized
    pub uptime: TimeTicks,
    /// Variable bindings
    pub varbinds: Vec<VarBind>,
}

impl TrapPdu {
    /// Create a new SNMPv1 Trap PDU.
    pub fn new(
        enterprise: Oid,
        agent_addr: Ipv4Addr,
        generic_trap: GenericTrap,
        specific_trap: i32,
        uptime: TimeTicks,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            enterprise,
            agent_addr,
            generic_trap: generic_trap.as_i32(),
            specific_trap,
            uptime,
            varbinds,
        }
    }

    /// Get the generic trap type as an enum.
    pub fn generic_trap_enum(&self) -> Option<GenericTrap> {
        GenericTrap::from_i32(self.generic_trap)
    }

    /// Check if this is an enterprise-specific trap.
    pub fn is_enterprise_specific(&self) -> bool {
        self.generic_trap == GenericTrap::EnterpriseSpecific as i32
    }

    /// Equivalent SNMPv2 trap OID (RFC 3584 Section 3).
    ///
    /// Generic traps map to `snmpTraps.{generic_trap + 1}`; enterprise-specific
    /// traps map to `enterprise.0.specific_trap`.
    ///
    /// ```
    /// use std::net::Ipv4Addr;
    /// use snmp_poller::oid;
    /// use snmp_poller::pdu::{GenericTrap, TrapPdu};
    /// use snmp_poller::smi::TimeTicks;
    ///
    /// let trap = TrapPdu::new(
    ///     oid!(1, 3, 6, 1, 4, 1, 9999),
    ///     Ipv4Addr::new(192, 168, 1, 1),
    ///     GenericTrap::LinkDown,
    ///     0,
    ///     TimeTicks::new(12345),
    ///     vec![],
    /// );
    /// assert_eq!(trap.v2_trap_oid(), oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3));
    /// ```
    pub fn v2_trap_oid(&self) -> Oid {
        if self.is_enterprise_specific() {
            self.enterprise.child(0).child(self.specific_trap as u32)
        } else {
            Oid::from_slice(&SNMP_TRAPS).child((self.generic_trap + 1) as u32)
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::pdu::TRAP_V1, |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_unsigned32(tag::application::TIMETICKS, self.uptime.value());
            buf.push_integer(self.specific_trap);
            buf.push_integer(self.generic_trap);
            buf.push_ip_address(self.agent_addr.octets());
            buf.push_oid(&self.enterprise);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut pdu = decoder.read_constructed(tag::pdu::TRAP_V1)?;

        let enterprise = pdu.read_oid()?;
        let agent_addr = Ipv4Addr::from(pdu.read_ip_address()?);
        let generic_trap = pdu.read_integer()?;
        let specific_trap = pdu.read_integer()?;
        let uptime = TimeTicks::new(pdu.read_unsigned32(tag::application::TIMETICKS)?);
        let varbinds = decode_varbind_list(&mut pdu)?;
        pdu.expect_end()?;

        Ok(TrapPdu {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            uptime,
            varbinds,
        })
    }
}

/// The PDU carried by a community message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PduBody {
    /// Any request/response shaped PDU.
    Pdu(Pdu),
    /// An SNMPv1 trap.
    TrapV1(TrapPdu),
}

impl PduBody {
    /// The PDU type.
    pub fn pdu_type(&self) -> PduType {
        match self {
            Self::Pdu(pdu) => pdu.pdu_type,
            Self::TrapV1(_) => PduType::TrapV1,
        }
    }

    /// The variable bindings.
    pub fn varbinds(&self) -> &[VarBind] {
        match self {
            Self::Pdu(pdu) => &pdu.varbinds,
            Self::TrapV1(trap) => &trap.varbinds,
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Self::Pdu(pdu) => pdu.encode(buf),
            Self::TrapV1(trap) => trap.encode(buf),
        }
    }

    /// Decode from BER, dispatching on the PDU tag.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        match decoder.peek_tag() {
            Some(tag::pdu::TRAP_V1) => TrapPdu::decode(decoder).map(Self::TrapV1),
            _ => Pdu::decode(decoder).map(Self::Pdu),
        }
    }
}

impl From<Pdu> for PduBody {
    fn from(pdu: Pdu) -> Self {
        Self::Pdu(pdu)
    }
}

impl From<TrapPdu> for PduBody {
    fn from(trap: TrapPdu) -> Self {
        Self::TrapV1(trap)
    }
}
