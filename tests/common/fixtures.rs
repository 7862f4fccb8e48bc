//! Common test fixtures and constants.

use std::net::Ipv4Addr;

use snmp_poller::pdu::{GenericTrap, Pdu, TrapPdu};
use snmp_poller::smi::TimeTicks;
use snmp_poller::{CommunityMessage, Oid, VarBind, oid};

// =============================================================================
// Notification OIDs
// =============================================================================

pub fn link_down() -> Oid {
    oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3)
}
pub fn if_index(instance: u32) -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1).child(instance)
}
pub fn enterprise() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999)
}

// =============================================================================
// Messages
// =============================================================================

/// V2c community used by every fixture message.
pub const COMMUNITY: &str = "public";

/// A v2c linkDown trap for interface 3.
pub fn v2c_link_down(request_id: i32) -> CommunityMessage {
    let pdu = Pdu::trap_v2(
        request_id,
        TimeTicks::new(4200),
        link_down(),
        vec![VarBind::new(if_index(3), 3)],
    );
    CommunityMessage::v2c(COMMUNITY, pdu)
}

/// A v2c inform carrying one varbind.
pub fn v2c_inform(request_id: i32) -> CommunityMessage {
    let pdu = Pdu::inform(
        request_id,
        TimeTicks::new(100),
        link_down(),
        vec![VarBind::new(if_index(1), 1)],
    );
    CommunityMessage::v2c(COMMUNITY, pdu)
}

/// An enterprise-specific v1 trap.
pub fn v1_enterprise_trap() -> CommunityMessage {
    let trap = TrapPdu::new(
        enterprise(),
        Ipv4Addr::new(192, 0, 2, 7),
        GenericTrap::EnterpriseSpecific,
        17,
        TimeTicks::new(900),
        vec![VarBind::new(if_index(2), 2)],
    );
    CommunityMessage::v1_trap(COMMUNITY, trap)
}

/// Bytes that do not decode as a community message.
pub const GARBAGE: &[u8] = &[0x30, 0x05, 0x02, 0x01];
