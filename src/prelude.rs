//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use snmp_poller::prelude::*;
//! ```
//!
//! This imports:
//! - Message types: [`CommunityMessage`], [`Pdu`], [`PduBody`], [`TrapPdu`], [`VarBind`]
//! - SMI values: [`SmiValue`], [`SmiSyntax`] and the common syntaxes
//! - Trap receiving: [`TrapSession`], [`SessionError`], [`SessionStatus`]
//! - Monitors: [`ServiceMonitor`], [`MonitorParameters`], [`PollStatus`]
//! - Error handling: [`Error`], [`Result`]
//! - The [`oid!`] macro for compile-time OID construction

pub use crate::error::{Error, Result};
pub use crate::message::CommunityMessage;
pub use crate::monitor::{MonitorParameters, PollStatus, ServiceMonitor};
pub use crate::oid::Oid;
pub use crate::pdu::{Pdu, PduBody, PduType, TrapPdu};
pub use crate::smi::{
    Counter32, Counter64, Gauge32, Int32, IpAddress, OctetString, SmiSyntax, SmiValue, TimeTicks,
    UInt32,
};
pub use crate::trap::{SessionError, SessionStatus, TrapSession};
pub use crate::varbind::VarBind;
pub use crate::version::Version;

#[doc(no_inline)]
pub use crate::oid;
