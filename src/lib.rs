//! SNMP codec, trap session and service monitors for network pollers.
//!
//! # Layers
//!
//! - [`ber`]: X.690 BER primitives, both buffer/offset functions and a
//!   cursor-style [`Decoder`](ber::Decoder).
//! - [`smi`]: SMI value types ([`SmiValue`] and the per-syntax structs) with
//!   their tag-checked codecs.
//! - [`oid`], [`varbind`], [`pdu`], [`message`]: SNMPv1/v2c PDUs and
//!   community messages.
//! - [`trap`]: a UDP [`TrapSession`] that decodes inbound notifications and
//!   dispatches them to handlers.
//! - [`correlator`]: pairs asynchronous probes with replies.
//! - [`icmp`]: ICMP echo service built on the correlator.
//! - [`monitor`]: ICMP, POP3 and IMAP availability checks.
//!
//! # Example
//!
//! ```rust,no_run
//! use snmp_poller::prelude::*;
//!
//! # async fn example() -> snmp_poller::Result<()> {
//! let pdu = Pdu::trap_v2(1, TimeTicks::new(4200), oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 1), vec![]);
//! let message = CommunityMessage::v2c("public", pdu);
//! let wire = message.encode();
//! assert_eq!(CommunityMessage::decode(wire)?, message);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `cli`: the `snmp-trapd` and `svc-poll` binaries.
//! - `rt-multi-thread`: tokio's multi-threaded runtime.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod ber;
pub mod correlator;
pub mod error;
pub mod icmp;
pub mod message;
pub mod monitor;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod smi;
pub mod trap;
pub mod varbind;
pub mod version;

#[cfg(feature = "cli")]
#[cfg_attr(docsrs, doc(cfg(feature = "cli")))]
pub mod cli;

pub(crate) mod util;

pub use correlator::{Correlator, ProbeOutcome, RetryPolicy};
pub use error::{Error, ErrorStatus, Result};
pub use message::CommunityMessage;
pub use monitor::{MonitorParameters, PollStatus, ServiceMonitor};
pub use oid::Oid;
pub use pdu::{Pdu, PduBody, PduType, TrapPdu};
pub use smi::SmiValue;
pub use trap::{SessionError, SessionStatus, TrapSession};
pub use varbind::VarBind;
pub use version::Version;
