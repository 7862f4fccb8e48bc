//! ICMPv4 echo probing.
//!
//! [`IcmpService`] owns one ICMP socket, a blocking reader thread that feeds
//! replies into a [`Correlator`](crate::correlator::Correlator), and the
//! correlator itself. Probes are correlated by a 64-bit key carried in the
//! echo payload, so any number of concurrent pings can share the service.

pub mod packet;
mod service;
mod socket;

pub use service::{IcmpOptions, IcmpService, IcmpTransport};
pub use socket::{IcmpSocket, ReaderHandle, SocketKind};
