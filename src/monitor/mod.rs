//! Service availability monitors.
//!
//! A monitor takes a target address and a [`MonitorParameters`] map, runs its
//! protocol check with retries, and reduces the result to a [`PollStatus`].
//! Network faults become verdicts; only misuse (and, for IMAP, an unreachable
//! host) surfaces as an [`Error`](crate::Error).
//!
//! | Monitor          | retry | timeout | port |
//! |------------------|-------|---------|------|
//! | [`IcmpMonitor`]  | 2     | 800 ms  | -    |
//! | [`Pop3Monitor`]  | 0     | 3000 ms | 110  |
//! | [`ImapMonitor`]  | 0     | 5000 ms | 143  |
//!
//! # Example
//!
//! ```rust,no_run
//! use snmp_poller::monitor::{MonitorParameters, PollStatus, Pop3Monitor, ServiceMonitor};
//!
//! # async fn example() -> snmp_poller::Result<()> {
//! let params = MonitorParameters::new().with("retry", "1");
//! let status = Pop3Monitor::new().poll("192.0.2.10".parse().unwrap(), &params).await?;
//! if status != PollStatus::Available {
//!     println!("POP3 down: {}", status);
//! }
//! # Ok(())
//! # }
//! ```

mod icmp;
mod imap;
mod params;
mod pop3;
mod tcp;

use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;

pub use icmp::IcmpMonitor;
pub use imap::ImapMonitor;
pub use params::{MonitorParameters, parse_assignment};
pub use pop3::Pop3Monitor;

use crate::error::Result;

/// Boxed future returned by [`ServiceMonitor::poll`], so monitors can be
/// used as trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollStatus {
    /// The service answered correctly.
    Available,
    /// The service is down or answered wrongly.
    Unavailable,
    /// A connection was made but the service never finished answering.
    Unresponsive,
}

impl PollStatus {
    /// Uppercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Unavailable => "UNAVAILABLE",
            Self::Unresponsive => "UNRESPONSIVE",
        }
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol check against one host.
pub trait ServiceMonitor: Send + Sync {
    /// Protocol name, e.g. `"POP3"`.
    fn name(&self) -> &'static str;

    /// Poll `target` once, including retries.
    fn poll<'a>(
        &'a self,
        target: IpAddr,
        params: &'a MonitorParameters,
    ) -> BoxFuture<'a, Result<PollStatus>>;
}

/// Monitor for a protocol name (case-insensitive): `icmp`, `pop3`, `imap`.
pub fn for_protocol(name: &str) -> Option<Box<dyn ServiceMonitor>> {
    match name.to_ascii_lowercase().as_str() {
        "icmp" => Some(Box::new(IcmpMonitor::new())),
        "pop3" => Some(Box::new(Pop3Monitor::new())),
        "imap" => Some(Box::new(ImapMonitor::new())),
        _ => None,
    }
}
