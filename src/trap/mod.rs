//! Trap-receiving session.
//!
//! A [`TrapSession`] binds a UDP endpoint, decodes every inbound datagram as
//! a community message and hands the result to each registered
//! [`TrapHandler`]. Datagrams that fail to decode, receive errors, and
//! panicking handlers are reported to the optional [`SessionErrorHandler`];
//! none of them stop the session.
//!
//! # Lifecycle
//!
//! ```text
//! StartPending --start()--> Starting --bound--> Running --stop()--> StopPending --> Stopped
//!      |                                                                            ^
//!      +------------------------------stop()-----------------------------------------+
//! ```
//!
//! A stopped session may be started again.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use snmp_poller::pdu::PduBody;
//! use snmp_poller::smi::OctetString;
//! use snmp_poller::trap::TrapSession;
//!
//! # async fn example() -> snmp_poller::Result<()> {
//! let session = TrapSession::builder().bind("0.0.0.0:1162").build()?;
//! session.add_handler(
//!     |_: &TrapSession, source: SocketAddr, _: &OctetString, body: &PduBody| {
//!         println!("{} from {}", body.pdu_type(), source);
//!     },
//! );
//! session.start().await?;
//! // ...
//! session.stop().await;
//! # Ok(())
//! # }
//! ```

mod handler;
mod session;

pub use handler::{HandlerId, SessionErrorHandler, TrapHandler};
pub use session::{TrapSession, TrapSessionBuilder};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Created, never started.
    StartPending,
    /// Binding the socket.
    Starting,
    /// Listening and dispatching.
    Running,
    /// Stop requested, listener shutting down.
    StopPending,
    /// Not listening. May be started again.
    Stopped,
}

impl SessionStatus {
    /// Lowercase state name, as used in `IllegalState` errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartPending => "start pending",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::StopPending => "stop pending",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fault reported to a [`SessionErrorHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SessionError {
    /// A receive was interrupted.
    ///
    /// Part of the code set only; the tokio listener retries interrupted
    /// receives internally and never reports this.
    Interrupted,
    /// A socket receive or send failed.
    IoError,
    /// A trap handler panicked.
    Exception,
    /// A datagram did not decode as a community message.
    InvalidPdu,
}

impl SessionError {
    /// Numeric code (-1 interrupted, -2 I/O error, -3 exception, -4 invalid PDU).
    pub const fn code(self) -> i32 {
        match self {
            Self::Interrupted => -1,
            Self::IoError => -2,
            Self::Exception => -3,
            Self::InvalidPdu => -4,
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Interrupted => "interrupted",
            Self::IoError => "I/O error",
            Self::Exception => "handler panicked",
            Self::InvalidPdu => "invalid PDU",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_codes() {
        assert_eq!(SessionError::Interrupted.code(), -1);
        assert_eq!(SessionError::IoError.code(), -2);
        assert_eq!(SessionError::Exception.code(), -3);
        assert_eq!(SessionError::InvalidPdu.code(), -4);
        assert_eq!(SessionError::InvalidPdu.to_string(), "invalid PDU (-4)");
    }

    #[test]
    fn test_status_names() {
        assert_eq!(SessionStatus::StopPending.to_string(), "stop pending");
    }
}
