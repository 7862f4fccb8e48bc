//! Callback traits for trap sessions.

use std::net::SocketAddr;

use bytes::Bytes;

use super::{SessionError, TrapSession};
use crate::pdu::PduBody;
use crate::smi::OctetString;

/// Receives every successfully decoded message.
///
/// Handlers run on the session's listener task, in registration order, and
/// see shared read-only views of the message. A handler that blocks delays
/// every later datagram; hand long work off to a channel or a spawned task.
///
/// Closures with the matching signature implement this trait.
pub trait TrapHandler: Send + Sync + 'static {
    /// Called once per decoded message.
    fn on_pdu(
        &self,
        session: &TrapSession,
        source: SocketAddr,
        community: &OctetString,
        body: &PduBody,
    );
}

impl<F> TrapHandler for F
where
    F: Fn(&TrapSession, SocketAddr, &OctetString, &PduBody) + Send + Sync + 'static,
{
    fn on_pdu(
        &self,
        session: &TrapSession,
        source: SocketAddr,
        community: &OctetString,
        body: &PduBody,
    ) {
        self(session, source, community, body)
    }
}

/// Receives session faults.
///
/// `reference` is the raw datagram for [`SessionError::InvalidPdu`] and
/// `None` otherwise.
pub trait SessionErrorHandler: Send + Sync + 'static {
    /// Called once per fault.
    fn on_error(&self, session: &TrapSession, error: SessionError, reference: Option<&Bytes>);
}

impl<F> SessionErrorHandler for F
where
    F: Fn(&TrapSession, SessionError, Option<&Bytes>) + Send + Sync + 'static,
{
    fn on_error(&self, session: &TrapSession, error: SessionError, reference: Option<&Bytes>) {
        self(session, error, reference)
    }
}

/// Registration token returned by [`TrapSession::add_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);
