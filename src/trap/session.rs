//! Trap session: UDP listener, handler registry and lifecycle.

use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{HandlerId, SessionError, SessionErrorHandler, SessionStatus, TrapHandler};
use crate::error::{Error, Result};
use crate::message::CommunityMessage;
use crate::pdu::{PduBody, PduType};
use crate::util::{bind_udp_socket, lock};

/// Largest UDP payload.
const DEFAULT_MAX_MESSAGE_SIZE: usize = 65535;

#[derive(Debug, Clone)]
struct SessionConfig {
    bind_addr: SocketAddr,
    max_message_size: usize,
    recv_buffer_size: Option<usize>,
}

type HandlerList = Vec<(HandlerId, Arc<dyn TrapHandler>)>;

struct Listener {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Inner {
    config: SessionConfig,
    status: Mutex<SessionStatus>,
    handlers: Mutex<HandlerList>,
    error_handler: Mutex<Option<Arc<dyn SessionErrorHandler>>>,
    listener: Mutex<Option<Listener>>,
    next_handler_id: AtomicU64,
}

/// UDP trap receiver.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Clone)]
pub struct TrapSession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TrapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrapSession")
            .field("bind_addr", &self.inner.config.bind_addr)
            .field("status", &self.status())
            .finish()
    }
}

impl TrapSession {
    /// Create a builder.
    pub fn builder() -> TrapSessionBuilder {
        TrapSessionBuilder::new()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> SessionStatus {
        *lock(&self.inner.status)
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        lock(&self.inner.listener).as_ref().map(|l| l.local_addr)
    }

    /// Register a handler. Safe to call while running.
    pub fn add_handler(&self, handler: impl TrapHandler) -> HandlerId {
        let id = HandlerId(self.inner.next_handler_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.handlers).push((id, Arc::new(handler)));
        id
    }

    /// Unregister a handler. Returns whether it was registered.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = lock(&self.inner.handlers);
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Replace the error handler.
    pub fn set_error_handler(&self, handler: impl SessionErrorHandler) {
        *lock(&self.inner.error_handler) = Some(Arc::new(handler));
    }

    /// Bind the socket and start the listener.
    ///
    /// Fails with [`Error::IllegalState`] unless the session is
    /// `StartPending` or `Stopped`. A bind failure is returned as
    /// [`Error::Io`] and leaves the session `Stopped`.
    pub async fn start(&self) -> Result<()> {
        {
            let mut status = lock(&self.inner.status);
            match *status {
                SessionStatus::StartPending | SessionStatus::Stopped => {
                    *status = SessionStatus::Starting;
                }
                other => {
                    return Err(Error::IllegalState {
                        operation: "start",
                        state: other.as_str(),
                    });
                }
            }
        }

        let config = &self.inner.config;
        let bound = bind_udp_socket(config.bind_addr, config.recv_buffer_size)
            .await
            .and_then(|socket| socket.local_addr().map(|addr| (socket, addr)));
        let (socket, local_addr) = match bound {
            Ok(bound) => bound,
            Err(e) => {
                *lock(&self.inner.status) = SessionStatus::Stopped;
                tracing::error!(
                    snmp.bind_addr = %config.bind_addr,
                    error = %e,
                    "trap session bind failed"
                );
                return Err(Error::Io {
                    target: Some(config.bind_addr),
                    source: e,
                });
            }
        };

        let mut status = lock(&self.inner.status);
        if *status == SessionStatus::StopPending {
            // stop() arrived while binding; the socket is dropped here
            *status = SessionStatus::Stopped;
            tracing::info!(snmp.local_addr = %local_addr, "trap session stopped before running");
            return Ok(());
        }

        let socket = Arc::new(socket);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(listen(
            self.clone(),
            socket.clone(),
            cancel.clone(),
            config.max_message_size,
        ));
        *lock(&self.inner.listener) = Some(Listener {
            socket,
            local_addr,
            cancel,
            task,
        });
        *status = SessionStatus::Running;

        tracing::info!(snmp.local_addr = %local_addr, "trap session running");
        Ok(())
    }

    /// Stop the listener and wait for it to finish.
    ///
    /// No handler is invoked after this returns. Stopping a session that is
    /// not running is a no-op; stopping one that is still binding makes
    /// [`start`](Self::start) release the socket instead of listening.
    pub async fn stop(&self) {
        let listener = {
            let mut status = lock(&self.inner.status);
            match *status {
                SessionStatus::StartPending => {
                    *status = SessionStatus::Stopped;
                    return;
                }
                SessionStatus::Starting => {
                    *status = SessionStatus::StopPending;
                    return;
                }
                SessionStatus::Running => {
                    *status = SessionStatus::StopPending;
                    lock(&self.inner.listener).take()
                }
                SessionStatus::StopPending | SessionStatus::Stopped => return,
            }
        };

        if let Some(listener) = listener {
            listener.cancel.cancel();
            if let Err(e) = listener.task.await {
                tracing::error!(error = %e, "trap listener task failed");
            }
            tracing::info!(snmp.local_addr = %listener.local_addr, "trap session stopped");
        }
        *lock(&self.inner.status) = SessionStatus::Stopped;
    }

    /// Send a message from the session's socket.
    ///
    /// Only valid while running.
    pub async fn send(&self, target: SocketAddr, message: &CommunityMessage) -> Result<()> {
        let socket = {
            let status = self.status();
            if status != SessionStatus::Running {
                return Err(Error::IllegalState {
                    operation: "send",
                    state: status.as_str(),
                });
            }
            lock(&self.inner.listener)
                .as_ref()
                .map(|l| l.socket.clone())
                .ok_or(Error::IllegalState {
                    operation: "send",
                    state: SessionStatus::StopPending.as_str(),
                })?
        };

        let data = message.encode();
        tracing::trace!(snmp.target = %target, snmp.bytes = data.len(), "trap session send");
        socket.send_to(&data, target).await.map_err(|e| Error::Io {
            target: Some(target),
            source: e,
        })?;
        Ok(())
    }

    fn report(&self, error: SessionError, reference: Option<&Bytes>) {
        let handler = lock(&self.inner.error_handler).clone();
        match handler {
            Some(handler) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    handler.on_error(self, error, reference)
                }));
                if outcome.is_err() {
                    tracing::error!(snmp.session_error = %error, "session error handler panicked");
                }
            }
            None => {
                tracing::debug!(snmp.session_error = %error, "unhandled trap session error");
            }
        }
    }

    async fn dispatch(&self, socket: &UdpSocket, source: SocketAddr, data: Bytes) {
        let message = match CommunityMessage::decode(data.clone()) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(
                    snmp.source = %source,
                    snmp.bytes = data.len(),
                    error = %e,
                    "discarding undecodable datagram"
                );
                self.report(SessionError::InvalidPdu, Some(&data));
                return;
            }
        };

        tracing::trace!(
            snmp.source = %source,
            snmp.version = %message.version,
            snmp.pdu_type = %message.body.pdu_type(),
            "trap received"
        );

        if let PduBody::Pdu(pdu) = &message.body
            && pdu.pdu_type == PduType::InformRequest
        {
            let ack = CommunityMessage::new(
                message.version,
                message.community.clone(),
                pdu.to_response(),
            );
            if let Err(e) = socket.send_to(&ack.encode(), source).await {
                tracing::info!(
                    snmp.source = %source,
                    snmp.request_id = pdu.request_id,
                    error = %e,
                    "failed to acknowledge inform"
                );
                self.report(SessionError::IoError, None);
            }
        }

        let handlers: Vec<Arc<dyn TrapHandler>> = lock(&self.inner.handlers)
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                handler.on_pdu(self, source, &message.community, &message.body)
            }));
            if outcome.is_err() {
                tracing::error!(snmp.source = %source, "trap handler panicked");
                self.report(SessionError::Exception, None);
            }
        }
    }
}

async fn listen(
    session: TrapSession,
    socket: Arc<UdpSocket>,
    cancel: CancellationToken,
    max_message_size: usize,
) {
    let mut buf = vec![0u8; max_message_size];

    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => received,
        };

        match received {
            Ok((len, source)) => {
                tracing::trace!(snmp.source = %source, snmp.bytes = len, "trap session received packet");
                let data = Bytes::copy_from_slice(&buf[..len]);
                session.dispatch(&socket, source, data).await;
            }
            Err(e) => {
                // Receive errors are reported but never stop the listener
                tracing::error!(error = %e, "trap session recv error");
                session.report(SessionError::IoError, None);
            }
        }
    }

    tracing::debug!("trap listener exiting");
}

/// Builder for [`TrapSession`].
pub struct TrapSessionBuilder {
    bind_addr: Option<String>,
    max_message_size: usize,
    recv_buffer_size: Option<usize>,
    error_handler: Option<Arc<dyn SessionErrorHandler>>,
}

impl TrapSessionBuilder {
    /// Create a builder with default settings and no bind address.
    pub fn new() -> Self {
        Self {
            bind_addr: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            recv_buffer_size: None,
            error_handler: None,
        }
    }

    /// Set the local address to listen on (required).
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    /// Set maximum datagram size (default: 65535).
    ///
    /// Longer datagrams are truncated and will fail to decode.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Request a socket receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }

    /// Install an error handler.
    pub fn error_handler(mut self, handler: impl SessionErrorHandler) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Build the session in the `StartPending` state.
    pub fn build(self) -> Result<TrapSession> {
        let raw = self
            .bind_addr
            .ok_or_else(|| Error::invalid_argument("trap session requires a bind address"))?;
        let bind_addr: SocketAddr = raw
            .parse()
            .map_err(|_| Error::invalid_argument(format!("invalid bind address: {}", raw)))?;
        if self.max_message_size == 0 {
            return Err(Error::invalid_argument("max_message_size must be non-zero"));
        }

        Ok(TrapSession {
            inner: Arc::new(Inner {
                config: SessionConfig {
                    bind_addr,
                    max_message_size: self.max_message_size,
                    recv_buffer_size: self.recv_buffer_size,
                },
                status: Mutex::new(SessionStatus::StartPending),
                handlers: Mutex::new(Vec::new()),
                error_handler: Mutex::new(self.error_handler),
                listener: Mutex::new(None),
                next_handler_id: AtomicU64::new(1),
            }),
        })
    }
}

impl Default for TrapSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::pdu::Pdu;
    use crate::smi::{OctetString, TimeTicks};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn session() -> TrapSession {
        TrapSession::builder().bind("127.0.0.1:0").build().unwrap()
    }

    #[test]
    fn test_builder_requires_address() {
        assert!(matches!(
            TrapSession::builder().build().unwrap_err(),
            Error::InvalidArgument { .. }
        ));
        assert!(TrapSession::builder().bind("nonsense").build().is_err());
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let session = session();
        assert_eq!(session.status(), SessionStatus::StartPending);
        assert!(session.local_addr().is_none());

        session.start().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Running);
        assert!(session.local_addr().is_some());

        let err = session.start().await.unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalState {
                operation: "start",
                state: "running"
            }
        ));

        session.stop().await;
        assert_eq!(session.status(), SessionStatus::Stopped);
        assert!(session.local_addr().is_none());

        // Restart after stop
        session.start().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Running);
        session.stop().await;
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let session = session();
        session.stop().await;
        assert_eq!(session.status(), SessionStatus::Stopped);
    }

    #[tokio::test]
    async fn test_send_requires_running() {
        let session = session();
        let msg = CommunityMessage::v2c(
            "public",
            Pdu::trap_v2(1, TimeTicks::new(0), oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 1), vec![]),
        );
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        assert!(matches!(
            session.send(target, &msg).await.unwrap_err(),
            Error::IllegalState {
                operation: "send",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_handler_add_remove() {
        let session = session();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = session.add_handler(
            move |_: &TrapSession, _: SocketAddr, _: &OctetString, _: &PduBody| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert!(session.remove_handler(id));
        assert!(!session.remove_handler(id));
    }

    #[tokio::test]
    async fn test_no_dispatch_after_stop() {
        let session = session();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        session.add_handler(
            move |_: &TrapSession, _: SocketAddr, _: &OctetString, _: &PduBody| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        session.start().await.unwrap();
        let addr = session.local_addr().unwrap();
        session.stop().await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let msg = CommunityMessage::v2c(
            "public",
            Pdu::trap_v2(1, TimeTicks::new(0), oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 1), vec![]),
        );
        let _ = sender.send_to(&msg.encode(), addr).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
