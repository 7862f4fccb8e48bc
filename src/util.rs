//! Internal utilities: socket setup and I/O error classification.

use std::io;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Create and bind a UDP socket with optional receive buffer size.
///
/// For IPv6 addresses, sets `IPV6_V6ONLY = false` to enable dual-stack mode,
/// allowing both IPv4 and IPv6 traffic on a single socket.
///
/// The kernel may cap `recv_buffer_size` at `net.core.rmem_max`; larger
/// buffers prevent trap loss during bursts.
pub(crate) async fn bind_udp_socket(
    addr: SocketAddr,
    recv_buffer_size: Option<usize>,
) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }

    // Allow address reuse for quick restarts
    socket.set_reuse_address(true)?;

    if let Some(size) = recv_buffer_size
        && let Err(e) = socket.set_recv_buffer_size(size)
    {
        tracing::debug!(error = %e, size, "could not set receive buffer size");
    }

    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    UdpSocket::from_std(socket.into())
}

/// How a connect or read failure affects a monitor's retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IoFault {
    /// The peer actively refused the connection.
    Refused,
    /// No route to the host or its network.
    NoRoute,
    /// Timeouts and everything else; worth another attempt.
    Retryable,
}

pub(crate) fn classify_io(err: &io::Error) -> IoFault {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => IoFault::Refused,
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => IoFault::NoRoute,
        _ => IoFault::Retryable,
    }
}

/// Lock a mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
