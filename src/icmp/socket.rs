//! ICMPv4 socket and its reader thread.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::sync::mpsc;

use super::packet::strip_ip_header;
use crate::correlator::RawReply;

/// How the ICMP socket was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// `SOCK_RAW`: needs privileges, sees every ICMP message on the host and
    /// receives the IP header.
    Raw,
    /// `SOCK_DGRAM` ping socket: unprivileged where the kernel allows it.
    /// The kernel rewrites the echo identifier and filters replies itself.
    Datagram,
}

/// An open ICMPv4 socket.
///
/// Reads and writes are blocking; sends are issued inline and reads happen
/// on a dedicated thread started with [`IcmpSocket::spawn_reader`].
#[derive(Debug)]
pub struct IcmpSocket {
    socket: Arc<UdpSocket>,
    kind: SocketKind,
}

impl IcmpSocket {
    /// Open a raw socket, falling back to a datagram ping socket.
    pub fn open() -> io::Result<Self> {
        let (socket, kind) = match Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)) {
            Ok(socket) => (socket, SocketKind::Raw),
            Err(raw_err) => {
                tracing::debug!(error = %raw_err, "raw ICMP socket unavailable, trying datagram");
                let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4))?;
                (socket, SocketKind::Datagram)
            }
        };
        tracing::debug!(icmp.kind = ?kind, "ICMP socket opened");

        // Only the fd matters here; UdpSocket gives safe send_to/recv_from
        Ok(Self {
            socket: Arc::new(socket.into()),
            kind,
        })
    }

    /// How the socket was opened.
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    /// Send one ICMP message.
    pub fn send_to(&self, packet: &[u8], target: Ipv4Addr) -> io::Result<usize> {
        self.socket.send_to(packet, SocketAddr::from((target, 0)))
    }

    /// Start the thread that feeds `queue` with every ICMP message read.
    ///
    /// The thread checks its stop flag at least once per `read_timeout`.
    pub fn spawn_reader(
        &self,
        queue: mpsc::Sender<RawReply>,
        read_timeout: Duration,
    ) -> io::Result<ReaderHandle> {
        self.socket.set_read_timeout(Some(read_timeout))?;
        let socket = self.socket.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let thread = std::thread::Builder::new()
            .name("icmp-reader".into())
            .spawn(move || read_loop(&socket, &queue, &flag))?;

        Ok(ReaderHandle {
            stop,
            thread: Some(thread),
        })
    }
}

/// Controls a running reader thread.
#[derive(Debug)]
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Signal the thread and wait for it to exit. Blocks.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!("ICMP reader thread panicked");
        }
    }
}

fn read_loop(socket: &UdpSocket, queue: &mpsc::Sender<RawReply>, stop: &AtomicBool) {
    let mut buf = [0u8; 1500];
    tracing::debug!("ICMP reader started");

    while !stop.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, source)) => {
                let payload = strip_ip_header(&buf[..len]);
                if payload.is_empty() {
                    continue;
                }
                let reply = RawReply {
                    source: source.ip(),
                    payload: Bytes::copy_from_slice(payload),
                    received_at: Instant::now(),
                };
                if queue.blocking_send(reply).is_err() {
                    tracing::debug!("reply queue closed, ICMP reader exiting");
                    break;
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                tracing::error!(error = %e, "ICMP receive failed");
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    tracing::debug!("ICMP reader stopped");
}
