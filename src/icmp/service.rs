//! ICMP echo service: one socket, one reader thread, one correlator.

use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use super::packet::{ECHO_REPLY, EchoPacket};
use super::socket::{IcmpSocket, ReaderHandle, SocketKind};
use crate::correlator::{CorrelationKey, Correlator, ProbeOutcome, ProbeTransport, RetryPolicy, reply_queue};
use crate::error::{Error, Result};
use crate::util::lock;

/// Sends echo requests and recognizes our replies.
#[derive(Debug)]
pub struct IcmpTransport {
    socket: IcmpSocket,
    identifier: u16,
    sequence: AtomicU16,
}

impl IcmpTransport {
    fn new(socket: IcmpSocket, identifier: u16) -> Self {
        Self {
            socket,
            identifier,
            sequence: AtomicU16::new(0),
        }
    }
}

impl ProbeTransport for IcmpTransport {
    async fn send_probe(&self, target: IpAddr, key: CorrelationKey) -> io::Result<()> {
        let IpAddr::V4(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "ICMP echo is IPv4 only",
            ));
        };
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let packet = EchoPacket::request(self.identifier, sequence, key, now_nanos()).encode();
        self.socket.send_to(&packet, target)?;
        Ok(())
    }

    fn reply_key(&self, payload: &[u8]) -> Option<CorrelationKey> {
        let packet = EchoPacket::decode(payload)?;
        if packet.kind != ECHO_REPLY {
            return None;
        }
        // Datagram sockets replace the identifier with their own
        if self.socket.kind() == SocketKind::Raw && packet.identifier != self.identifier {
            return None;
        }
        Some(packet.key)
    }
}

/// Options for [`IcmpService::start`].
#[derive(Debug, Clone)]
pub struct IcmpOptions {
    /// Echo identifier. Random per process when `None`.
    pub filter_id: Option<u16>,
    /// Capacity of the reply queue between reader thread and correlator.
    pub queue_capacity: usize,
    /// Upper bound on how long the reader takes to notice a shutdown.
    pub read_timeout: Duration,
}

impl Default for IcmpOptions {
    fn default() -> Self {
        Self {
            filter_id: None,
            queue_capacity: 1024,
            read_timeout: Duration::from_millis(200),
        }
    }
}

/// ICMP echo prober.
///
/// Construct one with [`IcmpService::start`], or use the process-wide
/// instance from [`IcmpService::shared`]. Either way, call
/// [`shutdown`](IcmpService::shutdown) to stop the reader thread.
///
/// Pings fail with [`Error::IllegalState`] once the service is shut down or
/// the runtime it was started on is gone.
#[derive(Debug)]
pub struct IcmpService {
    correlator: Correlator<IcmpTransport>,
    filter_id: u16,
    reader: Mutex<Option<ReaderHandle>>,
}

static SHARED: tokio::sync::Mutex<Option<Arc<IcmpService>>> = tokio::sync::Mutex::const_new(None);

impl IcmpService {
    /// Open the socket and start the reader thread and correlator.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(options: IcmpOptions) -> Result<Self> {
        let socket = IcmpSocket::open().map_err(|source| Error::Io {
            target: None,
            source,
        })?;
        let filter_id = options.filter_id.unwrap_or_else(random_filter_id);
        let (tx, rx) = reply_queue(options.queue_capacity.max(1));
        let reader = socket
            .spawn_reader(tx, options.read_timeout)
            .map_err(|source| Error::Io {
                target: None,
                source,
            })?;

        tracing::info!(icmp.filter_id = filter_id, icmp.kind = ?socket.kind(), "ICMP service started");
        Ok(Self {
            correlator: Correlator::start(IcmpTransport::new(socket, filter_id), rx),
            filter_id,
            reader: Mutex::new(Some(reader)),
        })
    }

    /// The process-wide service, started on first use with default options.
    ///
    /// The service's receiver runs on the runtime of the caller that started
    /// it. If that runtime has since been dropped, or the service was shut
    /// down, the stale instance is stopped and a new one started. A failed
    /// start is not cached; the next call tries again.
    pub async fn shared() -> Result<Arc<IcmpService>> {
        let mut slot = SHARED.lock().await;
        if let Some(service) = slot.as_ref() {
            if !service.is_closed() {
                return Ok(service.clone());
            }
            tracing::info!(icmp.filter_id = service.filter_id, "shared ICMP service stopped, restarting");
        }
        if let Some(stale) = slot.take() {
            stale.shutdown().await;
        }

        let service = Arc::new(Self::start(IcmpOptions::default())?);
        *slot = Some(service.clone());
        Ok(service)
    }

    /// Whether this service can no longer answer pings.
    pub fn is_closed(&self) -> bool {
        self.correlator.is_closed()
    }

    /// Echo identifier stamped into requests.
    pub fn filter_id(&self) -> u16 {
        self.filter_id
    }

    /// How the socket was opened.
    pub fn socket_kind(&self) -> SocketKind {
        self.correlator.transport().socket.kind()
    }

    /// Ping `target`, resending per `policy`.
    ///
    /// IPv6 targets are rejected with [`Error::InvalidArgument`].
    pub async fn ping(
        &self,
        target: IpAddr,
        policy: RetryPolicy,
        cancel: Option<&CancellationToken>,
    ) -> Result<ProbeOutcome> {
        if target.is_ipv6() {
            return Err(Error::invalid_argument(format!(
                "ICMP monitor is IPv4 only, got {}",
                target
            )));
        }
        self.correlator.probe(target, policy, cancel).await
    }

    /// Stop the reader thread and the correlator. Idempotent.
    pub async fn shutdown(&self) {
        let reader = lock(&self.reader).take();
        if let Some(reader) = reader
            && let Err(e) = tokio::task::spawn_blocking(move || reader.stop()).await
        {
            tracing::error!(error = %e, "failed to join ICMP reader");
        }
        self.correlator.shutdown().await;
        tracing::info!(icmp.filter_id = self.filter_id, "ICMP service stopped");
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn random_filter_id() -> u16 {
    let mut bytes = [0u8; 2];
    match getrandom::fill(&mut bytes) {
        Ok(()) => u16::from_ne_bytes(bytes),
        Err(_) => std::process::id() as u16,
    }
}
