//! Asynchronous request/reply correlation.
//!
//! A [`Correlator`] pairs outbound probes with inbound replies for one
//! protocol. Replies arrive on an mpsc queue fed by whatever reads the wire
//! (for ICMP, a reader thread); one background task drains the queue and
//! signals the caller waiting on the reply's correlation key.
//!
//! ```text
//!   probe() ----register key----> pending map <----lookup---- receiver task
//!      |                                                         ^
//!      +--send_probe()--> wire --> reader --> RawReply queue ----+
//! ```
//!
//! A reply only signals its probe when it comes from the probed address.
//! Unmatched replies are dropped.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::util::lock;

/// Key carried in a probe and echoed back in its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey(pub u64);

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A datagram read off the wire, not yet matched to a probe.
#[derive(Debug, Clone)]
pub struct RawReply {
    /// Address the reply came from.
    pub source: IpAddr,
    /// Protocol payload (for ICMP, the message without the IP header).
    pub payload: Bytes,
    /// When the reader saw it.
    pub received_at: Instant,
}

/// Create the queue that feeds a correlator.
pub fn reply_queue(capacity: usize) -> (mpsc::Sender<RawReply>, mpsc::Receiver<RawReply>) {
    mpsc::channel(capacity)
}

/// Protocol-specific half of a correlator.
pub trait ProbeTransport: Send + Sync + 'static {
    /// Put one probe carrying `key` on the wire.
    fn send_probe(
        &self,
        target: IpAddr,
        key: CorrelationKey,
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Extract the correlation key from a reply, or `None` if the payload is
    /// not a reply to one of this transport's probes.
    fn reply_key(&self, payload: &[u8]) -> Option<CorrelationKey>;
}

/// How long to wait for a reply, and how many times to resend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Resends after the first attempt.
    pub retries: u32,
    /// Wait per attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub const fn new(retries: u32, timeout: Duration) -> Self {
        Self { retries, timeout }
    }
}

/// Result of a probe that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A matching reply arrived.
    Answered {
        /// Time from the last send to the reply.
        rtt: Duration,
        /// Sends made, including the answered one.
        attempts: u32,
    },
    /// Every attempt timed out, or a send failed.
    Unanswered {
        /// Sends attempted.
        attempts: u32,
    },
}

impl ProbeOutcome {
    /// Whether a reply arrived.
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

struct PendingProbe {
    target: IpAddr,
    sender: Option<oneshot::Sender<Instant>>,
}

struct Inner<T> {
    transport: T,
    pending: Mutex<HashMap<CorrelationKey, PendingProbe>>,
    next_key: AtomicU64,
    closed: AtomicBool,
    shutdown: CancellationToken,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

/// Removes a probe's map entry however the wait ends.
struct Registration<'a> {
    pending: &'a Mutex<HashMap<CorrelationKey, PendingProbe>>,
    key: CorrelationKey,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.key);
    }
}

/// Request/reply correlator over a [`ProbeTransport`].
///
/// Cloning is cheap; clones share the pending map and receiver task.
pub struct Correlator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Correlator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Correlator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &lock(&self.inner.pending).len())
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: ProbeTransport> Correlator<T> {
    /// Start the receiver task draining `queue`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(transport: T, queue: mpsc::Receiver<RawReply>) -> Self {
        let inner = Arc::new(Inner {
            transport,
            pending: Mutex::new(HashMap::new()),
            next_key: AtomicU64::new(initial_key()),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            receiver: Mutex::new(None),
        });
        let task = tokio::spawn(receive_loop(inner.clone(), queue));
        *lock(&inner.receiver) = Some(task);
        Self { inner }
    }

    /// The protocol transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Whether the correlator no longer routes replies.
    ///
    /// True after [`shutdown`](Self::shutdown), and also when the receiver
    /// task ended on its own: its queue closed or its runtime was dropped.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of probes currently waiting.
    pub fn pending_len(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Send a probe and wait for its reply.
    ///
    /// Resends up to `policy.retries` times when an attempt times out. A send
    /// failure ends the probe as unanswered. Cancelling `cancel`, or dropping
    /// the returned future, withdraws only this probe; the former surfaces as
    /// [`Error::Cancelled`].
    pub async fn probe(
        &self,
        target: IpAddr,
        policy: RetryPolicy,
        cancel: Option<&CancellationToken>,
    ) -> Result<ProbeOutcome> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(shut_down("probe"));
        }

        let (registration, mut signal) = self.register(target);
        // The receiver may have exited between the check above and registering
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(shut_down("probe"));
        }
        let key = registration.key;
        let mut attempts = 0;

        while attempts <= policy.retries {
            attempts += 1;
            let sent_at = Instant::now();

            if let Err(e) = self.inner.transport.send_probe(target, key).await {
                tracing::info!(
                    probe.target = %target,
                    probe.key = %key,
                    error = %e,
                    "probe send failed"
                );
                break;
            }
            tracing::trace!(probe.target = %target, probe.key = %key, probe.attempt = attempts, "probe sent");

            let wait = tokio::time::timeout(policy.timeout, &mut signal);
            let waited = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!(probe.target = %target, probe.key = %key, "probe cancelled");
                        return Err(Error::Cancelled { target: Some(target) });
                    }
                    waited = wait => waited,
                },
                None => wait.await,
            };

            match waited {
                Ok(Ok(received_at)) => {
                    let rtt = received_at.saturating_duration_since(sent_at);
                    tracing::trace!(
                        probe.target = %target,
                        probe.key = %key,
                        probe.rtt = ?rtt,
                        "probe answered"
                    );
                    return Ok(ProbeOutcome::Answered { rtt, attempts });
                }
                // The receiver stopped and cleared the map
                Ok(Err(_)) => return Err(shut_down("probe")),
                Err(_) => {
                    tracing::debug!(
                        probe.target = %target,
                        probe.key = %key,
                        probe.attempt = attempts,
                        "probe attempt timed out"
                    );
                }
            }
        }

        drop(registration);
        Ok(ProbeOutcome::Unanswered { attempts })
    }

    fn register(&self, target: IpAddr) -> (Registration<'_>, oneshot::Receiver<Instant>) {
        let (tx, rx) = oneshot::channel();
        let mut pending = lock(&self.inner.pending);

        let mut key = CorrelationKey(self.inner.next_key.fetch_add(1, Ordering::Relaxed));
        while pending.contains_key(&key) {
            key = CorrelationKey(key.0.wrapping_add(1));
        }
        pending.insert(
            key,
            PendingProbe {
                target,
                sender: Some(tx),
            },
        );

        (
            Registration {
                pending: &self.inner.pending,
                key,
            },
            rx,
        )
    }

    /// Stop the receiver task and fail every waiting probe.
    ///
    /// Later probes fail with [`Error::IllegalState`].
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.shutdown.cancel();
        let task = lock(&self.inner.receiver).take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "correlator receiver task failed");
        }
        lock(&self.inner.pending).clear();
        tracing::debug!("correlator shut down");
    }
}

impl<T> Inner<T>
where
    T: ProbeTransport,
{
    fn route(&self, reply: RawReply) {
        let Some(key) = self.transport.reply_key(&reply.payload) else {
            tracing::trace!(
                probe.source = %reply.source,
                probe.bytes = reply.payload.len(),
                "ignoring foreign reply"
            );
            return;
        };

        let mut pending = lock(&self.pending);
        match pending.get_mut(&key) {
            Some(probe) if probe.target == reply.source => {
                if let Some(sender) = probe.sender.take() {
                    // Receiver may have timed out already
                    let _ = sender.send(reply.received_at);
                }
            }
            Some(probe) => {
                tracing::warn!(
                    probe.key = %key,
                    probe.target = %probe.target,
                    probe.source = %reply.source,
                    "reply source address mismatch"
                );
            }
            None => {
                tracing::debug!(probe.key = %key, probe.source = %reply.source, "reply for unknown key");
            }
        }
    }
}

/// Closes the correlator when the receiver task ends, including when its
/// runtime drops the task.
struct ReceiverExit<'a, T> {
    inner: &'a Inner<T>,
}

impl<T> Drop for ReceiverExit<'_, T> {
    fn drop(&mut self) {
        self.inner.closed.store(true, Ordering::Release);
        // Dropping the senders wakes every waiting probe
        lock(&self.inner.pending).clear();
    }
}

async fn receive_loop<T: ProbeTransport>(inner: Arc<Inner<T>>, mut queue: mpsc::Receiver<RawReply>) {
    let _exit = ReceiverExit { inner: &inner };
    loop {
        let reply = tokio::select! {
            biased;
            _ = inner.shutdown.cancelled() => break,
            reply = queue.recv() => reply,
        };
        match reply {
            Some(reply) => inner.route(reply),
            None => {
                tracing::debug!("reply queue closed");
                break;
            }
        }
    }
}

fn shut_down(operation: &'static str) -> Error {
    Error::IllegalState {
        operation,
        state: "shut down",
    }
}

/// Randomized so a restarted process does not reuse keys still in flight.
fn initial_key() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::fill(&mut bytes) {
        Ok(()) => u64::from_ne_bytes(bytes),
        Err(_) => 1,
    }
}
