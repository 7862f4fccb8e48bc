//! ICMP echo check.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{BoxFuture, MonitorParameters, PollStatus, ServiceMonitor};
use crate::correlator::{Correlator, ProbeOutcome, ProbeTransport, RetryPolicy};
use crate::error::{Error, Result};
use crate::icmp::{IcmpService, IcmpTransport};

enum Prober<T> {
    Shared,
    Service(Arc<IcmpService>),
    Correlator(Correlator<T>),
}

/// Polls a host with ICMP echo requests.
///
/// By default probes go through [`IcmpService::shared`], which is started on
/// the first poll. IPv4 only.
pub struct IcmpMonitor<T = IcmpTransport> {
    prober: Prober<T>,
    cancel: Option<CancellationToken>,
}

impl IcmpMonitor {
    pub const DEFAULT_RETRY: u32 = 2;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(800);

    /// Probe through the process-wide service.
    pub fn new() -> Self {
        Self {
            prober: Prober::Shared,
            cancel: None,
        }
    }

    /// Probe through an explicitly started service.
    pub fn with_service(service: Arc<IcmpService>) -> Self {
        Self {
            prober: Prober::Service(service),
            cancel: None,
        }
    }
}

impl Default for IcmpMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ProbeTransport> IcmpMonitor<T> {
    /// Probe through a correlator with any transport.
    pub fn with_correlator(correlator: Correlator<T>) -> Self {
        Self {
            prober: Prober::Correlator(correlator),
            cancel: None,
        }
    }

    /// Abort in-flight polls with [`Error::Cancelled`] when `token` fires.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    async fn check(&self, target: IpAddr, params: &MonitorParameters) -> Result<PollStatus> {
        if target.is_ipv6() {
            return Err(Error::invalid_argument(format!(
                "ICMP monitor is IPv4 only, got {}",
                target
            )));
        }

        let policy = RetryPolicy::new(
            params.retry(IcmpMonitor::<IcmpTransport>::DEFAULT_RETRY),
            params.timeout(IcmpMonitor::<IcmpTransport>::DEFAULT_TIMEOUT),
        );
        let cancel = self.cancel.as_ref();

        let outcome = match &self.prober {
            Prober::Shared => IcmpService::shared().await?.ping(target, policy, cancel).await?,
            Prober::Service(service) => service.ping(target, policy, cancel).await?,
            Prober::Correlator(correlator) => correlator.probe(target, policy, cancel).await?,
        };

        match outcome {
            ProbeOutcome::Answered { rtt, attempts } => {
                tracing::debug!(
                    monitor.target = %target,
                    monitor.attempt = attempts,
                    monitor.rtt = ?rtt,
                    "ICMP reply"
                );
                Ok(PollStatus::Available)
            }
            ProbeOutcome::Unanswered { attempts } => {
                tracing::debug!(monitor.target = %target, monitor.attempt = attempts, "ICMP unanswered");
                Ok(PollStatus::Unavailable)
            }
        }
    }
}

impl<T> std::fmt::Debug for IcmpMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prober = match &self.prober {
            Prober::Shared => "shared",
            Prober::Service(_) => "service",
            Prober::Correlator(_) => "correlator",
        };
        f.debug_struct("IcmpMonitor")
            .field("prober", &prober)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl<T: ProbeTransport> ServiceMonitor for IcmpMonitor<T> {
    fn name(&self) -> &'static str {
        "ICMP"
    }

    fn poll<'a>(
        &'a self,
        target: IpAddr,
        params: &'a MonitorParameters,
    ) -> BoxFuture<'a, Result<PollStatus>> {
        Box::pin(self.check(target, params))
    }
}
