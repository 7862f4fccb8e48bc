//! POP3 banner check.

use std::net::{IpAddr, SocketAddr};
use std::ops::ControlFlow;
use std::time::Duration;

use super::tcp::{self, AttemptError, first_token};
use super::{BoxFuture, MonitorParameters, PollStatus, ServiceMonitor};
use crate::error::Result;
use crate::util::{IoFault, classify_io};

/// Polls a POP3 server: expects `+OK` on connect and again after `QUIT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pop3Monitor;

impl Pop3Monitor {
    pub const DEFAULT_PORT: u16 = 110;
    pub const DEFAULT_RETRY: u32 = 0;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

    /// Create the monitor.
    pub fn new() -> Self {
        Self
    }

    async fn check(&self, target: IpAddr, params: &MonitorParameters) -> PollStatus {
        let retry = params.retry(Self::DEFAULT_RETRY);
        let port = params.port(Self::DEFAULT_PORT);
        let timeout = params.timeout(Self::DEFAULT_TIMEOUT) + Duration::from_millis(1);
        let addr = SocketAddr::new(target, port);

        tracing::debug!(monitor.target = %addr, monitor.retry = retry, monitor.timeout = ?timeout, "POP3 poll");

        let mut status = PollStatus::Unavailable;
        for attempt in 0..=retry {
            match tcp::attempt(addr, timeout, exchange).await {
                Ok(verdict) => {
                    tracing::debug!(monitor.target = %addr, monitor.attempt = attempt, status = %verdict, "POP3 attempt");
                    status = verdict;
                    if status == PollStatus::Available {
                        break;
                    }
                }
                Err(e) => match after_failure(addr, attempt, status, &e) {
                    ControlFlow::Continue(next) => status = next,
                    ControlFlow::Break(last) => {
                        status = last;
                        break;
                    }
                },
            }
        }
        status
    }
}

/// Status after a failed attempt. `Break` ends the poll.
///
/// A failure after connecting counts as unresponsive; a connect failure
/// keeps the previous status. Refused and unreachable hosts are not retried.
fn after_failure(
    addr: SocketAddr,
    attempt: u32,
    status: PollStatus,
    e: &AttemptError,
) -> ControlFlow<PollStatus, PollStatus> {
    let status = if e.connected {
        PollStatus::Unresponsive
    } else {
        status
    };
    match classify_io(&e.source) {
        IoFault::Refused => {
            tracing::debug!(monitor.target = %addr, monitor.attempt = attempt, "POP3 connection refused");
            ControlFlow::Break(PollStatus::Unavailable)
        }
        IoFault::NoRoute => {
            tracing::warn!(monitor.target = %addr, error = %e.source, "no route to POP3 host");
            ControlFlow::Break(PollStatus::Unavailable)
        }
        IoFault::Retryable => {
            tracing::debug!(monitor.target = %addr, monitor.attempt = attempt, error = %e.source, "POP3 attempt failed");
            ControlFlow::Continue(status)
        }
    }
}

/// One connection: banner, QUIT, response.
fn exchange(session: &mut tcp::LineSession) -> std::io::Result<PollStatus> {
    let Some(banner) = session.read_line()? else {
        return Ok(PollStatus::Unresponsive);
    };
    if first_token(&banner) != Some("+OK") {
        return Ok(PollStatus::Unavailable);
    }

    session.send("QUIT\r\n")?;
    let response = session.read_line()?.unwrap_or_default();
    if first_token(&response) == Some("+OK") {
        Ok(PollStatus::Available)
    } else {
        Ok(PollStatus::Unavailable)
    }
}

impl ServiceMonitor for Pop3Monitor {
    fn name(&self) -> &'static str {
        "POP3"
    }

    fn poll<'a>(
        &'a self,
        target: IpAddr,
        params: &'a MonitorParameters,
    ) -> BoxFuture<'a, Result<PollStatus>> {
        Box::pin(async move { Ok(self.check(target, params).await) })
    }
}
