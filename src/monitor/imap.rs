//! IMAP greeting and LOGOUT check.

use std::net::{IpAddr, SocketAddr};
use std::ops::ControlFlow;
use std::time::Duration;

use super::tcp::{self, AttemptError, LineSession};
use super::{BoxFuture, MonitorParameters, PollStatus, ServiceMonitor};
use crate::error::{Error, Result};
use crate::util::{IoFault, classify_io};

/// Polls an IMAP server: greeting, then `LOGOUT` answered by `BYE` and a
/// tagged `OK`.
///
/// Anything short of the full exchange is [`PollStatus::Unavailable`]. An
/// unreachable host is an error, [`Error::NoRouteToHost`], rather than a
/// verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapMonitor;

impl ImapMonitor {
    pub const DEFAULT_PORT: u16 = 143;
    pub const DEFAULT_RETRY: u32 = 0;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
    /// Command tag sent with `LOGOUT`.
    pub const TAG: &'static str = "SVCPOLL";

    /// Create the monitor.
    pub fn new() -> Self {
        Self
    }

    async fn check(&self, target: IpAddr, params: &MonitorParameters) -> Result<PollStatus> {
        let retry = params.retry(Self::DEFAULT_RETRY);
        let port = params.port(Self::DEFAULT_PORT);
        let timeout = params.timeout(Self::DEFAULT_TIMEOUT);
        let addr = SocketAddr::new(target, port);

        tracing::debug!(monitor.target = %addr, monitor.retry = retry, monitor.timeout = ?timeout, "IMAP poll");

        for attempt in 0..=retry {
            match tcp::attempt(addr, timeout, exchange).await {
                Ok(true) => return Ok(PollStatus::Available),
                Ok(false) => {
                    tracing::debug!(monitor.target = %addr, monitor.attempt = attempt, "IMAP exchange incomplete");
                }
                Err(e) => {
                    if after_failure(addr, attempt, e)?.is_break() {
                        break;
                    }
                }
            }
        }
        Ok(PollStatus::Unavailable)
    }
}

/// Whether to retry after a failed attempt. An unreachable host is an error.
fn after_failure(addr: SocketAddr, attempt: u32, e: AttemptError) -> Result<ControlFlow<()>> {
    match classify_io(&e.source) {
        IoFault::Refused => {
            tracing::debug!(monitor.target = %addr, "IMAP connection refused");
            Ok(ControlFlow::Break(()))
        }
        IoFault::NoRoute => {
            tracing::warn!(monitor.target = %addr, error = %e.source, "no route to IMAP host");
            Err(Error::NoRouteToHost {
                target: addr.ip(),
                source: e.source,
            })
        }
        IoFault::Retryable => {
            tracing::debug!(monitor.target = %addr, monitor.attempt = attempt, error = %e.source, "IMAP attempt failed");
            Ok(ControlFlow::Continue(()))
        }
    }
}

fn exchange(session: &mut LineSession) -> std::io::Result<bool> {
    let greeted = session
        .read_line()?
        .is_some_and(|line| line.starts_with("* OK "));
    if !greeted {
        return Ok(false);
    }

    session.send(&format!("{} LOGOUT\r\n", ImapMonitor::TAG))?;
    let bye = session
        .read_line()?
        .is_some_and(|line| line.starts_with("* BYE "));
    if !bye {
        return Ok(false);
    }

    let tagged_ok = format!("{} OK ", ImapMonitor::TAG);
    Ok(session
        .read_line()?
        .is_some_and(|line| line.starts_with(&tagged_ok)))
}

impl ServiceMonitor for ImapMonitor {
    fn name(&self) -> &'static str {
        "IMAP"
    }

    fn poll<'a>(
        &'a self,
        target: IpAddr,
        params: &'a MonitorParameters,
    ) -> BoxFuture<'a, Result<PollStatus>> {
        Box::pin(self.check(target, params))
    }
}
