//! Monitor verdicts against scripted loopback servers.

mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use common::{ScriptedServer, Step, refused_addr, scripted_correlator};
use snmp_poller::monitor::{IcmpMonitor, ImapMonitor, MonitorParameters, PollStatus, Pop3Monitor, ServiceMonitor};
use snmp_poller::Error;
use tokio_util::sync::CancellationToken;

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn params(port: u16) -> MonitorParameters {
    MonitorParameters::new()
        .with("port", port.to_string())
        .with("timeout", "1000")
}

// =============================================================================
// POP3
// =============================================================================

#[tokio::test]
async fn pop3_ok_banner_and_quit_is_available() {
    common::init_tracing();
    static SCRIPT: &[Step] = &[Step::Send("+OK ready\r\n"), Step::Receive, Step::Send("+OK bye\r\n")];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = Pop3Monitor::new()
        .poll(LOOPBACK, &params(server.port()))
        .await
        .unwrap();

    assert_eq!(status, PollStatus::Available);
    assert_eq!(server.received(), vec!["QUIT\r\n".to_string()]);
}

#[tokio::test]
async fn pop3_err_banner_is_unavailable() {
    static SCRIPT: &[Step] = &[Step::Send("-ERR go away\r\n"), Step::Receive];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = Pop3Monitor::new()
        .poll(LOOPBACK, &params(server.port()))
        .await
        .unwrap();
    assert_eq!(status, PollStatus::Unavailable);
}

#[tokio::test]
async fn pop3_bad_quit_response_is_unavailable() {
    static SCRIPT: &[Step] = &[Step::Send("+OK ready\r\n"), Step::Receive, Step::Send("-ERR\r\n")];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = Pop3Monitor::new()
        .poll(LOOPBACK, &params(server.port()))
        .await
        .unwrap();
    assert_eq!(status, PollStatus::Unavailable);
}

#[tokio::test]
async fn pop3_empty_banner_is_unresponsive_and_retried() {
    static SCRIPT: &[Step] = &[Step::Close];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = Pop3Monitor::new()
        .poll(LOOPBACK, &params(server.port()).with("retry", "2"))
        .await
        .unwrap();

    assert_eq!(status, PollStatus::Unresponsive);
    assert_eq!(server.connections(), 3);
}

#[tokio::test]
async fn pop3_silent_server_is_unresponsive() {
    static SCRIPT: &[Step] = &[Step::Receive];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = Pop3Monitor::new()
        .poll(
            LOOPBACK,
            &MonitorParameters::new()
                .with("port", server.port().to_string())
                .with("timeout", "50"),
        )
        .await
        .unwrap();
    assert_eq!(status, PollStatus::Unresponsive);
}

#[tokio::test]
async fn pop3_refused_is_unavailable_without_retries() {
    let addr = refused_addr();
    let started = std::time::Instant::now();

    let status = Pop3Monitor::new()
        .poll(
            LOOPBACK,
            &params(addr.port()).with("retry", "5").with("timeout", "2000"),
        )
        .await
        .unwrap();

    assert_eq!(status, PollStatus::Unavailable);
    assert!(started.elapsed() < Duration::from_secs(2));
}

// =============================================================================
// IMAP
// =============================================================================

#[tokio::test]
async fn imap_full_logout_is_available() {
    static SCRIPT: &[Step] = &[
        Step::Send("* OK IMAP4rev1 ready\r\n"),
        Step::Receive,
        Step::Send("* BYE logging out\r\n"),
        Step::Send("SVCPOLL OK LOGOUT completed\r\n"),
    ];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = ImapMonitor::new()
        .poll(LOOPBACK, &params(server.port()))
        .await
        .unwrap();

    assert_eq!(status, PollStatus::Available);
    assert_eq!(
        server.received(),
        vec![format!("{} LOGOUT\r\n", ImapMonitor::TAG)]
    );
}

#[tokio::test]
async fn imap_missing_bye_is_unavailable() {
    static SCRIPT: &[Step] = &[
        Step::Send("* OK ready\r\n"),
        Step::Receive,
        Step::Send("SVCPOLL OK LOGOUT completed\r\n"),
    ];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = ImapMonitor::new()
        .poll(LOOPBACK, &params(server.port()))
        .await
        .unwrap();
    assert_eq!(status, PollStatus::Unavailable);
}

#[tokio::test]
async fn imap_wrong_greeting_is_retried_then_unavailable() {
    static SCRIPT: &[Step] = &[Step::Send("* PREAUTH hi\r\n"), Step::Close];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = ImapMonitor::new()
        .poll(LOOPBACK, &params(server.port()).with("retry", "1"))
        .await
        .unwrap();

    assert_eq!(status, PollStatus::Unavailable);
    assert_eq!(server.connections(), 2);
}

#[tokio::test]
async fn imap_refused_is_unavailable() {
    let addr = refused_addr();
    let status = ImapMonitor::new()
        .poll(LOOPBACK, &params(addr.port()).with("retry", "3"))
        .await
        .unwrap();
    assert_eq!(status, PollStatus::Unavailable);
}

// =============================================================================
// ICMP
// =============================================================================

const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));

#[tokio::test]
async fn icmp_no_reply_is_unavailable_after_three_sends() {
    let (correlator, _tx) = scripted_correlator(None);
    let monitor = IcmpMonitor::with_correlator(correlator.clone());

    let status = monitor
        .poll(
            TARGET,
            &MonitorParameters::new()
                .with("retry", "2")
                .with("timeout", "50"),
        )
        .await
        .unwrap();

    assert_eq!(status, PollStatus::Unavailable);
    assert_eq!(correlator.transport().sends(), 3);
    assert_eq!(correlator.pending_len(), 0);
}

#[tokio::test]
async fn icmp_reply_is_available() {
    let (correlator, _tx) = scripted_correlator(Some(TARGET));
    let monitor = IcmpMonitor::with_correlator(correlator.clone());

    let status = monitor.poll(TARGET, &MonitorParameters::new()).await.unwrap();

    assert_eq!(status, PollStatus::Available);
    assert_eq!(correlator.transport().sends(), 1);
}

#[tokio::test]
async fn icmp_cancellation_surfaces_as_error() {
    let (correlator, _tx) = scripted_correlator(None);
    let token = CancellationToken::new();
    let monitor = IcmpMonitor::with_correlator(correlator.clone()).cancel_on(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let err = monitor
        .poll(TARGET, &MonitorParameters::new().with("timeout", "5000"))
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, Error::Cancelled { .. }));
    assert_eq!(correlator.pending_len(), 0);
}

#[tokio::test]
async fn icmp_ipv6_target_is_invalid_argument() {
    let (correlator, _tx) = scripted_correlator(None);
    let monitor = IcmpMonitor::with_correlator(correlator.clone());

    let err = monitor
        .poll("::1".parse().unwrap(), &MonitorParameters::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(correlator.transport().sends(), 0);
}

#[tokio::test]
async fn imap_zero_timeout_means_no_timeout() {
    static SCRIPT: &[Step] = &[
        Step::Send("* OK ready\r\n"),
        Step::Receive,
        Step::Send("* BYE logging out\r\n"),
        Step::Send("SVCPOLL OK LOGOUT completed\r\n"),
    ];
    let server = ScriptedServer::start(SCRIPT).await;

    let status = ImapMonitor::new()
        .poll(
            LOOPBACK,
            &MonitorParameters::new()
                .with("port", server.port().to_string())
                .with("timeout", "0"),
        )
        .await
        .unwrap();

    assert_eq!(status, PollStatus::Available);
    assert_eq!(server.connections(), 1);
}
