//! snmp-trapd: Receive and print SNMP notifications.
//!
//! Part of the snmp-poller CLI utilities.

use std::io::Write;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use snmp_poller::cli::args::OutputArgs;
use snmp_poller::cli::hints::parse_oid;
use snmp_poller::cli::output::{OutputContext, write_error};
use snmp_poller::pdu::PduBody;
use snmp_poller::smi::OctetString;
use snmp_poller::trap::{SessionError, TrapSession};
use snmp_poller::{Oid, Version};

/// Listen for SNMPv1/v2c traps and informs and print each one.
#[derive(Debug, Parser)]
#[command(name = "snmp-trapd", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:162")]
    bind: String,

    /// Largest datagram accepted, in bytes.
    #[arg(long, default_value_t = 65535)]
    max_message_size: usize,

    /// Socket receive buffer size, in bytes.
    #[arg(long)]
    recv_buffer_size: Option<usize>,

    /// Only print notifications whose trap OID falls under one of these
    /// (dotted notation or well-known names such as `linkDown`).
    #[arg(short = 't', long = "trap-oid", value_name = "OID")]
    trap_oids: Vec<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    args.output.init_tracing();

    let filters: Vec<Oid> = match args.trap_oids.iter().map(|s| parse_oid(s)).collect() {
        Ok(oids) => oids,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut builder = TrapSession::builder()
        .bind(args.bind.clone())
        .max_message_size(args.max_message_size)
        .error_handler(
            |_: &TrapSession, error: SessionError, reference: Option<&Bytes>| {
                tracing::warn!(
                    error = %error,
                    bytes = reference.map(|r| r.len()).unwrap_or(0),
                    "trap session fault"
                );
            },
        );
    if let Some(size) = args.recv_buffer_size {
        builder = builder.recv_buffer_size(size);
    }

    let session = match builder.build() {
        Ok(session) => session,
        Err(e) => {
            write_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let output = Arc::new(OutputContext {
        format: args.output.format,
        show_hints: !args.output.no_hints,
        force_hex: args.output.hex,
    });
    session.add_handler(
        move |_: &TrapSession, source: SocketAddr, community: &OctetString, body: &PduBody| {
            if !matches_filters(&filters, body) {
                return;
            }
            // v1 messages are recognizable by their trap PDU only
            let version = match body {
                PduBody::TrapV1(_) => Version::V1,
                PduBody::Pdu(_) => Version::V2c,
            };
            let record = output.trap_record(source, version, community, body);
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = output.write_trap(&mut stdout, &record).and_then(|()| stdout.flush()) {
                tracing::error!(error = %e, "failed to write notification");
            }
        },
    );

    if let Err(e) = session.start().await {
        write_error(&e);
        return ExitCode::FAILURE;
    }
    if let Some(addr) = session.local_addr() {
        eprintln!("Listening on {}", addr);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Error waiting for interrupt: {}", e);
    }

    session.stop().await;
    ExitCode::SUCCESS
}

fn matches_filters(filters: &[Oid], body: &PduBody) -> bool {
    if filters.is_empty() {
        return true;
    }
    let trap_oid = match body {
        PduBody::Pdu(pdu) => pdu.trap_oid().cloned(),
        PduBody::TrapV1(trap) => Some(trap.v2_trap_oid()),
    };
    trap_oid.is_some_and(|oid| filters.iter().any(|prefix| oid.starts_with(prefix)))
}
