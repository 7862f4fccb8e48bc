//! svc-poll: Run one service monitor against a host.
//!
//! Part of the snmp-poller CLI utilities.

use std::net::IpAddr;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use snmp_poller::cli::args::{OutputArgs, parse_key_value};
use snmp_poller::cli::output::{OutputContext, write_error};
use snmp_poller::icmp::IcmpService;
use snmp_poller::monitor::{self, MonitorParameters, PollStatus};

/// Poll a host with the ICMP, POP3 or IMAP monitor.
///
/// Exits 0 when the service is available, 2 when it is not, 1 on error.
#[derive(Debug, Parser)]
#[command(name = "svc-poll", version, about)]
struct Args {
    /// Monitor to run.
    #[arg(value_parser = ["icmp", "pop3", "imap"], ignore_case = true)]
    protocol: String,

    /// Host to poll.
    target: IpAddr,

    /// Monitor parameter, e.g. `-p retry=1 -p timeout=500 -p port=1143`.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    params: Vec<(String, String)>,

    #[command(flatten)]
    output: OutputArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    args.output.init_tracing();

    let Some(monitor) = monitor::for_protocol(&args.protocol) else {
        eprintln!("Error: unknown protocol '{}'", args.protocol);
        return ExitCode::FAILURE;
    };
    let params: MonitorParameters = args.params.iter().cloned().collect();

    let start = Instant::now();
    let result = monitor.poll(args.target, &params).await;
    let elapsed = start.elapsed();

    if monitor.name() == "ICMP"
        && args.target.is_ipv4()
        && let Ok(service) = IcmpService::shared().await
    {
        service.shutdown().await;
    }

    match result {
        Ok(status) => {
            let output_ctx = OutputContext {
                format: args.output.format,
                show_hints: !args.output.no_hints,
                force_hex: args.output.hex,
            };
            let mut stdout = std::io::stdout().lock();
            if let Err(e) =
                output_ctx.write_poll(&mut stdout, monitor.name(), args.target, status, elapsed)
            {
                eprintln!("Error writing output: {}", e);
                return ExitCode::FAILURE;
            }
            if status == PollStatus::Available {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            write_error(&e);
            ExitCode::FAILURE
        }
    }
}
