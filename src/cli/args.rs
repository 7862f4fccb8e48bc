//! Shared command-line arguments.

use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::monitor::parse_assignment;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One readable line per record.
    #[default]
    Human,
    /// Pretty-printed JSON per record.
    Json,
    /// Tab-separated fields, no decoration.
    Raw,
}

/// Output and logging options shared by every tool.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format.
    #[arg(short = 'O', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Log protocol activity to stderr (repeat for more detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Do not annotate well-known OIDs with names.
    #[arg(long)]
    pub no_hints: bool,

    /// Always render octet strings as hex.
    #[arg(short = 'x', long)]
    pub hex: bool,
}

impl OutputArgs {
    /// Install a stderr `tracing` subscriber.
    ///
    /// `RUST_LOG` wins when set; otherwise the level follows `--verbose`.
    pub fn init_tracing(&self) {
        let default_level = match self.verbose {
            0 => "warn",
            1 => "snmp_poller=debug",
            _ => "snmp_poller=trace",
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// clap value parser for `key=value`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    parse_assignment(s)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .map_err(|e| e.to_string())
}
