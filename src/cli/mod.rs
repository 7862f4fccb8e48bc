//! CLI utilities for snmp-poller.
//!
//! This module provides command-line argument parsing, output formatting,
//! and OID hint resolution for the `snmp-trapd` and `svc-poll` tools.
//!
//! This module is only available with the `cli` feature.

pub mod args;
pub mod hints;
pub mod output;
