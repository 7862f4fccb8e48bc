//! Shared test utilities for snmp-poller integration tests.

// Allow dead code and unused imports since not all test files use all utilities
#![allow(dead_code)]
#![allow(unused_imports)]

mod fixtures;
mod probe;
mod servers;

pub use fixtures::*;
pub use probe::{ScriptedProbe, scripted_correlator};
pub use servers::{ScriptedServer, Step, refused_addr};

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
