//! BER (Basic Encoding Rules) codec for SNMP.
//!
//! This module provides encoding and decoding of BER-encoded data as used in SNMP.
//! The implementation follows X.690 with permissive parsing aligned with net-snmp behavior.
//!
//! The offset-based `build_*`/`parse_*` functions are pure: they only touch
//! the buffer they are given, so independent buffers can be processed from
//! any number of threads at once.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
