//! ICMPv4 echo packet codec.
//!
//! ```text
//!  0       1       2               4               6               8
//! +-------+-------+---------------+---------------+---------------+
//! | type  | code  |   checksum    |  identifier   |   sequence    |
//! +-------+-------+---------------+---------------+---------------+
//! |                   correlation key (u64, BE)                   |
//! |                 send timestamp, ns (u64, BE)                  |
//! |                       signature (8 bytes)                     |
//! |                        padding (8 bytes)                      |
//! +---------------------------------------------------------------+
//! ```

use crate::correlator::CorrelationKey;

/// Echo request type.
pub const ECHO_REQUEST: u8 = 8;
/// Echo reply type.
pub const ECHO_REPLY: u8 = 0;
/// Header plus payload.
pub const PACKET_LEN: usize = 40;
/// Marks payloads produced by this crate.
pub const SIGNATURE: [u8; 8] = *b"SvcPoll1";

/// One echo request or reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoPacket {
    /// [`ECHO_REQUEST`] or [`ECHO_REPLY`].
    pub kind: u8,
    /// Filter identity of the sending process.
    pub identifier: u16,
    /// Per-service counter.
    pub sequence: u16,
    /// Correlation key.
    pub key: CorrelationKey,
    /// Sender's clock at send time, in nanoseconds.
    pub sent_at_nanos: u64,
}

impl EchoPacket {
    /// Build an echo request.
    pub fn request(identifier: u16, sequence: u16, key: CorrelationKey, sent_at_nanos: u64) -> Self {
        Self {
            kind: ECHO_REQUEST,
            identifier,
            sequence,
            key,
            sent_at_nanos,
        }
    }

    /// Serialize with a valid checksum.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out[0] = self.kind;
        out[4..6].copy_from_slice(&self.identifier.to_be_bytes());
        out[6..8].copy_from_slice(&self.sequence.to_be_bytes());
        out[8..16].copy_from_slice(&self.key.0.to_be_bytes());
        out[16..24].copy_from_slice(&self.sent_at_nanos.to_be_bytes());
        out[24..32].copy_from_slice(&SIGNATURE);
        let sum = checksum(&out);
        out[2..4].copy_from_slice(&sum.to_be_bytes());
        out
    }

    /// Parse an ICMP message (without IP header).
    ///
    /// Returns `None` for anything that is not a signed echo packet.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < PACKET_LEN || data[1] != 0 {
            return None;
        }
        if data[24..32] != SIGNATURE {
            return None;
        }
        let kind = data[0];
        if kind != ECHO_REQUEST && kind != ECHO_REPLY {
            return None;
        }
        Some(Self {
            kind,
            identifier: u16::from_be_bytes([data[4], data[5]]),
            sequence: u16::from_be_bytes([data[6], data[7]]),
            key: CorrelationKey(u64::from_be_bytes(data[8..16].try_into().ok()?)),
            sent_at_nanos: u64::from_be_bytes(data[16..24].try_into().ok()?),
        })
    }
}

/// RFC 1071 Internet checksum.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for pair in &mut chunks {
        sum += u16::from_be_bytes([pair[0], pair[1]]) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += (*last as u32) << 8;
    }
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Strip an IPv4 header if present.
///
/// Raw sockets deliver the IP header; datagram ICMP sockets do not.
pub fn strip_ip_header(data: &[u8]) -> &[u8] {
    match data.first() {
        Some(b) if b >> 4 == 4 => {
            let ihl = ((b & 0x0F) as usize) * 4;
            if ihl < 20 {
                return &[];
            }
            data.get(ihl..).unwrap_or(&[])
        }
        _ => data,
    }
}
