#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_poller::ber::{Decoder, parse_header, parse_integer32, parse_oid, parse_uinteger32};
use snmp_poller::smi::SmiValue;
use snmp_poller::varbind::VarBind;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    // Cursor-style decoder primitives
    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_integer();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_octet_string();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_null();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_oid();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_sequence();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_ip_address();

    // Offset-based primitives
    let _ = parse_header(data, 0);
    let _ = parse_integer32(data, 0);
    let _ = parse_uinteger32(data, 0);
    let _ = parse_oid(data, 0);

    // Every SMI syntax, both decode paths
    let _ = SmiValue::decode_asn(data, 0);
    let mut decoder = Decoder::new(bytes.clone());
    let _ = SmiValue::decode(&mut decoder);

    let mut decoder = Decoder::new(bytes);
    let _ = VarBind::decode(&mut decoder);
});
