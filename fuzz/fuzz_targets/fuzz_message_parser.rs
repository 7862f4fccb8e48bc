#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_poller::message::CommunityMessage;
use snmp_poller::pdu::PduBody;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    // Whatever decodes must re-encode to something that decodes the same
    if let Ok(message) = CommunityMessage::decode(bytes.clone()) {
        let again = CommunityMessage::decode(message.encode()).expect("re-encoded message decodes");
        assert_eq!(again, message);
    }

    let mut decoder = snmp_poller::ber::Decoder::new(bytes);
    let _ = PduBody::decode(&mut decoder);
});
