//! Property tests for the SMI value codecs.

use bytes::Bytes;
use proptest::prelude::*;
use snmp_poller::ber::{Decoder, EncodeBuf};
use snmp_poller::error::DecodeErrorKind;
use snmp_poller::smi::{
    Counter32, Counter64, Int32, IpAddress, Null, OctetString, Opaque, SmiSyntax, SmiValue,
    TimeTicks, UInt32,
};
use snmp_poller::{Error, Oid, VarBind};

fn arb_oid() -> impl Strategy<Value = Oid> {
    // Valid OIDs: first arc 0-2, second arc 0-39
    (0u32..3, 0u32..40, prop::collection::vec(any::<u32>(), 0..12)).prop_map(
        |(arc1, arc2, rest)| {
            let mut arcs = vec![arc1, arc2];
            arcs.extend(rest);
            Oid::from_slice(&arcs)
        },
    )
}

fn arb_value() -> impl Strategy<Value = SmiValue> {
    prop_oneof![
        any::<i32>().prop_map(|v| SmiValue::Int32(Int32(v))),
        any::<u32>().prop_map(|v| SmiValue::Unsigned32(UInt32::new(v))),
        any::<u32>().prop_map(|v| SmiValue::Counter32(Counter32::new(v))),
        any::<u32>().prop_map(|v| SmiValue::TimeTicks(TimeTicks::new(v))),
        any::<u64>().prop_map(|v| SmiValue::Counter64(Counter64(v))),
        prop::collection::vec(any::<u8>(), 0..300)
            .prop_map(|v| SmiValue::OctetString(OctetString::from(v))),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(|v| SmiValue::Opaque(Opaque::from(v))),
        any::<[u8; 4]>().prop_map(|b| SmiValue::IpAddress(IpAddress(b.into()))),
        arb_oid().prop_map(SmiValue::ObjectId),
        Just(SmiValue::Null),
        Just(SmiValue::NoSuchObject),
        Just(SmiValue::NoSuchInstance),
        Just(SmiValue::EndOfMibView),
    ]
}

/// Encode with the offset API at a non-zero offset.
fn encode_at(value: &SmiValue, offset: usize) -> (Vec<u8>, usize) {
    let mut buf = vec![0u8; offset + 512];
    let end = value.encode_asn(&mut buf, offset).unwrap();
    (buf, end)
}

fn check_u32<T>(v: u32) -> Result<(), TestCaseError>
where
    T: SmiSyntax + From<u32> + Into<u32> + Copy,
{
    let mut buf = [0u8; 16];
    let end = T::from(v).encode_asn(&mut buf, 0).unwrap();
    let (next, decoded) = T::decode_asn(&buf, 0).unwrap();
    prop_assert_eq!(next, end);
    prop_assert_eq!(decoded.into(), v);
    Ok(())
}

proptest! {
    #[test]
    fn unsigned32_family_roundtrips(v in any::<u32>()) {
        check_u32::<UInt32>(v)?;
        check_u32::<Counter32>(v)?;
        check_u32::<TimeTicks>(v)?;
    }

    #[test]
    fn out_of_range_inputs_are_masked(v in any::<i64>()) {
        let expected = (v & 0xFFFF_FFFF) as u32;
        prop_assert_eq!(UInt32::from_i64(v).value(), expected);

        let mut counter = Counter32::default();
        counter.set_value(v);
        prop_assert_eq!(counter.value(), expected);
    }

    #[test]
    fn from_str_masks_wide_and_rejects_negative(v in any::<i64>()) {
        let parsed = v.to_string().parse::<TimeTicks>();
        if v < 0 {
            let is_invalid_argument = matches!(parsed, Err(Error::InvalidArgument { .. }));
            prop_assert!(is_invalid_argument);
        } else {
            prop_assert_eq!(parsed.unwrap().value(), (v & 0xFFFF_FFFF) as u32);
        }
    }

    #[test]
    fn garbage_strings_are_number_format_errors(s in "[a-z ]{1,12}") {
        let is_number_format = matches!(s.parse::<UInt32>(), Err(Error::NumberFormat { .. }));
        prop_assert!(is_number_format);
    }

    #[test]
    fn values_roundtrip_at_any_offset(value in arb_value(), offset in 0usize..32) {
        let (buf, end) = encode_at(&value, offset);
        let (next, decoded) = SmiValue::decode_asn(&buf, offset).unwrap();
        prop_assert_eq!(next, end);
        prop_assert_eq!(&decoded, &value);

        // Cursor codec produces identical bytes
        let mut cursor = EncodeBuf::new();
        value.encode(&mut cursor);
        prop_assert_eq!(&cursor.finish()[..], &buf[offset..end]);
    }

    #[test]
    fn varbinds_roundtrip(oid in arb_oid(), value in arb_value()) {
        let vb = VarBind::new(oid, value);
        let mut buf = EncodeBuf::new();
        vb.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        prop_assert_eq!(VarBind::decode(&mut decoder).unwrap(), vb);
        prop_assert!(decoder.is_empty());
    }

    #[test]
    fn decoding_never_panics(data in prop::collection::vec(any::<u8>(), 0..64), offset in 0usize..8) {
        let _ = SmiValue::decode_asn(&data, offset);
        let _ = SmiValue::decode(&mut Decoder::new(Bytes::from(data)));
    }
}

/// Decode `bytes` as `T` and expect a tag mismatch.
fn expect_tag_mismatch<T: SmiSyntax>(bytes: &[u8]) {
    let err = T::decode_asn(bytes, 0).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::UnexpectedTag { .. },
                ..
            }
        ),
        "{:?} accepted tag 0x{:02X}: {:?}",
        std::any::type_name::<T>(),
        bytes[0],
        err
    );
}

#[test]
fn every_syntax_rejects_every_other_tag() {
    let samples: Vec<SmiValue> = vec![
        SmiValue::Int32(Int32(-7)),
        SmiValue::Unsigned32(UInt32::new(7)),
        SmiValue::Counter32(Counter32::new(7)),
        SmiValue::TimeTicks(TimeTicks::new(7)),
        SmiValue::Counter64(Counter64(7)),
        SmiValue::OctetString(OctetString::from("abcd")),
        SmiValue::Opaque(Opaque::from("abcd")),
        SmiValue::IpAddress(IpAddress([10, 0, 0, 1].into())),
        SmiValue::ObjectId(Oid::from_slice(&[1, 3, 6, 1])),
        SmiValue::Null,
    ];

    for sample in &samples {
        let mut buf = [0u8; 32];
        let end = sample.encode_asn(&mut buf, 0).unwrap();
        let encoded = &buf[..end];
        let tag = sample.type_id();

        if tag != Int32::TYPE_ID {
            expect_tag_mismatch::<Int32>(encoded);
        }
        if tag != UInt32::TYPE_ID {
            expect_tag_mismatch::<UInt32>(encoded);
        }
        if tag != Counter32::TYPE_ID {
            expect_tag_mismatch::<Counter32>(encoded);
        }
        if tag != TimeTicks::TYPE_ID {
            expect_tag_mismatch::<TimeTicks>(encoded);
        }
        if tag != Counter64::TYPE_ID {
            expect_tag_mismatch::<Counter64>(encoded);
        }
        if tag != OctetString::TYPE_ID {
            expect_tag_mismatch::<OctetString>(encoded);
        }
        if tag != Opaque::TYPE_ID {
            expect_tag_mismatch::<Opaque>(encoded);
        }
        if tag != IpAddress::TYPE_ID {
            expect_tag_mismatch::<IpAddress>(encoded);
        }
        if tag != Null::TYPE_ID {
            expect_tag_mismatch::<Null>(encoded);
        }
        if tag != Oid::TYPE_ID {
            expect_tag_mismatch::<Oid>(encoded);
        }
    }
}
