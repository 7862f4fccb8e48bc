//! Variable binding (VarBind) type.
//!
//! A VarBind pairs an OID with a value.

use crate::ber::{Decoder, EncodeBuf};
use crate::error::Result;
use crate::oid::Oid;
use crate::smi::SmiValue;

/// Variable binding - an OID-value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarBind {
    /// The object identifier.
    pub oid: Oid,
    /// The value.
    pub value: SmiValue,
}

impl VarBind {
    /// Create a new VarBind.
    pub fn new(oid: Oid, value: impl Into<SmiValue>) -> Self {
        Self {
            oid,
            value: value.into(),
        }
    }

    /// Create a VarBind with a NULL value.
    pub fn null(oid: Oid) -> Self {
        Self {
            oid,
            value: SmiValue::Null,
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.value.encode(buf);
            buf.push_oid(&self.oid);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let oid = seq.read_oid()?;
        let value = SmiValue::decode(&mut seq)?;
        seq.expect_end()?;
        Ok(VarBind { oid, value })
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// Encode a list of VarBinds.
pub fn encode_varbind_list(buf: &mut EncodeBuf, varbinds: &[VarBind]) {
    buf.push_sequence(|buf| {
        // Encode in reverse order since we're using reverse buffer
        for vb in varbinds.iter().rev() {
            vb.encode(buf);
        }
    });
}

/// Decode a list of VarBinds.
pub fn decode_varbind_list(decoder: &mut Decoder) -> Result<Vec<VarBind>> {
    let mut seq = decoder.read_sequence()?;
    let mut varbinds = Vec::new();

    while !seq.is_empty() {
        varbinds.push(VarBind::decode(&mut seq)?);
    }

    Ok(varbinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::smi::{Counter32, TimeTicks};

    #[test]
    fn test_varbind_roundtrip() {
        let vb = VarBind::new(oid!(1, 3, 6, 1), 42);

        let mut buf = EncodeBuf::new();
        vb.encode(&mut buf);
        let bytes = buf.finish();

        let mut decoder = Decoder::new(bytes);
        let decoded = VarBind::decode(&mut decoder).unwrap();

        assert_eq!(vb, decoded);
    }

    #[test]
    fn test_varbind_list_preserves_order() {
        let varbinds = vec![
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), TimeTicks::new(500)),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1), Counter32::new(9)),
            VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)),
        ];

        let mut buf = EncodeBuf::new();
        encode_varbind_list(&mut buf, &varbinds);
        let bytes = buf.finish();

        let mut decoder = Decoder::new(bytes);
        let decoded = decode_varbind_list(&mut decoder).unwrap();

        assert_eq!(varbinds, decoded);
    }

    #[test]
    fn test_varbind_exception_value() {
        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), SmiValue::NoSuchObject);

        let mut buf = EncodeBuf::new();
        vb.encode(&mut buf);
        let bytes = buf.finish();
        assert_eq!(&bytes[bytes.len() - 2..], &[0x80, 0x00]);

        let mut decoder = Decoder::new(bytes);
        assert_eq!(VarBind::decode(&mut decoder).unwrap(), vb);
    }

    #[test]
    fn test_varbind_rejects_extra_element() {
        // SEQUENCE { OID 1.3, NULL, NULL }
        let data = [0x30, 0x07, 0x06, 0x01, 0x2B, 0x05, 0x00, 0x05, 0x00];
        let mut decoder = Decoder::from_slice(&data);
        assert!(VarBind::decode(&mut decoder).is_err());
    }

    #[test]
    fn test_display() {
        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), "router1");
        assert_eq!(vb.to_string(), "1.3.6.1.2.1.1.5.0 = router1");
    }
}
