//! Output formatting for CLI tools.
//!
//! Supports human-readable, JSON, and raw output formats.

use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::cli::hints;
use crate::monitor::PollStatus;
use crate::pdu::PduBody;
use crate::smi::{OctetString, SmiValue};
use crate::{Oid, VarBind, Version};

/// A received notification, ready for output.
#[derive(Debug, Serialize)]
pub struct TrapRecord {
    pub source: String,
    pub version: String,
    pub community: String,
    pub pdu_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trap_oid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trap_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_addr: Option<String>,
    pub varbinds: Vec<VarBindResult>,
}

/// A single varbind result.
#[derive(Debug, Serialize)]
pub struct VarBindResult {
    pub oid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

/// One monitor verdict, ready for output.
#[derive(Debug, Serialize)]
pub struct PollRecord {
    pub protocol: String,
    pub target: String,
    pub status: String,
    pub elapsed_ms: f64,
}

/// Output context for formatting.
pub struct OutputContext {
    pub format: OutputFormat,
    pub show_hints: bool,
    pub force_hex: bool,
}

impl OutputContext {
    /// Create a new output context with default settings.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            show_hints: true,
            force_hex: false,
        }
    }

    /// Build the record for one decoded message.
    pub fn trap_record(
        &self,
        source: SocketAddr,
        version: Version,
        community: &OctetString,
        body: &PduBody,
    ) -> TrapRecord {
        let (request_id, trap_oid, uptime, agent_addr) = match body {
            PduBody::Pdu(pdu) => (
                Some(pdu.request_id),
                pdu.trap_oid().cloned(),
                pdu.uptime().map(|t| t.value()),
                None,
            ),
            PduBody::TrapV1(trap) => (
                None,
                Some(trap.v2_trap_oid()),
                Some(trap.uptime.value()),
                Some(trap.agent_addr.to_string()),
            ),
        };

        TrapRecord {
            source: source.to_string(),
            version: version.to_string(),
            community: String::from_utf8_lossy(community.as_bytes()).into_owned(),
            pdu_type: body.pdu_type().to_string(),
            request_id,
            trap_name: trap_oid
                .as_ref()
                .filter(|_| self.show_hints)
                .and_then(hints::lookup),
            trap_oid: trap_oid.map(|oid| oid.to_string()),
            uptime,
            agent_addr,
            varbinds: body.varbinds().iter().map(|vb| self.format_varbind(vb)).collect(),
        }
    }

    /// Write one notification to `w`.
    pub fn write_trap<W: Write>(&self, w: &mut W, record: &TrapRecord) -> io::Result<()> {
        match self.format {
            OutputFormat::Human => write_trap_human(w, record),
            OutputFormat::Json => write_json(w, record),
            OutputFormat::Raw => {
                writeln!(
                    w,
                    "{}\t{}\t{}",
                    record.source,
                    record.pdu_type,
                    record.trap_oid.as_deref().unwrap_or("-")
                )?;
                for vb in &record.varbinds {
                    writeln!(w, "\t{}\t{}", vb.oid, raw_value(&vb.value))?;
                }
                Ok(())
            }
        }
    }

    /// Write one monitor verdict to `w`.
    pub fn write_poll<W: Write>(
        &self,
        w: &mut W,
        protocol: &str,
        target: IpAddr,
        status: PollStatus,
        elapsed: Duration,
    ) -> io::Result<()> {
        let record = PollRecord {
            protocol: protocol.to_string(),
            target: target.to_string(),
            status: status.to_string(),
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        };
        match self.format {
            OutputFormat::Human => writeln!(
                w,
                "{} {}: {} ({:.1}ms)",
                record.protocol, record.target, record.status, record.elapsed_ms
            ),
            OutputFormat::Json => write_json(w, &record),
            OutputFormat::Raw => writeln!(w, "{}\t{}\t{}", record.protocol, record.target, record.status),
        }
    }

    fn format_varbind(&self, vb: &VarBind) -> VarBindResult {
        let hint = if self.show_hints {
            hints::lookup(&vb.oid)
        } else {
            None
        };
        let (value_type, value, formatted) = format_value(&vb.value, self.force_hex);

        VarBindResult {
            oid: vb.oid.to_string(),
            hint,
            value_type,
            value,
            formatted,
        }
    }
}

fn write_trap_human<W: Write>(w: &mut W, record: &TrapRecord) -> io::Result<()> {
    write!(
        w,
        "{} from {} ({}, community \"{}\")",
        record.pdu_type, record.source, record.version, record.community
    )?;
    if let Some(ref oid) = record.trap_oid {
        match record.trap_name {
            Some(ref name) => write!(w, " {} ({})", oid, name)?,
            None => write!(w, " {}", oid)?,
        }
    }
    if let Some(uptime) = record.uptime {
        write!(w, " up {}", format_timeticks(uptime))?;
    }
    if let Some(ref agent) = record.agent_addr {
        write!(w, " agent {}", agent)?;
    }
    writeln!(w)?;

    for vb in &record.varbinds {
        if let Some(ref hint) = vb.hint {
            write!(w, "  {} ({})", vb.oid, hint)?;
        } else {
            write!(w, "  {}", vb.oid)?;
        }
        write!(w, " = {}: ", vb.value_type)?;
        if let Some(ref formatted) = vb.formatted {
            writeln!(w, "{}", formatted)?;
        } else {
            match &vb.value {
                serde_json::Value::String(s) => writeln!(w, "\"{}\"", s)?,
                serde_json::Value::Null => writeln!(w)?,
                other => writeln!(w, "{}", other)?,
            }
        }
    }
    Ok(())
}

fn write_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(w, "{}", json)
}

fn raw_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn format_oid(oid: &Oid) -> String {
    match hints::lookup(oid) {
        Some(name) => format!("{} ({})", oid, name),
        None => oid.to_string(),
    }
}

/// Format a value, returning (type_name, json_value, formatted_string).
fn format_value(value: &SmiValue, force_hex: bool) -> (String, serde_json::Value, Option<String>) {
    match value {
        SmiValue::Int32(v) => ("INTEGER".into(), v.value().into(), None),

        SmiValue::OctetString(s) => {
            let bytes = s.as_bytes();
            if force_hex || !is_printable(bytes) {
                (
                    "Hex-STRING".into(),
                    serde_json::Value::String(hex_string(bytes)),
                    Some(s.to_string()),
                )
            } else {
                (
                    "STRING".into(),
                    serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
                    None,
                )
            }
        }

        SmiValue::Null => ("NULL".into(), serde_json::Value::Null, None),

        SmiValue::ObjectId(oid) => (
            "OID".into(),
            serde_json::Value::String(oid.to_string()),
            Some(format_oid(oid)),
        ),

        SmiValue::IpAddress(addr) => (
            "IpAddress".into(),
            serde_json::Value::String(addr.addr().to_string()),
            None,
        ),

        SmiValue::Counter32(v) => ("Counter32".into(), v.value().into(), None),

        SmiValue::Unsigned32(v) => ("Gauge32".into(), v.value().into(), None),

        SmiValue::TimeTicks(v) => (
            "TimeTicks".into(),
            v.value().into(),
            Some(format!("({}) {}", v.value(), format_timeticks(v.value()))),
        ),

        SmiValue::Opaque(v) => (
            "Opaque".into(),
            serde_json::Value::String(hex_string(v.as_bytes())),
            Some(v.to_string()),
        ),

        SmiValue::Counter64(v) => ("Counter64".into(), v.value().into(), None),

        SmiValue::NoSuchObject => (
            "NoSuchObject".into(),
            serde_json::Value::Null,
            Some("No Such Object available".into()),
        ),

        SmiValue::NoSuchInstance => (
            "NoSuchInstance".into(),
            serde_json::Value::Null,
            Some("No Such Instance currently exists".into()),
        ),

        SmiValue::EndOfMibView => (
            "EndOfMibView".into(),
            serde_json::Value::Null,
            Some("No more variables left in this MIB View".into()),
        ),
    }
}

/// Check if bytes are printable ASCII/UTF-8.
fn is_printable(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(s) => s
            .chars()
            .all(|c| c.is_ascii_graphic() || c.is_ascii_whitespace()),
        Err(_) => false,
    }
}

/// Format bytes as hex string (lowercase, no separator).
fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Format TimeTicks as human-readable duration.
fn format_timeticks(centiseconds: u32) -> String {
    let total_seconds = centiseconds / 100;
    let cs = centiseconds % 100;

    let days = total_seconds / 86400;
    let hours = (total_seconds % 86400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if days > 0 {
        format!(
            "{}d {:02}:{:02}:{:02}.{:02}",
            days, hours, minutes, seconds, cs
        )
    } else {
        format!("{:02}:{:02}:{:02}.{:02}", hours, minutes, seconds, cs)
    }
}

/// Write an error message to stderr.
pub fn write_error(err: &crate::Error) {
    eprintln!("Error: {}", err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::pdu::Pdu;
    use crate::smi::TimeTicks;

    #[test]
    fn test_format_timeticks() {
        assert_eq!(format_timeticks(12345678), "1d 10:17:36.78");
        assert_eq!(format_timeticks(360000), "01:00:00.00");
        assert_eq!(format_timeticks(0), "00:00:00.00");
    }

    #[test]
    fn test_is_printable() {
        assert!(is_printable(b"Hello World"));
        assert!(is_printable(b""));
        assert!(!is_printable(&[0x00, 0x01, 0x02]));
        assert!(!is_printable(&[0x80, 0x81]));
    }

    #[test]
    fn test_hex_octets_keep_display_form() {
        let (ty, json, formatted) = format_value(
            &SmiValue::OctetString(OctetString::from(&[0x00u8, 0x1A][..])),
            false,
        );
        assert_eq!(ty, "Hex-STRING");
        assert_eq!(json, serde_json::Value::String("001a".into()));
        assert_eq!(formatted.as_deref(), Some("00 1A "));
    }

    #[test]
    fn test_trap_record_human() {
        let pdu = Pdu::trap_v2(
            9,
            TimeTicks::new(360000),
            oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3),
            vec![VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 4), 4)],
        );
        let ctx = OutputContext::new(OutputFormat::Human);
        let record = ctx.trap_record(
            "192.0.2.1:5000".parse().unwrap(),
            Version::V2c,
            &OctetString::from("public"),
            &PduBody::Pdu(pdu),
        );
        assert_eq!(record.trap_name.as_deref(), Some("linkDown"));
        assert_eq!(record.uptime, Some(360000));

        let mut out = Vec::new();
        ctx.write_trap(&mut out, &record).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("linkDown"));
        assert!(text.contains("up 01:00:00.00"));
        assert!(text.contains("ifIndex.4"));
    }

    #[test]
    fn test_poll_json() {
        let ctx = OutputContext::new(OutputFormat::Json);
        let mut out = Vec::new();
        ctx.write_poll(
            &mut out,
            "POP3",
            "192.0.2.1".parse().unwrap(),
            PollStatus::Available,
            Duration::from_millis(12),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["status"], "AVAILABLE");
    }
}
