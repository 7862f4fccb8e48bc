//! Well-known OID name hints.
//!
//! A small hardcoded table of notification-related OID names for display
//! purposes. This is NOT MIB support.

use crate::Oid;

/// Well-known OID entries.
static WELL_KNOWN_OIDS: &[(&[u32], &str)] = &[
    // SNMPv2-MIB::system
    (&[1, 3, 6, 1, 2, 1, 1, 1, 0], "sysDescr.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 3, 0], "sysUpTime.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 5, 0], "sysName.0"),
    // SNMPv2-MIB::snmpTrap
    (&[1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0], "snmpTrapOID.0"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 4, 3, 0], "snmpTrapEnterprise.0"),
    // SNMPv2-MIB::snmpTraps
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 1], "coldStart"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 2], "warmStart"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 3], "linkDown"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 4], "linkUp"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 5], "authenticationFailure"),
    // IF-MIB::ifEntry columns commonly bound in link traps
    (&[1, 3, 6, 1, 2, 1, 2, 2, 1, 1], "ifIndex"),
    (&[1, 3, 6, 1, 2, 1, 2, 2, 1, 7], "ifAdminStatus"),
    (&[1, 3, 6, 1, 2, 1, 2, 2, 1, 8], "ifOperStatus"),
];

/// Look up a friendly name for an OID.
///
/// Table columns match with any instance suffix, e.g. `ifIndex.3`.
pub fn lookup(oid: &Oid) -> Option<String> {
    let arcs = oid.arcs();
    if let Some((_, name)) = WELL_KNOWN_OIDS.iter().find(|(pattern, _)| *pattern == arcs) {
        return Some((*name).to_string());
    }
    WELL_KNOWN_OIDS
        .iter()
        .filter(|(pattern, name)| !name.ends_with(".0") && arcs.starts_with(pattern))
        .max_by_key(|(pattern, _)| pattern.len())
        .map(|(pattern, name)| {
            let suffix: Vec<String> = arcs[pattern.len()..].iter().map(u32::to_string).collect();
            format!("{}.{}", name, suffix.join("."))
        })
}

/// Parse an OID from string, supporting both dotted notation and well-known names.
///
/// Accepts:
/// - Dotted notation: "1.3.6.1.6.3.1.1.5.3"
/// - Well-known names: "linkDown", "coldStart"
pub fn parse_oid(s: &str) -> Result<Oid, String> {
    if s.trim_start_matches('.')
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
    {
        return s
            .parse::<Oid>()
            .map_err(|e| format!("invalid OID '{}': {}", s, e));
    }

    let lower = s.to_ascii_lowercase();
    WELL_KNOWN_OIDS
        .iter()
        .find(|(_, name)| name.to_ascii_lowercase() == lower)
        .map(|(arcs, _)| Oid::from_slice(arcs))
        .ok_or_else(|| format!("unknown OID name '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_lookup_exact() {
        assert_eq!(lookup(&oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3)).as_deref(), Some("linkDown"));
        assert_eq!(lookup(&oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)).as_deref(), Some("sysUpTime.0"));
        assert_eq!(lookup(&oid!(1, 3, 6, 1, 4, 1)), None);
    }

    #[test]
    fn test_lookup_column_instance() {
        assert_eq!(
            lookup(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8, 12)).as_deref(),
            Some("ifOperStatus.12")
        );
    }

    #[test]
    fn test_parse_oid() {
        assert_eq!(parse_oid("linkup").unwrap(), oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 4));
        assert_eq!(parse_oid(".1.3.6.1").unwrap(), oid!(1, 3, 6, 1));
        assert!(parse_oid("nonsense").is_err());
        assert!(parse_oid("1.3.x").is_err());
    }
}
