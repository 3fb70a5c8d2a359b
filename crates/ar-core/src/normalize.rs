//! Identifier and severity normalization.
//!
//! Every function here is total: malformed input yields `None` (or the
//! lowest severity) instead of an error, so one bad identifier never stops
//! a record from being ingested.

use crate::models::Severity;
use std::net::IpAddr;

/// Domain suffixes commonly appended by internal DNS.
pub const INTERNAL_SUFFIXES: [&str; 8] = [
    ".local",
    ".internal",
    ".corp",
    ".lan",
    ".home",
    ".localdomain",
    ".ad",
    ".domain",
];

/// Normalizes a hostname for matching, stripping one internal DNS suffix.
///
/// `"WEB01.Corp.LOCAL"` becomes `"web01.corp"`; `"  DB-Server.internal "`
/// becomes `"db-server"`.
pub fn normalize_hostname(value: &str) -> Option<String> {
    normalize_hostname_with(value, true)
}

/// Normalizes a hostname, optionally keeping internal suffixes.
pub fn normalize_hostname_with(value: &str, strip_internal_suffixes: bool) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut result = trimmed.to_lowercase();
    if strip_internal_suffixes {
        if let Some(suffix) = INTERNAL_SUFFIXES.iter().find(|s| result.ends_with(*s)) {
            result.truncate(result.len() - suffix.len());
        }
    }

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// Parses an IPv4 or IPv6 address and returns its canonical string form.
pub fn normalize_ip(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// Normalizes a MAC address to lowercase colon-separated octets.
///
/// Accepts `AA:BB:CC:DD:EE:FF`, `AA-BB-CC-DD-EE-FF`, the Cisco dotted form
/// `AABB.CCDD.EEFF` and bare `AABBCCDDEEFF`.
pub fn normalize_mac(value: &str) -> Option<String> {
    let raw: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if raw.len() != 12 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let octets: Vec<&str> = (0..12).step_by(2).map(|i| &raw[i..i + 2]).collect();
    Some(octets.join(":"))
}

/// Serial numbers compare case-insensitively.
pub fn normalize_serial(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Agent IDs are vendor-issued and compared verbatim after trimming.
pub fn normalize_agent_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Severity mapping table for one scanner family.
type SeverityTable = &'static [(&'static str, Severity)];

const QUALYS_SEVERITY: SeverityTable = &[
    ("5", Severity::Critical),
    ("4", Severity::High),
    ("3", Severity::Medium),
    ("2", Severity::Low),
    ("1", Severity::Low),
];

const NESSUS_SEVERITY: SeverityTable = &[
    ("Critical", Severity::Critical),
    ("High", Severity::High),
    ("Medium", Severity::Medium),
    ("Low", Severity::Low),
    ("Info", Severity::Low),
    ("Informational", Severity::Low),
    ("None", Severity::Low),
];

const TENABLE_SEVERITY: SeverityTable = &[
    ("Critical", Severity::Critical),
    ("High", Severity::High),
    ("Medium", Severity::Medium),
    ("Low", Severity::Low),
    ("Informational", Severity::Low),
];

const RAPID7_SEVERITY: SeverityTable = &[
    ("Critical", Severity::Critical),
    ("Severe", Severity::Critical),
    ("High", Severity::High),
    ("Moderate", Severity::Medium),
    ("Medium", Severity::Medium),
    ("Low", Severity::Low),
];

// OpenVAS rates one level lower than everyone else.
const OPENVAS_SEVERITY: SeverityTable = &[
    ("High", Severity::Critical),
    ("Medium", Severity::High),
    ("Low", Severity::Medium),
    ("Log", Severity::Low),
];

const GENERIC_SEVERITY: SeverityTable = &[
    ("Critical", Severity::Critical),
    ("High", Severity::High),
    ("Medium", Severity::Medium),
    ("Moderate", Severity::Medium),
    ("Low", Severity::Low),
    ("Informational", Severity::Low),
    ("Info", Severity::Low),
];

fn severity_table(scanner: &str) -> SeverityTable {
    match scanner.to_lowercase().as_str() {
        "qualys" => QUALYS_SEVERITY,
        "nessus" => NESSUS_SEVERITY,
        "tenable" => TENABLE_SEVERITY,
        "rapid7" => RAPID7_SEVERITY,
        "openvas" => OPENVAS_SEVERITY,
        _ => GENERIC_SEVERITY,
    }
}

/// Maps a scanner's raw severity onto the four normalized levels.
///
/// Unknown scanners use the generic table; unknown values map to `Low`.
pub fn normalize_severity(raw: Option<&str>, scanner: &str) -> Severity {
    let Some(raw) = raw else {
        return Severity::Low;
    };
    let value = raw.trim();
    let table = severity_table(scanner);

    table
        .iter()
        .find(|(key, _)| *key == value)
        .or_else(|| table.iter().find(|(key, _)| key.eq_ignore_ascii_case(value)))
        .map(|(_, severity)| *severity)
        .unwrap_or(Severity::Low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_lowercases_and_trims() {
        assert_eq!(normalize_hostname("  WEB01  "), Some("web01".to_string()));
        assert_eq!(
            normalize_hostname("app01.prod.example.com"),
            Some("app01.prod.example.com".to_string())
        );
    }

    #[test]
    fn test_hostname_strips_one_internal_suffix() {
        assert_eq!(normalize_hostname("DB-Server.internal"), Some("db-server".to_string()));
        assert_eq!(normalize_hostname("ws01.localdomain"), Some("ws01".to_string()));
        // Only the outermost suffix is removed.
        assert_eq!(normalize_hostname("WEB01.Corp.LOCAL"), Some("web01.corp".to_string()));
    }

    #[test]
    fn test_hostname_without_stripping() {
        assert_eq!(
            normalize_hostname_with("web01.corp", false),
            Some("web01.corp".to_string())
        );
    }

    #[test]
    fn test_hostname_empty_inputs() {
        assert_eq!(normalize_hostname(""), None);
        assert_eq!(normalize_hostname("   "), None);
        assert_eq!(normalize_hostname(".local"), None);
    }

    #[test]
    fn test_ip_normalization() {
        assert_eq!(normalize_ip("  10.0.0.1  "), Some("10.0.0.1".to_string()));
        assert_eq!(
            normalize_ip("2001:0DB8:0000:0000:0000:0000:0000:0001"),
            Some("2001:db8::1".to_string())
        );
        assert_eq!(normalize_ip("not-an-ip"), None);
        assert_eq!(normalize_ip("10.0.0.256"), None);
        assert_eq!(normalize_ip(""), None);
    }

    #[test]
    fn test_mac_formats() {
        let expected = Some("aa:bb:cc:dd:ee:ff".to_string());
        assert_eq!(normalize_mac("AA:BB:CC:DD:EE:FF"), expected);
        assert_eq!(normalize_mac("AA-BB-CC-DD-EE-FF"), expected);
        assert_eq!(normalize_mac("AABB.CCDD.EEFF"), expected);
        assert_eq!(normalize_mac("aabbccddeeff"), expected);
    }

    #[test]
    fn test_mac_invalid() {
        assert_eq!(normalize_mac("AA:BB:CC:DD:EE"), None);
        assert_eq!(normalize_mac("GG:BB:CC:DD:EE:FF"), None);
        assert_eq!(normalize_mac("AA BB CC DD EE FF"), None);
        assert_eq!(normalize_mac(""), None);
    }

    #[test]
    fn test_serial_and_agent_id() {
        assert_eq!(normalize_serial(" SN-ABC123 "), Some("sn-abc123".to_string()));
        assert_eq!(normalize_serial("  "), None);
        assert_eq!(normalize_agent_id(" Falcon-001 "), Some("Falcon-001".to_string()));
        assert_eq!(normalize_agent_id(""), None);
    }

    #[test]
    fn test_severity_per_scanner() {
        assert_eq!(normalize_severity(Some("5"), "qualys"), Severity::Critical);
        assert_eq!(normalize_severity(Some("4"), "Qualys"), Severity::High);
        assert_eq!(normalize_severity(Some("Info"), "nessus"), Severity::Low);
        assert_eq!(normalize_severity(Some("Severe"), "rapid7"), Severity::Critical);
        assert_eq!(normalize_severity(Some("High"), "openvas"), Severity::Critical);
    }

    #[test]
    fn test_severity_fallbacks() {
        assert_eq!(normalize_severity(Some("critical"), "unknown"), Severity::Critical);
        assert_eq!(normalize_severity(Some("bogus"), "nessus"), Severity::Low);
        assert_eq!(normalize_severity(None, "nessus"), Severity::Low);
    }
}
