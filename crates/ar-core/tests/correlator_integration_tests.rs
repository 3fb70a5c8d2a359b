//! Integration tests for cross-source correlation.
//!
//! These tests drive the public correlator surface the way an ingestion
//! runner does: records from several sources in sequence, then
//! deduplication and gap analysis over the resulting store.
//!
//! # Running these tests
//!
//! ```bash
//! cargo test --package ar-core --test correlator_integration_tests
//! ```

use ar_core::{
    AssetCorrelator, AssetRecord, EndpointRecord, IdentifierType, NetworkObservationRecord,
    OwnerMappingRecord, TrackedField, VulnerabilityRecord,
};

// ============================================================================
// Fixtures
// ============================================================================

fn scanner_asset(hostname: &str, ip: Option<&str>, source: &str) -> AssetRecord {
    AssetRecord {
        hostname: Some(hostname.to_string()),
        ip_address: ip.map(str::to_string),
        source_system: Some(source.to_string()),
        ..Default::default()
    }
}

fn edr_endpoint(hostname: &str, source: &str) -> EndpointRecord {
    EndpointRecord {
        hostname: Some(hostname.to_string()),
        source_system: Some(source.to_string()),
        ..Default::default()
    }
}

fn vuln(hostname: &str, severity: &str) -> VulnerabilityRecord {
    VulnerabilityRecord {
        hostname: Some(hostname.to_string()),
        severity: severity.to_string(),
        source_system: Some("qualys".to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_edr_enriches_scanner_asset() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![scanner_asset("web01", Some("10.0.1.10"), "qualys")]);
    c.ingest_endpoints(vec![EndpointRecord {
        hostname: Some("web01".to_string()),
        agent_id: Some("falcon-001".to_string()),
        agent_status: Some("Online".to_string()),
        source_system: Some("crowdstrike".to_string()),
        ..Default::default()
    }]);

    assert_eq!(c.asset_count(), 1);
    let asset = c.get_enriched_assets().next().unwrap();
    assert_eq!(asset.agent_id.as_ref().unwrap().value, "falcon-001");
    assert_eq!(asset.agent_status.as_ref().unwrap().value, "Online");

    let hostname = asset.hostname.as_ref().unwrap();
    assert_eq!(hostname.source_system, "crowdstrike");
    assert_eq!(hostname.confidence, 0.95);

    // Only qualys reported the IP.
    assert_eq!(asset.ip_address.as_ref().unwrap().source_system, "qualys");
    assert!(asset.is_present_in("qualys"));
    assert!(asset.is_present_in("crowdstrike"));
}

#[test]
fn test_gap_analysis_between_scanner_and_edr() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![
        scanner_asset("host1", None, "qualys"),
        scanner_asset("host2", None, "qualys"),
        scanner_asset("host3", None, "qualys"),
    ]);
    c.ingest_endpoints(vec![
        edr_endpoint("host1", "crowdstrike"),
        edr_endpoint("host4", "crowdstrike"),
    ]);

    let report = c.gap_analysis("qualys", "crowdstrike");
    assert_eq!(report.in_both.len(), 1);
    assert_eq!(report.in_a_not_b.len(), 2);
    assert_eq!(report.in_b_not_a.len(), 1);
    assert!((report.coverage_a_to_b() - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(report.coverage_b_to_a(), 0.5);

    let summary = report.summary();
    assert_eq!(summary.in_both, 1);
    assert!(summary.to_string().starts_with("qualys vs crowdstrike"));
}

#[test]
fn test_vulnerability_counters() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![scanner_asset("host1", None, "cmdb")]);
    let count = c.ingest_vulnerabilities(vec![vuln("host1", "Critical"), vuln("host1", "High")]);

    assert_eq!(count, 2);
    assert_eq!(c.asset_count(), 1);
    let asset = c.get_enriched_assets().next().unwrap();
    assert_eq!(asset.vulnerability_count, 2);
    assert_eq!(asset.critical_vuln_count, 1);
    assert_eq!(asset.high_vuln_count, 1);
    assert!(asset.is_present_in("qualys"));
}

#[test]
fn test_unmatched_vulnerability_creates_asset() {
    let mut c = AssetCorrelator::new();
    c.ingest_vulnerabilities(vec![vuln("orphan", "medium"), vuln("ORPHAN", "critical")]);

    // The second finding matches the asset the first one created.
    assert_eq!(c.asset_count(), 1);
    let asset = c.get_enriched_assets().next().unwrap();
    assert_eq!(asset.vulnerability_count, 2);
    assert_eq!(asset.critical_vuln_count, 1);
    assert!(asset.hostname.is_none());
}

#[test]
fn test_owner_mapping_without_asset_is_dropped() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![scanner_asset("host1", Some("10.0.0.1"), "qualys")]);

    let applied = c.ingest_owner_mappings(vec![OwnerMappingRecord {
        ip_address: Some("10.9.9.9".to_string()),
        owner_email: Some("alice@example.com".to_string()),
        source_system: Some("active_directory".to_string()),
        ..Default::default()
    }]);

    assert_eq!(applied, 0);
    assert_eq!(c.asset_count(), 1);
}

#[test]
fn test_owner_mapping_confidence_is_discounted() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![scanner_asset("host1", Some("10.0.0.1"), "qualys")]);

    let applied = c.ingest_owner_mappings(vec![OwnerMappingRecord {
        ip_address: Some("10.0.0.1".to_string()),
        owner_email: Some("alice@example.com".to_string()),
        department: Some("Finance".to_string()),
        confidence: 0.5,
        source_system: Some("active_directory".to_string()),
        ..Default::default()
    }]);

    assert_eq!(applied, 1);
    let asset = c.get_enriched_assets().next().unwrap();
    let owner = asset.field(TrackedField::OwnerEmail).unwrap();
    assert_eq!(owner.value, "alice@example.com");
    assert!((owner.confidence - 0.85 * 0.5).abs() < 1e-9);
    // Owner mappings enrich but do not count as the source seeing the asset.
    assert!(!asset.is_present_in("active_directory"));
}

#[test]
fn test_dedup_after_shared_mac() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![
        scanner_asset("hostA", None, "qualys"),
        scanner_asset("hostB", None, "qualys"),
    ]);
    assert_eq!(c.asset_count(), 2);

    for hostname in ["hostA", "hostB"] {
        c.ingest_endpoints(vec![EndpointRecord {
            hostname: Some(hostname.to_string()),
            mac_address: Some("00-11-22-33-44-55".to_string()),
            source_system: Some("crowdstrike".to_string()),
            ..Default::default()
        }]);
    }

    let before = c.asset_count();
    let merges = c.deduplicate();
    assert!(merges >= 1);
    assert_eq!(c.asset_count(), before - merges);
    assert_eq!(c.asset_count(), 1);

    let asset = c
        .find_by_identifier(IdentifierType::MacAddress, "00:11:22:33:44:55")
        .unwrap();
    assert!(asset.correlation_key.hostnames.contains("hosta"));
    assert!(asset.correlation_key.hostnames.contains("hostb"));
}

#[test]
fn test_network_observation_links_by_mac() {
    let mut c = AssetCorrelator::new();
    c.ingest_endpoints(vec![EndpointRecord {
        hostname: Some("laptop-7".to_string()),
        mac_address: Some("aabb.ccdd.eeff".to_string()),
        source_system: Some("defender_endpoint".to_string()),
        ..Default::default()
    }]);
    c.ingest_network_observations(vec![NetworkObservationRecord {
        ip_address: Some("192.168.4.20".to_string()),
        mac_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
        source_system: Some("darktrace".to_string()),
        ..Default::default()
    }]);

    assert_eq!(c.asset_count(), 1);
    let asset = c.get_enriched_assets().next().unwrap();
    assert_eq!(asset.ip_address.as_ref().unwrap().source_system, "darktrace");
    assert_eq!(
        asset.mac_address.as_ref().unwrap().source_system,
        "defender_endpoint"
    );
    assert_eq!(asset.source_records["darktrace"].len(), 1);
}

#[test]
fn test_internal_suffix_and_case_match() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![scanner_asset("DB01.corp", None, "servicenow")]);
    c.ingest_endpoints(vec![edr_endpoint("db01.local", "sentinelone")]);
    assert_eq!(c.asset_count(), 1);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_match_does_not_change_count() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![scanner_asset("host1", Some("10.0.0.1"), "qualys")]);

    let before = c.asset_count();
    c.ingest_endpoints(vec![EndpointRecord {
        ip_address: Some("10.0.0.1".to_string()),
        agent_id: Some("new-agent".to_string()),
        source_system: Some("crowdstrike".to_string()),
        ..Default::default()
    }]);
    assert_eq!(c.asset_count(), before);
}

#[test]
fn test_novel_record_adds_exactly_one() {
    let mut c = AssetCorrelator::new();
    for i in 0..10 {
        let before = c.asset_count();
        let ip = format!("10.1.0.{}", i);
        c.ingest_assets(vec![scanner_asset(&format!("node{}", i), Some(&ip), "qualys")]);
        assert_eq!(c.asset_count(), before + 1);
    }
}

#[test]
fn test_dedup_is_idempotent() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![
        scanner_asset("a", Some("10.0.0.1"), "qualys"),
        scanner_asset("b", Some("10.0.0.2"), "qualys"),
        scanner_asset("c", Some("10.0.0.3"), "qualys"),
    ]);
    c.ingest_endpoints(vec![EndpointRecord {
        hostname: Some("a".to_string()),
        ip_address: Some("10.0.0.2".to_string()),
        source_system: Some("crowdstrike".to_string()),
        ..Default::default()
    }]);

    c.deduplicate();
    assert_eq!(c.deduplicate(), 0);
}

#[test]
fn test_set_field_order_independent() {
    let low = scanner_asset("host1", None, "splunk");
    let high = scanner_asset("HOST1", None, "crowdstrike");

    let mut forward = AssetCorrelator::new();
    forward.ingest_assets(vec![low.clone(), high.clone()]);
    let mut reverse = AssetCorrelator::new();
    reverse.ingest_assets(vec![high, low]);

    for c in [&forward, &reverse] {
        let hostname = c.get_enriched_assets().next().unwrap().hostname.clone().unwrap();
        assert_eq!(hostname.value, "HOST1");
        assert_eq!(hostname.source_system, "crowdstrike");
        assert_eq!(hostname.confidence, 0.95);
    }
}

#[test]
fn test_gap_analysis_swap_symmetry() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![
        scanner_asset("a", None, "nessus"),
        scanner_asset("b", None, "nessus"),
    ]);
    c.ingest_endpoints(vec![edr_endpoint("b", "carbon_black"), edr_endpoint("z", "carbon_black")]);

    let ab = c.gap_analysis("nessus", "carbon_black");
    let ba = c.gap_analysis("carbon_black", "nessus");
    assert_eq!(ab.in_both.len(), ba.in_both.len());
    assert_eq!(ab.in_a_not_b, ba.in_b_not_a);
    assert_eq!(ab.in_b_not_a, ba.in_a_not_b);
    assert_eq!(ab.coverage_a_to_b(), ba.coverage_b_to_a());
}

#[test]
fn test_coverage_bounds() {
    let mut c = AssetCorrelator::new();
    c.ingest_assets(vec![scanner_asset("a", None, "qualys"), scanner_asset("b", None, "qualys")]);
    c.ingest_endpoints(vec![edr_endpoint("a", "crowdstrike"), edr_endpoint("b", "crowdstrike")]);
    c.ingest_endpoints(vec![edr_endpoint("c", "crowdstrike")]);

    let report = c.gap_analysis("qualys", "crowdstrike");
    assert_eq!(report.coverage_a_to_b(), 1.0);
    let reverse = report.coverage_b_to_a();
    assert!((0.0..1.0).contains(&reverse));

    let empty = c.gap_analysis("rapid7", "crowdstrike");
    assert_eq!(empty.coverage_a_to_b(), 0.0);
}
