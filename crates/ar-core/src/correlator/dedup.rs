//! Batch deduplication of enriched assets whose keys have come to overlap.

use super::AssetCorrelator;
use crate::telemetry;
use tracing::{debug, info, instrument};

impl AssetCorrelator {
    /// Merges enriched assets that share any identifier.
    ///
    /// For each asset in store order, later assets whose keys overlap it are
    /// absorbed into it and removed. The scan for an asset repeats until it
    /// absorbs nothing, since each merge can widen its key. Indexes are
    /// rebuilt from scratch after any merge. Returns the number of merges;
    /// an immediate second call returns 0.
    #[instrument(skip(self), fields(assets = self.assets.len()))]
    pub fn deduplicate(&mut self) -> usize {
        let mut merges = 0;
        let mut i = 0;

        while i < self.assets.len() {
            loop {
                let mut merged_this_pass = false;
                let mut j = i + 1;
                while j < self.assets.len() {
                    if !self.assets[i]
                        .correlation_key
                        .overlaps(&self.assets[j].correlation_key)
                    {
                        j += 1;
                        continue;
                    }

                    let shared = self.assets[i]
                        .correlation_key
                        .shared_identifiers(&self.assets[j].correlation_key);
                    // The next asset slides into slot j, so j stays put.
                    let absorbed = self.assets.remove(j);
                    debug!(
                        keep = %self.assets[i].id,
                        absorbed = %absorbed.id,
                        shared = ?shared,
                        "Merging overlapping assets"
                    );
                    self.assets[i].absorb(absorbed);
                    merges += 1;
                    merged_this_pass = true;
                }
                if !merged_this_pass {
                    break;
                }
            }
            i += 1;
        }

        if merges > 0 {
            self.index
                .rebuild(self.assets.iter().map(|a| &a.correlation_key));
            info!(merges, remaining = self.assets.len(), "Deduplicated assets");
        }
        telemetry::record_dedup(merges, self.assets.len());

        merges
    }
}

#[cfg(test)]
mod tests {
    use crate::correlator::AssetCorrelator;
    use crate::models::{AssetRecord, EndpointRecord, IdentifierType};

    fn asset(hostname: &str, mac: Option<&str>, source: &str) -> AssetRecord {
        AssetRecord {
            hostname: Some(hostname.to_string()),
            mac_address: mac.map(str::to_string),
            source_system: Some(source.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_nothing_to_merge() {
        let mut c = AssetCorrelator::new();
        c.ingest_assets(vec![asset("a", None, "qualys"), asset("b", None, "qualys")]);
        assert_eq!(c.deduplicate(), 0);
        assert_eq!(c.asset_count(), 2);
    }

    #[test]
    fn test_linked_through_shared_mac() {
        let mut c = AssetCorrelator::new();
        c.ingest_assets(vec![
            asset("web01", None, "qualys"),
            asset("web02", None, "nessus"),
        ]);
        c.ingest_endpoints(vec![EndpointRecord {
            hostname: Some("web01".to_string()),
            mac_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
            source_system: Some("crowdstrike".to_string()),
            ..Default::default()
        }]);
        c.ingest_endpoints(vec![EndpointRecord {
            hostname: Some("web02".to_string()),
            mac_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
            source_system: Some("sentinelone".to_string()),
            ..Default::default()
        }]);
        assert_eq!(c.asset_count(), 2);

        let merges = c.deduplicate();
        assert_eq!(merges, 1);
        assert_eq!(c.asset_count(), 1);

        let merged = c.get_enriched_assets().next().unwrap();
        assert_eq!(merged.present_in_sources.len(), 4);
        assert!(merged.correlation_key.hostnames.contains("web01"));
        assert!(merged.correlation_key.hostnames.contains("web02"));
        assert_eq!(c.deduplicate(), 0);
    }

    #[test]
    fn test_transitive_chain_is_fully_merged() {
        // c links a and b only after a has already been compared with b.
        let mut c = AssetCorrelator::new();
        c.ingest_assets(vec![
            asset("a", Some("00:00:00:00:00:01"), "qualys"),
            asset("b", Some("00:00:00:00:00:02"), "qualys"),
        ]);
        // Force a third asset carrying both MACs without matching at ingest.
        c.ingest_assets(vec![asset("c", None, "nessus")]);
        c.assets[2]
            .correlation_key
            .insert(IdentifierType::MacAddress, "00:00:00:00:00:01");
        c.assets[2]
            .correlation_key
            .insert(IdentifierType::MacAddress, "00:00:00:00:00:02");

        assert_eq!(c.deduplicate(), 2);
        assert_eq!(c.asset_count(), 1);
        assert_eq!(c.deduplicate(), 0);
    }

    #[test]
    fn test_indexes_rebuilt_after_merge() {
        let mut c = AssetCorrelator::new();
        c.ingest_assets(vec![
            asset("a", None, "qualys"),
            asset("b", None, "qualys"),
            asset("c", None, "qualys"),
        ]);
        c.assets[0]
            .correlation_key
            .insert(IdentifierType::Hostname, "b");

        assert_eq!(c.deduplicate(), 1);
        assert_eq!(c.asset_count(), 2);

        // "c" moved from position 2 to 1; lookups must follow it.
        let found = c.find_by_identifier(IdentifierType::Hostname, "c").unwrap();
        assert!(found.correlation_key.hostnames.contains("c"));
        let found = c.find_by_identifier(IdentifierType::Hostname, "b").unwrap();
        assert!(found.correlation_key.hostnames.contains("a"));
    }
}
