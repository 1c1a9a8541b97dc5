// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `selection.rs`

#[cfg(test)]
mod tests {
    use crate::dns::{DnsHostedZone, ZoneId};
    use crate::selection::{match_provider, select_zones, SelectionError, Selector};

    fn zone(id: &str, domain: &str) -> DnsHostedZone {
        DnsHostedZone::public(ZoneId::new("mock-inmemory", id), domain)
    }

    fn zone_with_forwarded(id: &str, domain: &str, forwarded: &[&str]) -> DnsHostedZone {
        let mut zone = zone(id, domain);
        zone.forwarded_subdomains = forwarded.iter().map(|d| (*d).to_string()).collect();
        zone
    }

    fn all() -> Selector {
        Selector::default()
    }

    fn include(items: &[&str]) -> Selector {
        Selector {
            include: items.iter().map(|i| (*i).to_string()).collect(),
            exclude: Vec::new(),
        }
    }

    fn exclude(items: &[&str]) -> Selector {
        Selector {
            include: Vec::new(),
            exclude: items.iter().map(|i| (*i).to_string()).collect(),
        }
    }

    #[test]
    fn selects_all_zones_by_default() {
        let zones = [zone("z1", "first.example.com"), zone("z2", "second.example.com")];
        let outcome = select_zones(&zones, &all(), &all()).unwrap();
        assert_eq!(outcome.zones.len(), 2);
        assert!(outcome.domains_included.contains("first.example.com"));
        assert!(outcome.domains_included.contains("second.example.com"));
    }

    #[test]
    fn zone_include_restricts_candidates() {
        let zones = [zone("z1", "first.example.com"), zone("z2", "second.example.com")];
        let outcome = select_zones(&zones, &include(&["z1"]), &all()).unwrap();
        assert_eq!(outcome.zones.len(), 1);
        assert_eq!(outcome.zones_excluded, vec![ZoneId::new("mock-inmemory", "z2")]);
    }

    #[test]
    fn zone_exclude_removes_candidates() {
        let zones = [zone("z1", "first.example.com"), zone("z2", "second.example.com")];
        let outcome = select_zones(&zones, &exclude(&["z2"]), &all()).unwrap();
        assert_eq!(outcome.zones.len(), 1);
        assert!(outcome
            .zones
            .contains_key(&ZoneId::new("mock-inmemory", "z1")));
    }

    #[test]
    fn domain_include_keeps_subdomains() {
        let zones = [zone("z1", "first.example.com"), zone("z2", "second.example.com")];
        let outcome = select_zones(&zones, &all(), &include(&["example.com"])).unwrap();
        assert_eq!(outcome.zones.len(), 2);
    }

    #[test]
    fn domain_include_drops_unmatched_zone() {
        let zones = [zone("z1", "first.example.com"), zone("z2", "other.example.org")];
        let outcome = select_zones(&zones, &all(), &include(&["example.com"])).unwrap();
        assert_eq!(outcome.zones.len(), 1);
        assert!(outcome.domains_excluded.contains("other.example.org"));
    }

    #[test]
    fn domain_exclude_drops_base_domain() {
        let zones = [zone("z1", "first.example.com"), zone("z2", "second.example.com")];
        let outcome = select_zones(&zones, &all(), &exclude(&["second.example.com"])).unwrap();
        assert_eq!(outcome.zones.len(), 1);
        assert!(outcome.domains_excluded.contains("second.example.com"));
    }

    #[test]
    fn everything_filtered_is_an_error() {
        let zones = [zone("z1", "first.example.com")];
        let err = select_zones(&zones, &all(), &exclude(&["example.com"])).unwrap_err();
        assert_eq!(err, SelectionError::NoZonesRemaining);
    }

    #[test]
    fn forwarded_subdomain_joins_base_domains_when_unserved() {
        let zones = [zone_with_forwarded(
            "z1",
            "example.com",
            &["sub.example.com"],
        )];
        let outcome = select_zones(&zones, &all(), &all()).unwrap();
        let base = outcome
            .zones
            .get(&ZoneId::new("mock-inmemory", "z1"))
            .unwrap();
        assert!(base.contains("sub.example.com"));
    }

    #[test]
    fn forwarded_subdomain_served_elsewhere_is_not_a_base_domain() {
        let zones = [
            zone_with_forwarded("z1", "example.com", &["sub.example.com"]),
            zone("z2", "sub.example.com"),
        ];
        let outcome = select_zones(&zones, &all(), &all()).unwrap();
        let base = outcome
            .zones
            .get(&ZoneId::new("mock-inmemory", "z1"))
            .unwrap();
        assert!(!base.contains("sub.example.com"));
    }

    #[test]
    fn delegated_subzone_is_not_overlap() {
        let zones = [
            zone_with_forwarded("z1", "example.com", &["sub.example.com"]),
            zone("z2", "sub.example.com"),
        ];
        assert!(select_zones(&zones, &all(), &all()).is_ok());
    }

    #[test]
    fn undelegated_subzone_is_overlap() {
        let zones = [zone("z1", "example.com"), zone("z2", "sub.example.com")];
        let err = select_zones(&zones, &all(), &all()).unwrap_err();
        assert!(matches!(err, SelectionError::OverlappingZones { .. }));
    }

    #[test]
    fn same_domain_twice_is_duplicate() {
        let zones = [zone("z1", "example.com"), zone("z2", "example.com")];
        let err = select_zones(&zones, &all(), &all()).unwrap_err();
        assert!(matches!(err, SelectionError::DuplicateZones { .. }));
    }

    #[test]
    fn zone_for_name_prefers_longest_suffix() {
        let zones = [
            zone_with_forwarded("z1", "example.com", &["sub.example.com"]),
            zone("z2", "sub.example.com"),
        ];
        let outcome = select_zones(&zones, &all(), &all()).unwrap();
        let (zone, domain) = outcome.zone_for_name("www.sub.example.com").unwrap();
        assert_eq!(zone.id, "z2");
        assert_eq!(domain, "sub.example.com");
    }

    #[test]
    fn zone_for_name_handles_wildcards() {
        let zones = [zone("z1", "example.com")];
        let outcome = select_zones(&zones, &all(), &all()).unwrap();
        assert!(outcome.zone_for_name("*.example.com").is_some());
    }

    #[test]
    fn match_provider_longest_suffix_wins() {
        let p1_domains = vec!["example.com".to_string()];
        let p2_domains = vec!["first.example.com".to_string()];
        let providers = [
            ("ns/p1", p1_domains.as_slice()),
            ("ns/p2", p2_domains.as_slice()),
        ];
        assert_eq!(
            match_provider(providers, "e1.first.example.com"),
            Some("ns/p2")
        );
    }

    #[test]
    fn match_provider_tie_breaks_lexically() {
        let domains = vec!["example.com".to_string()];
        let providers = [
            ("ns/pb", domains.as_slice()),
            ("ns/pa", domains.as_slice()),
        ];
        assert_eq!(match_provider(providers, "e1.example.com"), Some("ns/pa"));
    }

    #[test]
    fn match_provider_none_without_cover() {
        let domains = vec!["example.com".to_string()];
        let providers = [("ns/p1", domains.as_slice())];
        assert_eq!(match_provider(providers, "e1.example.org"), None);
    }
}
