// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resolve.rs`

#[cfg(test)]
mod tests {
    use crate::dns::{DnsName, DnsSet, DnsSetName, RecordType};
    use crate::resolve::{resolve_targets, resolve_text, ResolveError, Target, TargetLookup};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::IpAddr;

    struct StaticLookup {
        answers: HashMap<String, Vec<IpAddr>>,
    }

    #[async_trait]
    impl TargetLookup for StaticLookup {
        async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
            self.answers
                .get(host)
                .cloned()
                .ok_or_else(|| ResolveError::LookupFailed {
                    host: host.to_string(),
                    reason: "no answer".to_string(),
                })
        }
    }

    fn lookup() -> StaticLookup {
        StaticLookup {
            answers: HashMap::from([
                (
                    "wikipedia.org".to_string(),
                    vec![
                        "198.35.26.96".parse().unwrap(),
                        "2620:0:863:ed1a::1".parse().unwrap(),
                    ],
                ),
                (
                    "www.wikipedia.org".to_string(),
                    // Shares one address with the apex to exercise dedup.
                    vec![
                        "198.35.26.96".parse().unwrap(),
                        "198.35.26.97".parse().unwrap(),
                    ],
                ),
            ]),
        }
    }

    fn set_name() -> DnsSetName {
        DnsSetName::simple(DnsName::new("e1.example.com").unwrap())
    }

    #[test]
    fn parse_distinguishes_literals_and_hostnames() {
        assert!(matches!(Target::parse("1.1.1.1"), Target::V4(_)));
        assert!(matches!(Target::parse("2001:db8::1"), Target::V6(_)));
        assert!(matches!(Target::parse("Example.COM."), Target::Hostname(h) if h == "example.com"));
    }

    #[tokio::test]
    async fn ip_literals_become_address_records() {
        let mut set = DnsSet::new(set_name());
        let resolved = resolve_targets(
            &set_name(),
            &["1.1.1.1".to_string(), "2001:db8::1".to_string()],
            300,
            false,
            &lookup(),
            &mut set,
        )
        .await
        .unwrap();
        assert_eq!(set.sets.get(&RecordType::A).unwrap().records, vec!["1.1.1.1"]);
        assert_eq!(
            set.sets.get(&RecordType::AAAA).unwrap().records,
            vec!["2001:db8::1"]
        );
        assert!(!resolved.flattened);
    }

    #[tokio::test]
    async fn single_hostname_becomes_cname() {
        let mut set = DnsSet::new(set_name());
        let resolved = resolve_targets(
            &set_name(),
            &["wikipedia.org".to_string()],
            300,
            false,
            &lookup(),
            &mut set,
        )
        .await
        .unwrap();
        assert_eq!(
            set.sets.get(&RecordType::CNAME).unwrap().records,
            vec!["wikipedia.org"]
        );
        assert!(!resolved.flattened);
        assert_eq!(resolved.effective_targets, vec!["wikipedia.org"]);
    }

    #[tokio::test]
    async fn mixed_literal_and_hostname_writes_both_sets() {
        let mut set = DnsSet::new(set_name());
        let resolved = resolve_targets(
            &set_name(),
            &["1.1.1.1".to_string(), "wikipedia.org".to_string()],
            300,
            false,
            &lookup(),
            &mut set,
        )
        .await
        .unwrap();

        // Both record sets are present, so the conflict is visible to the
        // CNAME exclusivity check instead of dropping the literal.
        assert_eq!(set.sets.get(&RecordType::A).unwrap().records, vec!["1.1.1.1"]);
        assert_eq!(
            set.sets.get(&RecordType::CNAME).unwrap().records,
            vec!["wikipedia.org"]
        );
        assert!(set.check_cname_exclusive().is_err());
        assert_eq!(
            resolved.effective_targets,
            vec!["1.1.1.1", "wikipedia.org"]
        );
    }

    #[tokio::test]
    async fn single_hostname_flattens_when_requested() {
        let mut set = DnsSet::new(set_name());
        let resolved = resolve_targets(
            &set_name(),
            &["wikipedia.org".to_string()],
            300,
            true,
            &lookup(),
            &mut set,
        )
        .await
        .unwrap();
        assert!(resolved.flattened);
        assert!(set.sets.contains_key(&RecordType::A));
        assert!(set.sets.contains_key(&RecordType::AAAA));
        assert!(!set.sets.contains_key(&RecordType::CNAME));
    }

    #[tokio::test]
    async fn multiple_hostnames_flatten_and_dedup() {
        let mut set = DnsSet::new(set_name());
        let resolved = resolve_targets(
            &set_name(),
            &[
                "wikipedia.org".to_string(),
                "www.wikipedia.org".to_string(),
            ],
            300,
            false,
            &lookup(),
            &mut set,
        )
        .await
        .unwrap();
        assert!(resolved.flattened);
        let a = set.sets.get(&RecordType::A).unwrap();
        assert_eq!(a.records, vec!["198.35.26.96", "198.35.26.97"]);
        let aaaa = set.sets.get(&RecordType::AAAA).unwrap();
        assert_eq!(aaaa.records, vec!["2620:0:863:ed1a::1"]);
        // Only address literals in the effective targets, no duplicates.
        assert_eq!(resolved.effective_targets.len(), 3);
    }

    #[tokio::test]
    async fn failed_lookup_propagates() {
        let mut set = DnsSet::new(set_name());
        let err = resolve_targets(
            &set_name(),
            &["missing.example.org".to_string(), "also.example.org".to_string()],
            300,
            false,
            &lookup(),
            &mut set,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolveError::LookupFailed { .. }));
    }

    #[test]
    fn text_is_quoted_for_txt() {
        let mut set = DnsSet::new(set_name());
        let quoted = resolve_text(&["v=spf1 -all".to_string()], 300, &mut set);
        assert_eq!(quoted, vec!["\"v=spf1 -all\""]);
        assert_eq!(
            set.sets.get(&RecordType::TXT).unwrap().records,
            vec!["\"v=spf1 -all\""]
        );
    }
}
