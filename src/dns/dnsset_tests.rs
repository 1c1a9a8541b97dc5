// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `dnsset.rs`

#[cfg(test)]
mod tests {
    use crate::dns::dnsset::{diff, order_batch, Change, DnsSet, RoutingPolicy};
    use crate::dns::name::{DnsName, DnsSetName};
    use crate::dns::recordset::{RecordSet, RecordType};
    use std::collections::BTreeMap;

    fn set_name(name: &str) -> DnsSetName {
        DnsSetName::simple(DnsName::new(name).unwrap())
    }

    fn a_set(name: &str, ttl: i64, addrs: &[&str]) -> DnsSet {
        let mut set = DnsSet::new(set_name(name));
        set.put(RecordSet::new(
            RecordType::A,
            ttl,
            addrs.iter().map(|a| (*a).to_string()).collect(),
        ));
        set
    }

    #[test]
    fn diff_of_nothing_is_empty() {
        assert!(diff(None, None).is_empty());
    }

    #[test]
    fn diff_emits_create_for_new_name() {
        let new = a_set("e1.first.example.com", 300, &["1.1.1.1"]);
        let requests = diff(None, Some(&new));
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0].change, Change::Create { .. }));
        assert_eq!(requests[0].rtype(), RecordType::A);
    }

    #[test]
    fn diff_emits_delete_for_removed_name() {
        let old = a_set("e1.first.example.com", 300, &["1.1.1.1"]);
        let requests = diff(Some(&old), None);
        assert_eq!(requests.len(), 1);
        assert!(requests[0].is_delete());
    }

    #[test]
    fn diff_emits_update_for_changed_values() {
        let old = a_set("e1.first.example.com", 300, &["1.1.1.1"]);
        let new = a_set("e1.first.example.com", 300, &["2.2.2.2"]);
        let requests = diff(Some(&old), Some(&new));
        assert_eq!(requests.len(), 1);
        match &requests[0].change {
            Change::Update { old, new } => {
                assert_eq!(old.records, vec!["1.1.1.1"]);
                assert_eq!(new.records, vec!["2.2.2.2"]);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn diff_of_equal_sets_is_empty() {
        let old = a_set("e1.first.example.com", 300, &["1.1.1.1", "2.2.2.2"]);
        let new = a_set("e1.first.example.com", 300, &["2.2.2.2", "1.1.1.1"]);
        assert!(diff(Some(&old), Some(&new)).is_empty());
    }

    #[test]
    fn diff_handles_type_replacement() {
        // CNAME replaced by A emits one delete and one create.
        let mut old = DnsSet::new(set_name("e1.first.example.com"));
        old.put(RecordSet::new(
            RecordType::CNAME,
            300,
            vec!["target.example.org".to_string()],
        ));
        let new = a_set("e1.first.example.com", 300, &["1.1.1.1"]);
        let mut requests = diff(Some(&old), Some(&new));
        order_batch(&mut requests);
        assert_eq!(requests.len(), 2);
        assert!(requests[0].is_delete());
        assert_eq!(requests[0].rtype(), RecordType::CNAME);
        assert!(matches!(requests[1].change, Change::Create { .. }));
        assert_eq!(requests[1].rtype(), RecordType::A);
    }

    #[test]
    fn diff_ttl_change_is_an_update() {
        let old = a_set("e1.first.example.com", 300, &["1.1.1.1"]);
        let new = a_set("e1.first.example.com", 600, &["1.1.1.1"]);
        let requests = diff(Some(&old), Some(&new));
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0].change, Change::Update { .. }));
    }

    #[test]
    fn routing_policy_rides_on_non_delete_requests() {
        let mut new = a_set("e1.first.example.com", 300, &["1.1.1.1"]);
        new.routing_policy = Some(RoutingPolicy {
            r#type: "weighted".to_string(),
            set_identifier: Some("blue".to_string()),
            parameters: BTreeMap::from([("weight".to_string(), "10".to_string())]),
        });
        let requests = diff(None, Some(&new));
        assert_eq!(
            requests[0].routing_policy.as_ref().unwrap().r#type,
            "weighted"
        );
    }

    #[test]
    fn order_batch_sorts_delete_update_create() {
        let old_a = a_set("a.example.com", 300, &["1.1.1.1"]);
        let old_b = a_set("b.example.com", 300, &["1.1.1.1"]);
        let new_b = a_set("b.example.com", 300, &["2.2.2.2"]);
        let new_c = a_set("c.example.com", 300, &["3.3.3.3"]);

        let mut batch = Vec::new();
        batch.extend(diff(None, Some(&new_c)));
        batch.extend(diff(Some(&old_b), Some(&new_b)));
        batch.extend(diff(Some(&old_a), None));
        order_batch(&mut batch);

        let kinds: Vec<u8> = batch.iter().map(|r| r.change.rank()).collect();
        assert_eq!(kinds, vec![0, 1, 2]);
    }

    #[test]
    fn cname_exclusivity_is_rejected() {
        let mut set = a_set("e1.example.com", 300, &["1.1.1.1"]);
        set.put(RecordSet::new(
            RecordType::CNAME,
            300,
            vec!["other.example.org".to_string()],
        ));
        assert!(set.check_cname_exclusive().is_err());

        let plain = a_set("e1.example.com", 300, &["1.1.1.1"]);
        assert!(plain.check_cname_exclusive().is_ok());
    }
}
