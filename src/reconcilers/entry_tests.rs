// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for entry reconciliation helpers

#[cfg(test)]
mod tests {
    use crate::crd::{DNSEntry, DNSEntrySpec, DNSEntryStatus, EntryState};
    use crate::dns::{DnsName, RoutingPolicy};
    use crate::reconcilers::entry::{failure_status, set_name_for, targets_equal};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn entry_with_status(status: Option<DNSEntryStatus>) -> DNSEntry {
        DNSEntry {
            metadata: ObjectMeta {
                name: Some("e1".to_string()),
                namespace: Some("default".to_string()),
                generation: Some(2),
                ..Default::default()
            },
            spec: DNSEntrySpec {
                dns_name: "e1.first.example.com".to_string(),
                targets: Some(vec!["1.1.1.1".to_string()]),
                text: None,
                ttl: None,
                cname_lookup_interval: None,
                resolve_targets_to_addresses: None,
                routing_policy: None,
                reference: None,
            },
            status,
        }
    }

    #[test]
    fn targets_compare_as_sets() {
        let a = vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()];
        let b = vec!["2.2.2.2".to_string(), "1.1.1.1".to_string()];
        assert!(targets_equal(Some(&a), Some(&b)));
        assert!(!targets_equal(Some(&a), None));
        assert!(targets_equal(None, None));
    }

    #[test]
    fn set_name_uses_routing_policy_identifier() {
        let dns_name = DnsName::new("e1.first.example.com").unwrap();
        let plain = set_name_for(&dns_name, None);
        assert!(plain.set_identifier.is_none());

        let policy = RoutingPolicy {
            r#type: "weighted".to_string(),
            set_identifier: Some("blue".to_string()),
            parameters: BTreeMap::new(),
        };
        let with_id = set_name_for(&dns_name, Some(&policy));
        assert_eq!(with_id.set_identifier.as_deref(), Some("blue"));
    }

    #[test]
    fn failure_status_preserves_previous_assignment() {
        let previous = DNSEntryStatus {
            provider: Some("default/p1".to_string()),
            provider_type: Some("mock-inmemory".to_string()),
            zone: Some("first.example.com".to_string()),
            targets: Some(vec!["1.1.1.1".to_string()]),
            state: Some(EntryState::Ready),
            ..Default::default()
        };
        let entry = entry_with_status(Some(previous));
        let status = failure_status(&entry, EntryState::Error, "backend failure");
        assert_eq!(status.state, Some(EntryState::Error));
        assert_eq!(status.message.as_deref(), Some("backend failure"));
        // Assignment survives a transient failure.
        assert_eq!(status.provider.as_deref(), Some("default/p1"));
        assert_eq!(status.observed_generation, Some(2));
    }

    #[test]
    fn failure_status_from_empty_status() {
        let entry = entry_with_status(None);
        let status = failure_status(&entry, EntryState::Invalid, "no target or text specified");
        assert_eq!(status.state, Some(EntryState::Invalid));
        assert!(status.provider.is_none());
    }
}
