// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::constants::FINALIZER_ENTRY;
    use crate::crd::{DNSEntry, DNSEntrySpec};
    use crate::reconcilers::finalizers::has_finalizer;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn entry(finalizers: Option<Vec<String>>) -> DNSEntry {
        DNSEntry {
            metadata: ObjectMeta {
                name: Some("e1".to_string()),
                namespace: Some("default".to_string()),
                finalizers,
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
            status: None,
        }
    }

    #[test]
    fn absent_list_has_no_finalizer() {
        assert!(!has_finalizer(&entry(None), FINALIZER_ENTRY));
    }

    #[test]
    fn present_finalizer_is_detected() {
        let entry = entry(Some(vec![FINALIZER_ENTRY.to_string()]));
        assert!(has_finalizer(&entry, FINALIZER_ENTRY));
    }

    #[test]
    fn other_finalizers_do_not_match() {
        let entry = entry(Some(vec!["kubernetes".to_string()]));
        assert!(!has_finalizer(&entry, FINALIZER_ENTRY));
    }
}
