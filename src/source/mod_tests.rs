// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the source projection helpers

#[cfg(test)]
mod tests {
    use crate::source::{
        names_from_annotation, owner_id, routing_policy_from_annotation, ttl_from_annotation,
    };
    use std::collections::BTreeMap;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn owner_id_without_target_cluster() {
        assert_eq!(
            owner_id("", "shoot", "", "Service", "default", "web"),
            "shoot:/Service/default/web"
        );
    }

    #[test]
    fn owner_id_with_target_cluster() {
        assert_eq!(
            owner_id("seed", "shoot", "networking.k8s.io", "Ingress", "default", "web"),
            "seed:shoot:networking.k8s.io/Ingress/default/web"
        );
    }

    #[test]
    fn names_annotation_lists_names() {
        let annotations = annotations(&[(
            "dns.gardener.cloud/dnsnames",
            "a.example.com, b.example.com",
        )]);
        assert_eq!(
            names_from_annotation(&annotations, &[]),
            vec!["a.example.com", "b.example.com"]
        );
    }

    #[test]
    fn names_annotation_star_derives_hosts() {
        let annotations = annotations(&[("dns.gardener.cloud/dnsnames", "*")]);
        let derived = vec!["host.example.com".to_string()];
        assert_eq!(names_from_annotation(&annotations, &derived), derived);
    }

    #[test]
    fn missing_names_annotation_yields_nothing() {
        assert!(names_from_annotation(&BTreeMap::new(), &["x".to_string()]).is_empty());
    }

    #[test]
    fn ttl_annotation_parses() {
        let annotations = annotations(&[("dns.gardener.cloud/ttl", "600")]);
        assert_eq!(ttl_from_annotation(&annotations), Some(600));
        assert_eq!(ttl_from_annotation(&BTreeMap::new()), None);
    }

    #[test]
    fn routing_policy_annotation_parses_json() {
        let annotations = annotations(&[(
            "dns.gardener.cloud/routing-policy",
            r#"{"type":"weighted","setIdentifier":"blue","parameters":{"weight":"10"}}"#,
        )]);
        let policy = routing_policy_from_annotation(&annotations).unwrap();
        assert_eq!(policy.r#type, "weighted");
        assert_eq!(policy.set_identifier.as_deref(), Some("blue"));
    }
}
