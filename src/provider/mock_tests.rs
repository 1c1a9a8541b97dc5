// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `mock.rs`

#[cfg(test)]
mod tests {
    use crate::dns::{diff, DnsName, DnsSet, DnsSetName, RecordSet, RecordType, ZoneId};
    use crate::provider::mock::InMemoryFactory;
    use crate::provider::{HandlerFactory, ProviderError, ProviderHandler, SecretData};
    use serde_json::json;
    use std::sync::Arc;

    fn mock_config() -> serde_json::Value {
        json!({
            "name": "test",
            "zones": [
                { "dnsName": "first.example.com" },
                { "dnsName": "second.example.com" },
            ]
        })
    }

    fn handler() -> (Arc<dyn ProviderHandler>, InMemoryFactory) {
        let factory = InMemoryFactory::new();
        let handler = factory
            .create(&SecretData::new(), &mock_config())
            .unwrap();
        (handler, factory)
    }

    fn a_set(name: &str, addrs: &[&str]) -> DnsSet {
        let mut set = DnsSet::new(DnsSetName::simple(DnsName::new(name).unwrap()));
        set.put(RecordSet::new(
            RecordType::A,
            300,
            addrs.iter().map(|a| (*a).to_string()).collect(),
        ));
        set
    }

    #[test]
    fn validate_rejects_zoneless_config() {
        let factory = InMemoryFactory::new();
        let err = factory
            .validate_credentials(&SecretData::new(), &json!({"name": "x", "zones": []}))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
    }

    #[test]
    fn validate_rejects_malformed_config() {
        let factory = InMemoryFactory::new();
        assert!(factory
            .validate_credentials(&SecretData::new(), &json!({"zones": "nope"}))
            .is_err());
    }

    #[tokio::test]
    async fn get_zones_lists_declared_zones() {
        let (handler, _factory) = handler();
        let zones = handler.get_zones().await.unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].domain, "first.example.com");
        assert!(!zones[0].is_private);
    }

    #[tokio::test]
    async fn zone_prefix_marks_private_zone() {
        let factory = InMemoryFactory::new();
        let handler = factory
            .create(
                &SecretData::new(),
                &json!({
                    "name": "test",
                    "zones": [{ "zonePrefix": "private:", "dnsName": "first.example.com" }]
                }),
            )
            .unwrap();
        let zones = handler.get_zones().await.unwrap();
        assert!(zones[0].is_private);
        assert_eq!(zones[0].id.id, "private:first.example.com");
    }

    #[tokio::test]
    async fn execute_applies_creates_and_bumps_version() {
        let (handler, _factory) = handler();
        let zone = ZoneId::new("mock-inmemory", "first.example.com");

        let before = handler.get_zone_state(&zone).await.unwrap();
        let desired = a_set("e1.first.example.com", &["1.1.1.1"]);
        let requests = diff(None, Some(&desired));
        let results = handler.execute(&zone, &requests, &|_| {}).await.unwrap();
        assert!(results.iter().all(|r| r.outcome.is_ok()));

        let after = handler.get_zone_state(&zone).await.unwrap();
        assert_ne!(before.version, after.version);
        let stored = after.sets.get(&desired.name).unwrap();
        assert_eq!(stored.sets.get(&RecordType::A).unwrap().records, vec!["1.1.1.1"]);
    }

    #[tokio::test]
    async fn execute_delete_removes_empty_name() {
        let (handler, _factory) = handler();
        let zone = ZoneId::new("mock-inmemory", "first.example.com");
        let desired = a_set("e1.first.example.com", &["1.1.1.1"]);

        let create = diff(None, Some(&desired));
        handler.execute(&zone, &create, &|_| {}).await.unwrap();
        let delete = diff(Some(&desired), None);
        handler.execute(&zone, &delete, &|_| {}).await.unwrap();

        let state = handler.get_zone_state(&zone).await.unwrap();
        assert!(state.sets.is_empty());
    }

    #[tokio::test]
    async fn injected_failure_fails_once() {
        let (handler, factory) = handler();
        let zone = ZoneId::new("mock-inmemory", "first.example.com");
        factory
            .database()
            .inject_execute_failure(&zone, ProviderError::Backend("boom".to_string()));

        let desired = a_set("e1.first.example.com", &["1.1.1.1"]);
        let requests = diff(None, Some(&desired));

        let err = handler.execute(&zone, &requests, &|_| {}).await.unwrap_err();
        assert!(err.is_transient());

        // Second attempt succeeds.
        handler.execute(&zone, &requests, &|_| {}).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_zone_is_permanent_error() {
        let (handler, _factory) = handler();
        let zone = ZoneId::new("mock-inmemory", "missing.example.com");
        let err = handler.get_zone_state(&zone).await.unwrap_err();
        assert!(matches!(err, ProviderError::ZoneNotFound(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn progress_callback_fires_per_request() {
        let (handler, _factory) = handler();
        let zone = ZoneId::new("mock-inmemory", "first.example.com");
        let d1 = a_set("a.first.example.com", &["1.1.1.1"]);
        let d2 = a_set("b.first.example.com", &["2.2.2.2"]);
        let mut requests = diff(None, Some(&d1));
        requests.extend(diff(None, Some(&d2)));

        let seen = std::sync::Mutex::new(Vec::new());
        handler
            .execute(&zone, &requests, &|i| seen.lock().unwrap().push(i))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }
}
