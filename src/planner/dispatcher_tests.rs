// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the dispatcher

#[cfg(test)]
mod tests {
    use crate::account::{Account, AccountKey, AccountRegistry};
    use crate::constants::PROVIDER_TYPE_MOCK;
    use crate::dns::{DnsName, DnsSet, DnsSetName, RecordSet, RecordType, ZoneId};
    use crate::planner::{DispatchConfig, Dispatcher, OutcomeState, WorkItem};
    use crate::provider::mock::InMemoryFactory;
    use crate::provider::{HandlerFactory, ProviderError, SecretData};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::watch;
    use tokio::time::{sleep, Duration};

    fn mock_account(factory: &InMemoryFactory) -> Arc<Account> {
        let secret = SecretData::new();
        let config = json!({ "name": "test", "zones": [{ "dnsName": "first.example.com" }] });
        let handler = factory.create(&secret, &config).unwrap();
        let key = AccountKey::compute(PROVIDER_TYPE_MOCK, &secret, &config);
        let registry = AccountRegistry::new();
        registry
            .acquire("ns/p1", key.clone(), || {
                Ok(Account::new(
                    key.clone(),
                    PROVIDER_TYPE_MOCK.to_string(),
                    handler,
                    None,
                    Duration::from_secs(300),
                ))
            })
            .unwrap()
    }

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            batch_window: Duration::from_millis(10),
            // Far away so only the drift test observes ticks.
            resync_interval: Duration::from_secs(3600),
            backoff_base: Duration::from_millis(20),
            backoff_cap: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            backoff_jitter: 0.0,
        }
    }

    fn zone() -> ZoneId {
        ZoneId::new(PROVIDER_TYPE_MOCK, "first.example.com")
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

    async fn wait_for_state(
        dispatcher: &Dispatcher,
        entry: &str,
        want: &OutcomeState,
    ) -> bool {
        for _ in 0..200 {
            if let Some(outcome) = dispatcher.sink().get(entry) {
                if outcome.state == *want {
                    return true;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn upsert_reaches_backend_and_reports_applied() {
        let factory = InMemoryFactory::new();
        let account = mock_account(&factory);
        let (_tx, rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(fast_config(), rx);

        let desired = a_set("e1.first.example.com", &["1.1.1.1"]);
        dispatcher.submit(
            account,
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: desired.clone(),
            },
        );

        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);
        let sets = factory.database().zone_sets(&zone()).unwrap();
        assert!(sets.contains_key(&desired.name));
    }

    #[tokio::test]
    async fn delete_removes_record_and_reports_applied() {
        let factory = InMemoryFactory::new();
        let account = mock_account(&factory);
        let (_tx, rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(fast_config(), rx);

        let desired = a_set("e1.first.example.com", &["1.1.1.1"]);
        dispatcher.submit(
            account.clone(),
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: desired.clone(),
            },
        );
        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);

        dispatcher.submit(
            account,
            zone(),
            WorkItem::Delete {
                entry: "default/e1".to_string(),
                name: desired.name.clone(),
            },
        );
        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);
        let sets = factory.database().zone_sets(&zone()).unwrap();
        assert!(!sets.contains_key(&desired.name));
    }

    #[tokio::test]
    async fn transient_failure_retries_to_success() {
        let factory = InMemoryFactory::new();
        let account = mock_account(&factory);
        factory
            .database()
            .inject_execute_failure(&zone(), ProviderError::Backend("flaky".to_string()));
        let (_tx, rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(fast_config(), rx);

        dispatcher.submit(
            account,
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: a_set("e1.first.example.com", &["2.2.2.2"]),
            },
        );

        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);
        let sets = factory.database().zone_sets(&zone()).unwrap();
        assert_eq!(sets.len(), 1);
    }

    #[tokio::test]
    async fn noop_submission_is_applied_without_changes() {
        let factory = InMemoryFactory::new();
        let account = mock_account(&factory);
        let (_tx, rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(fast_config(), rx);

        let desired = a_set("e1.first.example.com", &["1.1.1.1"]);
        dispatcher.submit(
            account.clone(),
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: desired.clone(),
            },
        );
        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);
        // Zone version only moves on execute; a converged resubmission
        // must not call execute at all.
        let version_before = account
            .cache()
            .get_zone_state(&zone(), true)
            .await
            .unwrap()
            .version;

        dispatcher.submit(
            account.clone(),
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: desired,
            },
        );
        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);
        let version_after = account
            .cache()
            .get_zone_state(&zone(), true)
            .await
            .unwrap()
            .version;
        assert_eq!(version_before, version_after);
    }

    #[tokio::test]
    async fn batch_window_coalesces_latest_submission_per_name() {
        let factory = InMemoryFactory::new();
        let account = mock_account(&factory);
        let (_tx, rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(
            DispatchConfig {
                batch_window: Duration::from_millis(100),
                ..fast_config()
            },
            rx,
        );

        dispatcher.submit(
            account.clone(),
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: a_set("e1.first.example.com", &["1.1.1.1"]),
            },
        );
        dispatcher.submit(
            account,
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: a_set("e1.first.example.com", &["2.2.2.2"]),
            },
        );

        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);
        let sets = factory.database().zone_sets(&zone()).unwrap();
        let name = DnsSetName::simple(DnsName::new("e1.first.example.com").unwrap());
        assert_eq!(
            sets.get(&name).unwrap().sets.get(&RecordType::A).unwrap().records,
            vec!["2.2.2.2"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_resync_corrects_backend_drift() {
        let factory = InMemoryFactory::new();
        let account = mock_account(&factory);
        let (_tx, rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(
            DispatchConfig {
                resync_interval: Duration::from_secs(60),
                ..fast_config()
            },
            rx,
        );

        let desired = a_set("e1.first.example.com", &["1.1.1.1"]);
        dispatcher.submit(
            account,
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: desired.clone(),
            },
        );
        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);

        // The record drifts out-of-band; no new submission happens.
        factory
            .database()
            .seed_set(&zone(), a_set("e1.first.example.com", &["9.9.9.9"]));

        // After the zone cache expires, the next batch-timer tick re-diffs
        // the persistent desired state and restores the record.
        tokio::time::advance(Duration::from_secs(301)).await;
        let mut corrected = false;
        for _ in 0..200 {
            let sets = factory.database().zone_sets(&zone()).unwrap();
            if let Some(stored) = sets.get(&desired.name) {
                if stored.sets.get(&RecordType::A).unwrap().records == vec!["1.1.1.1"] {
                    corrected = true;
                    break;
                }
            }
            sleep(Duration::from_millis(500)).await;
        }
        assert!(corrected, "drifted record was never restored");
    }

    #[tokio::test]
    async fn sink_clear_forgets_entry() {
        let factory = InMemoryFactory::new();
        let account = mock_account(&factory);
        let (_tx, rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(fast_config(), rx);

        dispatcher.submit(
            account,
            zone(),
            WorkItem::Upsert {
                entry: "default/e1".to_string(),
                set: a_set("e1.first.example.com", &["1.1.1.1"]),
            },
        );
        assert!(wait_for_state(&dispatcher, "default/e1", &OutcomeState::Applied).await);
        dispatcher.sink().clear("default/e1");
        assert!(dispatcher.sink().get("default/e1").is_none());
    }
}
