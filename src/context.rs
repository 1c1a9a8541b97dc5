// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` carrying the Kubernetes
//! client, reflector stores for the dnsman CRDs, the handler registry, the
//! refcounted account table, the change dispatcher and the process
//! configuration. The stores enable in-memory lookups (provider matching,
//! cross-watch mapping) without API queries.

use crate::account::AccountRegistry;
use crate::config::Config;
use crate::constants::ANNOTATION_CLASS;
use crate::crd::{DNSEntry, DNSHostedZonePolicy, DNSProvider, ProviderState};
use crate::planner::Dispatcher;
use crate::provider::HandlerRegistry;
use crate::resolve::TargetLookup;
use crate::selection::SelectionOutcome;
use kube::runtime::events::Recorder;
use kube::runtime::reflector::Store;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

/// Default class assumed for objects without a class annotation
pub const DEFAULT_CLASS: &str = "dnsman";

/// Whether an object's class annotation matches this controller instance.
#[must_use]
pub fn matches_class(annotations: &BTreeMap<String, String>, controller_class: &str) -> bool {
    annotations
        .get(ANNOTATION_CLASS)
        .map_or(controller_class == DEFAULT_CLASS, |class| {
            class == controller_class
        })
}

/// Collection of reflector stores for cross-controller queries.
#[derive(Clone)]
pub struct Stores {
    /// All `DNSEntry` objects
    pub entries: Store<DNSEntry>,

    /// All `DNSProvider` objects
    pub providers: Store<DNSProvider>,

    /// All `DNSHostedZonePolicy` objects
    pub policies: Store<DNSHostedZonePolicy>,
}

impl Stores {
    /// Entries currently assigned to a provider (`namespace/name`), by
    /// status. Used while deleting a provider and for cross-watch mapping.
    #[must_use]
    pub fn entries_assigned_to_provider(&self, provider_key: &str) -> Vec<Arc<DNSEntry>> {
        self.entries
            .state()
            .into_iter()
            .filter(|entry| {
                entry
                    .status
                    .as_ref()
                    .and_then(|status| status.provider.as_deref())
                    == Some(provider_key)
            })
            .collect()
    }

    /// Providers referencing a secret (`namespace/name`). Used for secret
    /// cross-watch mapping and secret finalizer release.
    #[must_use]
    pub fn providers_referencing_secret(
        &self,
        secret_namespace: &str,
        secret_name: &str,
    ) -> Vec<Arc<DNSProvider>> {
        self.providers
            .state()
            .into_iter()
            .filter(|provider| {
                provider.spec.secret_ref.as_ref().is_some_and(|secret_ref| {
                    let ref_namespace = secret_ref
                        .namespace
                        .clone()
                        .or_else(|| provider.namespace())
                        .unwrap_or_default();
                    secret_ref.name == secret_name && ref_namespace == secret_namespace
                })
            })
            .collect()
    }

    /// Providers in Ready state matching the controller class.
    #[must_use]
    pub fn ready_providers(&self, controller_class: &str) -> Vec<Arc<DNSProvider>> {
        self.providers
            .state()
            .into_iter()
            .filter(|provider| {
                matches_class(provider.annotations(), controller_class)
                    && provider
                        .status
                        .as_ref()
                        .and_then(|status| status.state)
                        == Some(ProviderState::Ready)
            })
            .collect()
    }

    /// The zone-state cache TTL override from the first hosted-zone policy
    /// whose selector intersects the given zone identity.
    #[must_use]
    pub fn policy_cache_ttl(
        &self,
        zone_id: &str,
        provider_type: &str,
        domain: &str,
    ) -> Option<Duration> {
        for policy in self.policies.state() {
            let selector = &policy.spec.selector;
            let matches = selector
                .zone_ids
                .as_ref()
                .is_some_and(|ids| ids.iter().any(|id| id == zone_id))
                || selector
                    .provider_types
                    .as_ref()
                    .is_some_and(|types| types.iter().any(|t| t == provider_type))
                || selector
                    .domain_names
                    .as_ref()
                    .is_some_and(|names| names.iter().any(|n| n == domain));
            if matches {
                if let Some(ttl) = policy.spec.policy.zone_state_cache_ttl {
                    return u64::try_from(ttl).ok().map(Duration::from_secs);
                }
            }
        }
        None
    }
}

/// Shared context passed to all controllers.
pub struct Context {
    /// Kubernetes client of the cluster being reconciled
    pub client: Client,

    /// Client of the cluster receiving source-projected objects; equals
    /// `client` unless cross-cluster projection is configured
    pub target_client: Client,

    /// Reflector stores
    pub stores: Stores,

    /// Provider handler factories with administrative gating
    pub registry: HandlerRegistry,

    /// Refcounted account table
    pub accounts: AccountRegistry,

    /// Change dispatcher with per-zone workers
    pub dispatcher: Dispatcher,

    /// Event recorder
    pub recorder: Recorder,

    /// Process configuration
    pub config: Config,

    /// DNS lookup used for CNAME flattening
    pub lookup: Arc<dyn TargetLookup>,

    /// Selection outcome per ready provider (`namespace/name`), published
    /// by the provider reconciler and consumed for entry matching
    selections: Mutex<HashMap<String, SelectionOutcome>>,
}

impl Context {
    /// Assemble a context.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        client: Client,
        target_client: Client,
        stores: Stores,
        registry: HandlerRegistry,
        dispatcher: Dispatcher,
        recorder: Recorder,
        config: Config,
        lookup: Arc<dyn TargetLookup>,
    ) -> Self {
        Self {
            client,
            target_client,
            stores,
            registry,
            accounts: AccountRegistry::new(),
            dispatcher,
            recorder,
            config,
            lookup,
            selections: Mutex::new(HashMap::new()),
        }
    }

    /// Publish a provider's selection outcome.
    pub fn put_selection(&self, provider_key: &str, outcome: SelectionOutcome) {
        let mut selections = self.selections.lock().expect("selections lock poisoned");
        selections.insert(provider_key.to_string(), outcome);
    }

    /// Drop a provider's selection outcome (deletion or non-Ready).
    pub fn remove_selection(&self, provider_key: &str) {
        let mut selections = self.selections.lock().expect("selections lock poisoned");
        selections.remove(provider_key);
    }

    /// The selection outcome of one provider.
    #[must_use]
    pub fn selection(&self, provider_key: &str) -> Option<SelectionOutcome> {
        let selections = self.selections.lock().expect("selections lock poisoned");
        selections.get(provider_key).cloned()
    }

    /// Snapshot of all published selections.
    #[must_use]
    pub fn selections(&self) -> HashMap<String, SelectionOutcome> {
        self.selections
            .lock()
            .expect("selections lock poisoned")
            .clone()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
