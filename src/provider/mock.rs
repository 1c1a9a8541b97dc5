// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory mock provider.
//!
//! The mock is a complete [`ProviderHandler`] implementation backed by a
//! shared in-process database. It is the reference semantics for real cloud
//! adapters and the workhorse of the test suite: zones are declared through
//! `providerConfig`, and one-shot `execute` failures can be injected per
//! zone to exercise the dispatcher's retry path.
//!
//! `providerConfig` shape:
//!
//! ```json
//! { "name": "test", "zones": [ { "zonePrefix": "pre:", "dnsName": "first.example.com" } ] }
//! ```

use crate::constants::PROVIDER_TYPE_MOCK;
use crate::dns::{Change, ChangeRequest, DnsHostedZone, DnsSet, DnsSetName, ZoneId};
use crate::provider::{
    ChangeResult, HandlerFactory, ProgressFn, ProviderError, ProviderHandler, SecretData,
    ZoneState,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One mock zone declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockZoneConfig {
    /// Optional identifier prefix marking a private zone
    #[serde(default)]
    pub zone_prefix: Option<String>,

    /// The zone's domain
    pub dns_name: String,
}

/// The mock's `providerConfig` payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    /// Account name, purely informational
    pub name: String,

    /// Zones served by the account
    pub zones: Vec<MockZoneConfig>,
}

#[derive(Default)]
struct MockZoneData {
    domain: String,
    is_private: bool,
    sets: BTreeMap<DnsSetName, DnsSet>,
    version: u64,
    fail_next_execute: Option<ProviderError>,
}

/// Shared in-memory zone database.
///
/// One database is owned per [`InMemoryFactory`]; tests construct fresh
/// factories so no state leaks across cases.
#[derive(Default)]
pub struct InMemoryDatabase {
    zones: Mutex<BTreeMap<ZoneId, MockZoneData>>,
}

impl InMemoryDatabase {
    fn register_zone(&self, id: ZoneId, domain: String, is_private: bool) {
        let mut zones = self.zones.lock().expect("mock database lock poisoned");
        zones.entry(id).or_insert_with(|| MockZoneData {
            domain,
            is_private,
            ..MockZoneData::default()
        });
    }

    /// Make the next `execute` against `zone` fail with `error`, once.
    pub fn inject_execute_failure(&self, zone: &ZoneId, error: ProviderError) {
        let mut zones = self.zones.lock().expect("mock database lock poisoned");
        if let Some(data) = zones.get_mut(zone) {
            data.fail_next_execute = Some(error);
        }
    }

    /// Snapshot all record sets of a zone; `None` if the zone is unknown.
    #[must_use]
    pub fn zone_sets(&self, zone: &ZoneId) -> Option<BTreeMap<DnsSetName, DnsSet>> {
        let zones = self.zones.lock().expect("mock database lock poisoned");
        zones.get(zone).map(|data| data.sets.clone())
    }

    /// Seed a record set directly, bypassing `execute`. Used to model
    /// records owned by other controllers.
    pub fn seed_set(&self, zone: &ZoneId, set: DnsSet) {
        let mut zones = self.zones.lock().expect("mock database lock poisoned");
        if let Some(data) = zones.get_mut(zone) {
            data.sets.insert(set.name.clone(), set);
            data.version += 1;
        }
    }
}

/// Handler serving the zones one mock account declares.
pub struct InMemoryHandler {
    account: String,
    zone_ids: Vec<ZoneId>,
    database: Arc<InMemoryDatabase>,
}

#[async_trait]
impl ProviderHandler for InMemoryHandler {
    async fn get_zones(&self) -> Result<Vec<DnsHostedZone>, ProviderError> {
        let zones = self
            .database
            .zones
            .lock()
            .expect("mock database lock poisoned");
        Ok(self
            .zone_ids
            .iter()
            .filter_map(|id| {
                zones.get(id).map(|data| DnsHostedZone {
                    id: id.clone(),
                    domain: data.domain.clone(),
                    is_private: data.is_private,
                    forwarded_subdomains: Vec::new(),
                })
            })
            .collect())
    }

    async fn get_zone_state(&self, zone: &ZoneId) -> Result<ZoneState, ProviderError> {
        let zones = self
            .database
            .zones
            .lock()
            .expect("mock database lock poisoned");
        let data = zones
            .get(zone)
            .ok_or_else(|| ProviderError::ZoneNotFound(zone.to_string()))?;
        Ok(ZoneState {
            sets: data.sets.clone(),
            version: data.version.to_string(),
        })
    }

    async fn execute(
        &self,
        zone: &ZoneId,
        requests: &[ChangeRequest],
        progress: ProgressFn<'_>,
    ) -> Result<Vec<ChangeResult>, ProviderError> {
        let mut zones = self
            .database
            .zones
            .lock()
            .expect("mock database lock poisoned");
        let data = zones
            .get_mut(zone)
            .ok_or_else(|| ProviderError::ZoneNotFound(zone.to_string()))?;

        if let Some(error) = data.fail_next_execute.take() {
            debug!(account = %self.account, zone = %zone, "mock: failing injected execute");
            return Err(error);
        }

        let mut results = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            match &request.change {
                Change::Create { new } | Change::Update { new, .. } => {
                    let entry = data
                        .sets
                        .entry(request.name.clone())
                        .or_insert_with(|| DnsSet::new(request.name.clone()));
                    entry.put(new.clone());
                    entry.routing_policy = request.routing_policy.clone();
                }
                Change::Delete { old } => {
                    if let Some(entry) = data.sets.get_mut(&request.name) {
                        entry.sets.remove(&old.rtype);
                        if entry.is_empty() {
                            data.sets.remove(&request.name);
                        }
                    }
                }
            }
            progress(i);
            results.push(ChangeResult {
                name: request.name.clone(),
                outcome: Ok(()),
            });
        }
        data.version += 1;
        Ok(results)
    }

    fn release(&self) {
        debug!(account = %self.account, "mock: handler released");
    }
}

/// Factory for the in-memory mock, owning its database.
pub struct InMemoryFactory {
    database: Arc<InMemoryDatabase>,
}

impl InMemoryFactory {
    /// A factory with a fresh, empty database.
    #[must_use]
    pub fn new() -> Self {
        Self {
            database: Arc::new(InMemoryDatabase::default()),
        }
    }

    /// The underlying database, for test seeding and fault injection.
    #[must_use]
    pub fn database(&self) -> Arc<InMemoryDatabase> {
        self.database.clone()
    }

    fn parse_config(provider_config: &serde_json::Value) -> Result<MockConfig, ProviderError> {
        serde_json::from_value(provider_config.clone())
            .map_err(|e| ProviderError::InvalidConfig(format!("mock config: {e}")))
    }

    fn zone_id(zone: &MockZoneConfig) -> ZoneId {
        let prefix = zone.zone_prefix.clone().unwrap_or_default();
        ZoneId::new(PROVIDER_TYPE_MOCK, format!("{prefix}{}", zone.dns_name))
    }
}

impl Default for InMemoryFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerFactory for InMemoryFactory {
    fn provider_type(&self) -> &'static str {
        PROVIDER_TYPE_MOCK
    }

    fn validate_credentials(
        &self,
        _secret: &SecretData,
        provider_config: &serde_json::Value,
    ) -> Result<(), ProviderError> {
        let config = Self::parse_config(provider_config)?;
        if config.zones.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "mock config declares no zones".to_string(),
            ));
        }
        Ok(())
    }

    fn create(
        &self,
        _secret: &SecretData,
        provider_config: &serde_json::Value,
    ) -> Result<Arc<dyn ProviderHandler>, ProviderError> {
        let config = Self::parse_config(provider_config)?;
        let mut zone_ids = Vec::with_capacity(config.zones.len());
        for zone in &config.zones {
            let id = Self::zone_id(zone);
            self.database.register_zone(
                id.clone(),
                zone.dns_name.trim_end_matches('.').to_ascii_lowercase(),
                zone.zone_prefix.is_some(),
            );
            zone_ids.push(id);
        }
        Ok(Arc::new(InMemoryHandler {
            account: config.name,
            zone_ids,
            database: self.database.clone(),
        }))
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod mock_tests;
