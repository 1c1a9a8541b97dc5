// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The provider handler contract.
//!
//! Every external DNS backend is plugged in through [`ProviderHandler`] and
//! its companion [`HandlerFactory`]. The contract is narrow on purpose:
//! `get_zone_state` is the sole read path, `execute` the sole mutation path,
//! and handlers never cache zone state themselves; the rate-limited zone
//! cache owns that.
//!
//! The in-memory mock ([`mock::InMemoryFactory`]) is the reference
//! implementation of these semantics.

pub mod mock;
pub mod registry;

pub use registry::HandlerRegistry;

use crate::dns::{ChangeRequest, DnsHostedZone, DnsSet, DnsSetName, ZoneId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Decoded secret data handed to a factory: secret key to raw bytes.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Errors surfaced by provider handlers.
///
/// The split between transient and permanent drives the dispatcher's retry
/// decision: transient failures back off and retry, permanent failures stop
/// until the entry or provider changes.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The backend throttled the request
    #[error("request was throttled by the backend: {0}")]
    Throttled(String),

    /// The backend did not answer in time
    #[error("backend request timed out: {0}")]
    Timeout(String),

    /// The backend failed on its side (5xx class)
    #[error("backend failure: {0}")]
    Backend(String),

    /// The backend rejected the request (4xx class)
    #[error("request rejected by the backend: {0}")]
    Rejected(String),

    /// The credentials were refused
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The named zone does not exist in the account
    #[error("hosted zone {0} not found")]
    ZoneNotFound(String),

    /// The provider configuration blob is malformed
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderError {
    /// Whether the dispatcher should retry this failure with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Throttled(_) | ProviderError::Timeout(_) | ProviderError::Backend(_)
        )
    }
}

/// Bulk-read result of one zone: every record set in the zone plus an opaque
/// version used only to detect changes between reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneState {
    /// All record sets in the zone, keyed by name
    pub sets: BTreeMap<DnsSetName, DnsSet>,

    /// Opaque zone version at read time
    pub version: String,
}

impl ZoneState {
    /// An empty zone state.
    #[must_use]
    pub fn empty(version: impl Into<String>) -> Self {
        Self {
            sets: BTreeMap::new(),
            version: version.into(),
        }
    }
}

/// Outcome of one change request within an executed batch.
#[derive(Clone, Debug)]
pub struct ChangeResult {
    /// The name the request applied to
    pub name: DnsSetName,

    /// Per-request outcome; a batch may partially succeed
    pub outcome: Result<(), ProviderError>,
}

/// Progress callback invoked by handlers after each applied request.
pub type ProgressFn<'a> = &'a (dyn Fn(usize) + Send + Sync);

/// Adapter each external DNS backend implements.
///
/// Handlers must be safe for concurrent `get_zone_state` calls across
/// different zones; per-zone serialization inside the handler is allowed.
#[async_trait]
pub trait ProviderHandler: Send + Sync {
    /// Discover the hosted zones of the account, in a stable order.
    async fn get_zones(&self) -> Result<Vec<DnsHostedZone>, ProviderError>;

    /// Bulk-fetch the full state of one zone.
    async fn get_zone_state(&self, zone: &ZoneId) -> Result<ZoneState, ProviderError>;

    /// Apply a batch of change requests to one zone.
    ///
    /// Returns one result per request, in request order. A batch may
    /// partially succeed; `progress` is invoked with the index of each
    /// request once it has been attempted.
    async fn execute(
        &self,
        zone: &ZoneId,
        requests: &[ChangeRequest],
        progress: ProgressFn<'_>,
    ) -> Result<Vec<ChangeResult>, ProviderError>;

    /// Release any provider-side caches. Called on account teardown.
    fn release(&self);
}

/// Factory registered per provider type.
pub trait HandlerFactory: Send + Sync {
    /// The provider type string this factory serves, e.g. `mock-inmemory`.
    fn provider_type(&self) -> &'static str;

    /// Validate credentials and configuration without side effects.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidCredentials`] or
    /// [`ProviderError::InvalidConfig`] with a user-readable message.
    fn validate_credentials(
        &self,
        secret: &SecretData,
        provider_config: &serde_json::Value,
    ) -> Result<(), ProviderError>;

    /// Construct a handler for an account.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration cannot produce a handler.
    fn create(
        &self,
        secret: &SecretData,
        provider_config: &serde_json::Value,
    ) -> Result<Arc<dyn ProviderHandler>, ProviderError>;
}
