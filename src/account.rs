// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deduplicated provider accounts.
//!
//! Two `DNSProvider` objects with the same provider type, secret content and
//! `providerConfig` share one [`Account`]: one handler instance, one rate
//! limiter, one zone cache. The [`AccountRegistry`] refcounts accounts per
//! referencing provider and tears the handler down on the last release.

use crate::provider::{ProviderError, ProviderHandler, SecretData};
use crate::ratelimit::{RateLimitQuota, TokenBucket};
use crate::zonecache::ZoneCache;
use crate::dns::DnsHostedZone;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tracing::{debug, info};

/// Identity of an account: SHA-256 over provider type, secret content and
/// provider configuration.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccountKey([u8; 32]);

impl AccountKey {
    /// Compute the key for a provider's credentials and configuration.
    #[must_use]
    pub fn compute(
        provider_type: &str,
        secret: &SecretData,
        provider_config: &serde_json::Value,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(provider_type.as_bytes());
        hasher.update([0]);
        for (key, value) in secret {
            hasher.update(key.as_bytes());
            hasher.update([0]);
            hasher.update(value);
            hasher.update([0]);
        }
        hasher.update(provider_config.to_string().as_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Runtime aggregate of a deduplicated provider backend.
pub struct Account {
    key: AccountKey,
    provider_type: String,
    handler: Arc<dyn ProviderHandler>,
    limiter: Option<Arc<TokenBucket>>,
    cache: ZoneCache,
}

impl Account {
    /// Assemble an account around a freshly built handler.
    #[must_use]
    pub fn new(
        key: AccountKey,
        provider_type: String,
        handler: Arc<dyn ProviderHandler>,
        quota: Option<RateLimitQuota>,
        zone_cache_ttl: Duration,
    ) -> Self {
        let limiter = quota.map(|q| Arc::new(TokenBucket::new(q)));
        let cache = ZoneCache::new(handler.clone(), limiter.clone(), zone_cache_ttl);
        Self {
            key,
            provider_type,
            handler,
            limiter,
            cache,
        }
    }

    /// The account's identity.
    #[must_use]
    pub fn key(&self) -> &AccountKey {
        &self.key
    }

    /// The provider type served by this account.
    #[must_use]
    pub fn provider_type(&self) -> &str {
        &self.provider_type
    }

    /// The raw handler. Mutations must go through the dispatcher.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn ProviderHandler> {
        &self.handler
    }

    /// The account-wide rate limiter, if limiting is enabled.
    #[must_use]
    pub fn limiter(&self) -> Option<&Arc<TokenBucket>> {
        self.limiter.as_ref()
    }

    /// The zone-state cache.
    #[must_use]
    pub fn cache(&self) -> &ZoneCache {
        &self.cache
    }

    /// Discover the hosted zones of the account, under the rate limiter.
    ///
    /// # Errors
    ///
    /// Propagates the handler error.
    pub async fn get_zones(&self) -> Result<Vec<DnsHostedZone>, ProviderError> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire(1).await;
        }
        self.handler.get_zones().await
    }
}

struct AccountEntry {
    account: Arc<Account>,
    refs: usize,
}

/// Refcounted account table plus the provider-object to account assignment.
///
/// The registry is owned by the shared context and passed explicitly; tests
/// build fresh registries so no state crosses cases. The inner lock is held
/// only for O(1) bookkeeping, never across handler construction.
#[derive(Default)]
pub struct AccountRegistry {
    accounts: Mutex<HashMap<AccountKey, AccountEntry>>,
    assignments: Mutex<HashMap<String, AccountKey>>,
}

impl AccountRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the account for `provider_object` (a `namespace/name` key).
    ///
    /// If an account with the same [`AccountKey`] already exists its
    /// refcount is incremented; otherwise `build` constructs a new one. A
    /// provider re-acquiring under a changed key releases its old
    /// assignment first.
    ///
    /// # Errors
    ///
    /// Propagates the `build` error; nothing is registered in that case.
    pub fn acquire(
        &self,
        provider_object: &str,
        key: AccountKey,
        build: impl FnOnce() -> Result<Account, ProviderError>,
    ) -> Result<Arc<Account>, ProviderError> {
        // A provider whose credentials changed moves between accounts.
        let previous = {
            let assignments = self
                .assignments
                .lock()
                .expect("account assignments lock poisoned");
            assignments.get(provider_object).cloned()
        };
        if let Some(previous_key) = previous {
            if previous_key != key {
                self.release(provider_object);
            } else {
                let accounts = self.accounts.lock().expect("account table lock poisoned");
                if let Some(entry) = accounts.get(&key) {
                    return Ok(entry.account.clone());
                }
            }
        }

        // Construct outside the lock only if needed; double-check after.
        {
            let mut accounts = self.accounts.lock().expect("account table lock poisoned");
            if let Some(entry) = accounts.get_mut(&key) {
                entry.refs += 1;
                debug!(account = %key, refs = entry.refs, "account shared");
                self.assign(provider_object, key);
                return Ok(entry.account.clone());
            }
        }

        let account = Arc::new(build()?);
        let mut accounts = self.accounts.lock().expect("account table lock poisoned");
        let entry = accounts.entry(key.clone()).or_insert_with(|| {
            info!(account = %key, provider_type = %account.provider_type, "account created");
            AccountEntry {
                account: account.clone(),
                refs: 0,
            }
        });
        entry.refs += 1;
        let shared = entry.account.clone();
        drop(accounts);
        self.assign(provider_object, key);
        Ok(shared)
    }

    fn assign(&self, provider_object: &str, key: AccountKey) {
        let mut assignments = self
            .assignments
            .lock()
            .expect("account assignments lock poisoned");
        assignments.insert(provider_object.to_string(), key);
    }

    /// Release the account held by `provider_object`, destroying it on the
    /// last reference.
    pub fn release(&self, provider_object: &str) {
        let key = {
            let mut assignments = self
                .assignments
                .lock()
                .expect("account assignments lock poisoned");
            assignments.remove(provider_object)
        };
        let Some(key) = key else {
            return;
        };
        let mut accounts = self.accounts.lock().expect("account table lock poisoned");
        let last_reference = match accounts.get_mut(&key) {
            Some(entry) => {
                entry.refs -= 1;
                entry.refs == 0
            }
            None => false,
        };
        if last_reference {
            if let Some(entry) = accounts.remove(&key) {
                drop(accounts);
                info!(account = %key, "account destroyed");
                entry.account.handler.release();
            }
        }
    }

    /// The account currently assigned to `provider_object`.
    #[must_use]
    pub fn lookup(&self, provider_object: &str) -> Option<Arc<Account>> {
        let assignments = self
            .assignments
            .lock()
            .expect("account assignments lock poisoned");
        let key = assignments.get(provider_object)?;
        let accounts = self.accounts.lock().expect("account table lock poisoned");
        accounts.get(key).map(|entry| entry.account.clone())
    }
}

#[cfg(test)]
#[path = "account_tests.rs"]
mod account_tests;
