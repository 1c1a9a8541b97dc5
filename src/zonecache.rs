// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Rate-limited, TTL-bounded cache of zone state.
//!
//! The cache is the single shared read path between the entry reconciler and
//! the dispatcher. At most one fetch is in flight per zone; concurrent
//! readers wait on that fetch instead of stacking requests on the backend.
//! After a successful `execute` the cache is patched in place with the
//! applied deltas, so the common path never re-reads the zone; a failed
//! `execute` marks the entry dirty and the next read forces a refresh.

use crate::dns::{Change, ChangeRequest, DnsSet, ZoneId};
use crate::provider::{ProviderError, ProviderHandler, ZoneState};
use crate::ratelimit::TokenBucket;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{watch, Mutex};
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

struct Slot {
    state: Option<ZoneState>,
    refresh_after: Instant,
    dirty: bool,
    inflight: Option<watch::Receiver<bool>>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            state: None,
            refresh_after: Instant::now(),
            dirty: false,
            inflight: None,
        }
    }

    fn is_fresh(&self) -> bool {
        self.state.is_some() && !self.dirty && Instant::now() < self.refresh_after
    }
}

/// Cached zone state for one account.
pub struct ZoneCache {
    handler: Arc<dyn ProviderHandler>,
    limiter: Option<Arc<TokenBucket>>,
    default_ttl: Duration,
    ttl_overrides: StdMutex<HashMap<ZoneId, Duration>>,
    slots: Mutex<HashMap<ZoneId, Slot>>,
}

impl ZoneCache {
    /// A cache reading through `handler`, throttled by `limiter` when given.
    #[must_use]
    pub fn new(
        handler: Arc<dyn ProviderHandler>,
        limiter: Option<Arc<TokenBucket>>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            handler,
            limiter,
            default_ttl,
            ttl_overrides: StdMutex::new(HashMap::new()),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Override the cache TTL for one zone (hosted-zone policy or provider
    /// spec). Passing `None` reverts to the default.
    pub fn set_ttl_override(&self, zone: &ZoneId, ttl: Option<Duration>) {
        let mut overrides = self
            .ttl_overrides
            .lock()
            .expect("zone cache ttl lock poisoned");
        match ttl {
            Some(ttl) => {
                overrides.insert(zone.clone(), ttl);
            }
            None => {
                overrides.remove(zone);
            }
        }
    }

    fn ttl_for(&self, zone: &ZoneId) -> Duration {
        self.ttl_overrides
            .lock()
            .expect("zone cache ttl lock poisoned")
            .get(zone)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Read a zone's state, serving from cache while fresh.
    ///
    /// With `force_refresh`, the cached state is bypassed once; a concurrent
    /// fetch satisfies the forced read as well.
    ///
    /// # Errors
    ///
    /// Propagates the handler error of the fetch that this call performed.
    pub async fn get_zone_state(
        &self,
        zone: &ZoneId,
        force_refresh: bool,
    ) -> Result<ZoneState, ProviderError> {
        let mut force = force_refresh;
        loop {
            let waiter = {
                let mut slots = self.slots.lock().await;
                let slot = slots.entry(zone.clone()).or_insert_with(Slot::empty);

                if !force && slot.is_fresh() {
                    crate::metrics::record_zone_cache_lookup("hit");
                    return Ok(slot.state.clone().expect("fresh slot has state"));
                }
                if let Some(rx) = &slot.inflight {
                    crate::metrics::record_zone_cache_lookup("wait");
                    Some(rx.clone())
                } else {
                    let (tx, rx) = watch::channel(false);
                    slot.inflight = Some(rx);
                    crate::metrics::record_zone_cache_lookup("miss");
                    drop(slots);
                    return self.fetch(zone, tx).await;
                }
            };

            if let Some(mut rx) = waiter {
                // Another reader is fetching; its result satisfies us,
                // including a forced refresh.
                let _ = rx.changed().await;
                force = false;
            }
        }
    }

    async fn fetch(
        &self,
        zone: &ZoneId,
        done: watch::Sender<bool>,
    ) -> Result<ZoneState, ProviderError> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire(1).await;
        }
        let result = self.handler.get_zone_state(zone).await;

        let mut slots = self.slots.lock().await;
        let slot = slots.entry(zone.clone()).or_insert_with(Slot::empty);
        slot.inflight = None;
        match &result {
            Ok(state) => {
                debug!(zone = %zone, version = %state.version, "zone state refreshed");
                slot.state = Some(state.clone());
                slot.refresh_after = Instant::now() + self.ttl_for(zone);
                slot.dirty = false;
            }
            Err(e) => {
                warn!(zone = %zone, error = %e, "zone state fetch failed");
            }
        }
        drop(slots);
        let _ = done.send(true);
        result
    }

    /// Patch the cached state with requests that were applied successfully.
    pub async fn apply_success(&self, zone: &ZoneId, applied: &[ChangeRequest]) {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(zone) else {
            return;
        };
        let Some(state) = &mut slot.state else {
            return;
        };
        for request in applied {
            match &request.change {
                Change::Create { new } | Change::Update { new, .. } => {
                    let entry = state
                        .sets
                        .entry(request.name.clone())
                        .or_insert_with(|| DnsSet::new(request.name.clone()));
                    entry.put(new.clone());
                    entry.routing_policy = request.routing_policy.clone();
                }
                Change::Delete { old } => {
                    if let Some(entry) = state.sets.get_mut(&request.name) {
                        entry.sets.remove(&old.rtype);
                        if entry.is_empty() {
                            state.sets.remove(&request.name);
                        }
                    }
                }
            }
        }
    }

    /// Mark a zone dirty so the next read refreshes from the backend.
    pub async fn mark_dirty(&self, zone: &ZoneId) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(zone) {
            slot.dirty = true;
        }
    }
}

#[cfg(test)]
#[path = "zonecache_tests.rs"]
mod zonecache_tests;
