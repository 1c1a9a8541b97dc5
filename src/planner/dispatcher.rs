// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-zone change dispatch.
//!
//! One worker task exists per `(account, zone)` pair. Each worker owns the
//! zone's persistent desired state: a `DNSSetName → DNSSet` map fed by
//! entry reconciliations plus the pending deletion intents. A diff against
//! the cached zone state runs on two triggers: work items (coalesced over a
//! short batch window) and a periodic batch-timer tick, so desired state
//! keeps being enforced even when no entry changes; out-of-band drift in
//! the backend is re-corrected once the zone cache refreshes. Outcomes are
//! published per entry into the [`ResultSink`], which the entry state
//! machine consumes on its next reconciliation.
//!
//! Transient failures retry with exponential backoff while the zone's queue
//! waits behind them; that is what serializes changes per zone. Permanent
//! failures are surfaced, dropped from the tracked desired state, and not
//! retried until the entry changes.

use crate::account::{Account, AccountKey};
use crate::dns::{ChangeRequest, DnsSet, DnsSetName, ZoneId};
use crate::planner::{compute_changes, deletion_hash, desired_hash};
use crate::provider::ProviderError;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Dispatcher tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct DispatchConfig {
    /// Window over which submissions are coalesced into one batch
    pub batch_window: Duration,

    /// Batch-timer interval re-diffing the zone's desired state against
    /// the observed state, independent of new submissions
    pub resync_interval: Duration,

    /// Retry backoff base interval
    pub backoff_base: Duration,

    /// Retry backoff cap
    pub backoff_cap: Duration,

    /// Retry backoff growth factor
    pub backoff_multiplier: f64,

    /// Retry backoff jitter fraction
    pub backoff_jitter: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_window: Duration::from_millis(crate::constants::DEFAULT_BATCH_WINDOW_MILLIS),
            resync_interval: Duration::from_secs(
                crate::constants::DISPATCH_RESYNC_INTERVAL_SECS,
            ),
            backoff_base: Duration::from_secs(crate::constants::DISPATCH_BACKOFF_BASE_SECS),
            backoff_cap: Duration::from_secs(crate::constants::DISPATCH_BACKOFF_CAP_SECS),
            backoff_multiplier: crate::constants::DISPATCH_BACKOFF_MULTIPLIER,
            backoff_jitter: crate::constants::DISPATCH_BACKOFF_JITTER,
        }
    }
}

/// Exponential backoff with jitter for dispatch retries.
struct ExponentialBackoff {
    current: Duration,
    cap: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    fn new(config: &DispatchConfig) -> Self {
        Self {
            current: config.backoff_base,
            cap: config.backoff_cap,
            multiplier: config.backoff_multiplier,
            jitter: config.backoff_jitter,
        }
    }

    fn next_interval(&mut self) -> Duration {
        let base = self.current;
        let next = base.as_secs_f64() * self.multiplier;
        self.current = Duration::from_secs_f64(next).min(self.cap);

        if self.jitter <= 0.0 {
            return base;
        }
        let secs = base.as_secs_f64();
        let delta = secs * self.jitter;
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// One unit of work for a zone worker.
#[derive(Clone, Debug)]
pub enum WorkItem {
    /// Bring the record sets at `set.name` to the given desired state
    Upsert {
        /// `namespace/name` of the owning entry
        entry: String,
        /// The desired record sets
        set: DnsSet,
    },
    /// Remove the record sets at `name` on behalf of a deleted entry
    Delete {
        /// `namespace/name` of the owning entry
        entry: String,
        /// The name to clean up
        name: DnsSetName,
    },
    /// Stop tracking `name` without touching the backend; used when an
    /// entry turns Stale and its record is no longer owned
    Forget {
        /// `namespace/name` of the entry that owned the name
        entry: String,
        /// The name to stop enforcing
        name: DnsSetName,
    },
}

impl WorkItem {
    fn entry(&self) -> &str {
        match self {
            WorkItem::Upsert { entry, .. }
            | WorkItem::Delete { entry, .. }
            | WorkItem::Forget { entry, .. } => entry,
        }
    }

    fn name(&self) -> &DnsSetName {
        match self {
            WorkItem::Upsert { set, .. } => &set.name,
            WorkItem::Delete { name, .. } | WorkItem::Forget { name, .. } => name,
        }
    }

    fn hash_value(&self) -> u64 {
        match self {
            WorkItem::Upsert { set, .. } => desired_hash(set),
            WorkItem::Delete { name, .. } | WorkItem::Forget { name, .. } => deletion_hash(name),
        }
    }
}

/// State of a submitted change as seen by the entry reconciler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutcomeState {
    /// Queued or executing
    Pending,
    /// Applied to the backend
    Applied,
    /// Failed; `permanent` failures stop retrying until the entry changes
    Failed {
        /// User-readable failure message
        message: String,
        /// Whether retries have stopped
        permanent: bool,
    },
}

/// Last known outcome for an entry's submission.
#[derive(Clone, Debug)]
pub struct ChangeOutcome {
    /// Outcome state
    pub state: OutcomeState,

    /// Hash of the submitted desired state
    pub submitted_hash: u64,

    /// Name the submission targeted; a later submission under a different
    /// name means the entry was renamed and the old record must go
    pub name: DnsSetName,
}

/// Shared per-entry outcome store.
#[derive(Default)]
pub struct ResultSink {
    inner: Mutex<HashMap<String, ChangeOutcome>>,
}

impl ResultSink {
    fn set_pending(&self, entry: &str, hash: u64, name: DnsSetName) {
        let mut inner = self.inner.lock().expect("result sink lock poisoned");
        inner.insert(
            entry.to_string(),
            ChangeOutcome {
                state: OutcomeState::Pending,
                submitted_hash: hash,
                name,
            },
        );
    }

    /// Record an outcome for `entry`, but only when `hash` still matches
    /// the latest submission; a stale worker pass must not overwrite the
    /// state of a newer one.
    fn record_for(&self, entry: &str, hash: u64, state: OutcomeState) {
        let mut inner = self.inner.lock().expect("result sink lock poisoned");
        if let Some(outcome) = inner.get_mut(entry) {
            if outcome.submitted_hash == hash {
                outcome.state = state;
            }
        }
    }

    /// The last outcome recorded for an entry.
    #[must_use]
    pub fn get(&self, entry: &str) -> Option<ChangeOutcome> {
        let inner = self.inner.lock().expect("result sink lock poisoned");
        inner.get(entry).cloned()
    }

    /// Forget an entry's outcome (after deletion completed).
    pub fn clear(&self, entry: &str) {
        let mut inner = self.inner.lock().expect("result sink lock poisoned");
        inner.remove(entry);
    }
}

struct ZoneWorker {
    sender: mpsc::UnboundedSender<WorkItem>,
}

/// Routes work items to per-zone workers and owns the result sink.
pub struct Dispatcher {
    config: DispatchConfig,
    sink: Arc<ResultSink>,
    workers: Mutex<HashMap<(AccountKey, ZoneId), ZoneWorker>>,
    shutdown: watch::Receiver<bool>,
}

impl Dispatcher {
    /// A dispatcher whose workers stop when `shutdown` flips to `true`.
    #[must_use]
    pub fn new(config: DispatchConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            config,
            sink: Arc::new(ResultSink::default()),
            workers: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// The shared outcome store.
    #[must_use]
    pub fn sink(&self) -> Arc<ResultSink> {
        self.sink.clone()
    }

    /// Submit a work item for a zone, spawning its worker on first use.
    ///
    /// The submitting entry's outcome is reset to [`OutcomeState::Pending`],
    /// except for [`WorkItem::Forget`], which only withdraws the name from
    /// the worker's tracked state.
    pub fn submit(&self, account: Arc<Account>, zone: ZoneId, item: WorkItem) {
        if !matches!(item, WorkItem::Forget { .. }) {
            self.sink
                .set_pending(item.entry(), item.hash_value(), item.name().clone());
        }

        let mut workers = self.workers.lock().expect("dispatcher workers lock poisoned");
        let key = (account.key().clone(), zone.clone());
        let worker = workers.entry(key).or_insert_with(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            let config = self.config;
            let sink = self.sink.clone();
            let shutdown = self.shutdown.clone();
            info!(zone = %zone, account = %account.key(), "starting zone dispatch worker");
            tokio::spawn(zone_worker(
                account.clone(),
                zone,
                receiver,
                sink,
                config,
                shutdown,
            ));
            ZoneWorker { sender }
        });
        // A closed channel means the worker exited on shutdown; the outcome
        // stays Pending and the next reconcile resubmits.
        let _ = worker.sender.send(item);
    }
}

/// The persistent desired state of one zone: what entries declared, what
/// they asked to remove, and which entry owns each name. Never cleared
/// between batches; this is what every diff runs against.
#[derive(Default)]
struct ZoneDesired {
    upserts: BTreeMap<DnsSetName, DnsSet>,
    deletions: BTreeMap<DnsSetName, ()>,
    owners: HashMap<DnsSetName, String>,
    hashes: HashMap<DnsSetName, u64>,
}

impl ZoneDesired {
    fn absorb(&mut self, item: WorkItem) {
        match item {
            WorkItem::Upsert { entry, set } => {
                self.deletions.remove(&set.name);
                self.owners.insert(set.name.clone(), entry);
                self.hashes.insert(set.name.clone(), desired_hash(&set));
                self.upserts.insert(set.name.clone(), set);
            }
            WorkItem::Delete { entry, name } => {
                self.upserts.remove(&name);
                self.owners.insert(name.clone(), entry);
                self.hashes.insert(name.clone(), deletion_hash(&name));
                self.deletions.insert(name, ());
            }
            WorkItem::Forget { name, .. } => {
                self.forget(&name);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }

    /// Drop a name from tracking (deletion settled or failed permanently).
    fn forget(&mut self, name: &DnsSetName) {
        self.upserts.remove(name);
        self.deletions.remove(name);
        self.owners.remove(name);
        self.hashes.remove(name);
    }
}

/// Publish an outcome for the entry owning `name`, tagged with the hash of
/// the submission this worker is enforcing.
fn record_outcome(sink: &ResultSink, desired: &ZoneDesired, name: &DnsSetName, state: OutcomeState) {
    if let (Some(entry), Some(hash)) = (desired.owners.get(name), desired.hashes.get(name)) {
        sink.record_for(entry, *hash, state);
    }
}

async fn zone_worker(
    account: Arc<Account>,
    zone: ZoneId,
    mut receiver: mpsc::UnboundedReceiver<WorkItem>,
    sink: Arc<ResultSink>,
    config: DispatchConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut desired = ZoneDesired::default();
    let mut resync = tokio::time::interval(config.resync_interval);
    resync.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let first = tokio::select! {
            item = receiver.recv() => match item {
                Some(item) => Some(item),
                None => return,
            },
            _ = resync.tick() => None,
            _ = shutdown.changed() => {
                debug!(zone = %zone, "zone worker shutting down");
                return;
            }
        };

        match first {
            Some(first) => {
                // Coalesce everything arriving within the batch window; per
                // name the latest submission wins, which preserves per-name
                // emit order.
                desired.absorb(first);
                let window_end = tokio::time::Instant::now() + config.batch_window;
                loop {
                    let remaining =
                        window_end.saturating_duration_since(tokio::time::Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    match timeout(remaining, receiver.recv()).await {
                        Ok(Some(item)) => desired.absorb(item),
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
            }
            None => {
                // Batch-timer tick: re-diff what we already track.
                if desired.is_empty() {
                    continue;
                }
                debug!(zone = %zone, names = desired.upserts.len(), "periodic desired-state re-diff");
            }
        }

        run_batch(&account, &zone, &mut desired, &sink, &config, &mut shutdown).await;
    }
}

async fn run_batch(
    account: &Arc<Account>,
    zone: &ZoneId,
    desired: &mut ZoneDesired,
    sink: &Arc<ResultSink>,
    config: &DispatchConfig,
    shutdown: &mut watch::Receiver<bool>,
) {
    let mut backoff = ExponentialBackoff::new(config);

    // Read the observed state, retrying transient fetch failures.
    let observed = loop {
        match account.cache().get_zone_state(zone, false).await {
            Ok(state) => break state.sets,
            Err(e) if e.is_transient() => {
                let wait = backoff.next_interval();
                warn!(zone = %zone, error = %e, retry_in = ?wait, "zone read failed, retrying");
                tokio::select! {
                    () = sleep(wait) => {}
                    _ = shutdown.changed() => return,
                }
            }
            Err(e) => {
                // An unreadable zone stops enforcement entirely; entries
                // resubmit when their spec changes.
                let names: Vec<DnsSetName> = desired.owners.keys().cloned().collect();
                for name in &names {
                    record_outcome(
                        sink,
                        desired,
                        name,
                        OutcomeState::Failed {
                            message: e.to_string(),
                            permanent: true,
                        },
                    );
                }
                *desired = ZoneDesired::default();
                return;
            }
        }
    };

    let mut requests = compute_changes(&desired.upserts, &desired.deletions, &observed);

    // Names already converged produce no requests; their entries are done.
    // A converged deletion intent is settled and leaves the desired state.
    let converged: Vec<DnsSetName> = desired
        .owners
        .keys()
        .filter(|name| !requests.iter().any(|request| request.name == **name))
        .cloned()
        .collect();
    for name in &converged {
        record_outcome(sink, desired, name, OutcomeState::Applied);
        if desired.deletions.contains_key(name) {
            desired.forget(name);
        }
    }
    if requests.is_empty() {
        return;
    }

    let mut backoff = ExponentialBackoff::new(config);
    loop {
        // Deletion requests are exempt from the rate limiter.
        let cost = requests.iter().filter(|r| !r.is_delete()).count();
        if let Some(limiter) = account.limiter() {
            limiter.acquire(u32::try_from(cost).unwrap_or(u32::MAX)).await;
        }

        let executed = account
            .handler()
            .execute(zone, &requests, &|_| {})
            .await;

        match executed {
            Ok(results) => {
                let (applied, failed) = split_results(&requests, &results);
                account.cache().apply_success(zone, &applied).await;
                crate::metrics::record_change_requests(
                    account.provider_type(),
                    applied.len(),
                    failed.len(),
                );

                for request in &applied {
                    record_outcome(sink, desired, &request.name, OutcomeState::Applied);
                }

                if failed.is_empty() {
                    // All deletion intents with requests in this batch are
                    // now settled.
                    let done: Vec<DnsSetName> =
                        desired.deletions.keys().cloned().collect();
                    for name in &done {
                        if requests.iter().any(|request| request.name == *name) {
                            desired.forget(name);
                        }
                    }
                    return;
                }
                account.cache().mark_dirty(zone).await;

                let mut retry = Vec::new();
                for (request, error) in failed {
                    if error.is_transient() {
                        record_outcome(
                            sink,
                            desired,
                            &request.name,
                            OutcomeState::Failed {
                                message: error.to_string(),
                                permanent: false,
                            },
                        );
                        retry.push(request);
                    } else {
                        // Stop enforcing this name until the entry changes.
                        record_outcome(
                            sink,
                            desired,
                            &request.name,
                            OutcomeState::Failed {
                                message: error.to_string(),
                                permanent: true,
                            },
                        );
                        let name = request.name.clone();
                        desired.forget(&name);
                    }
                }
                if retry.is_empty() {
                    return;
                }
                requests = retry;
            }
            Err(e) => {
                account.cache().mark_dirty(zone).await;
                let permanent = !e.is_transient();
                let names: Vec<DnsSetName> =
                    requests.iter().map(|request| request.name.clone()).collect();
                for name in &names {
                    record_outcome(
                        sink,
                        desired,
                        name,
                        OutcomeState::Failed {
                            message: e.to_string(),
                            permanent,
                        },
                    );
                }
                if permanent {
                    warn!(zone = %zone, error = %e, "batch rejected permanently");
                    for name in &names {
                        desired.forget(name);
                    }
                    return;
                }
            }
        }

        let wait = backoff.next_interval();
        warn!(zone = %zone, retry_in = ?wait, pending = requests.len(), "retrying failed change requests");
        tokio::select! {
            () = sleep(wait) => {}
            _ = shutdown.changed() => return,
        }
    }
}

/// Partition executed requests into applied and failed, pairing each failed
/// request with its error.
fn split_results(
    requests: &[ChangeRequest],
    results: &[crate::provider::ChangeResult],
) -> (Vec<ChangeRequest>, Vec<(ChangeRequest, ProviderError)>) {
    let mut applied = Vec::new();
    let mut failed = Vec::new();
    for (i, request) in requests.iter().enumerate() {
        match results.get(i).map(|r| &r.outcome) {
            Some(Ok(())) => applied.push(request.clone()),
            Some(Err(e)) => failed.push((request.clone(), e.clone())),
            None => failed.push((
                request.clone(),
                ProviderError::Backend("missing result for request".to_string()),
            )),
        }
    }
    (applied, failed)
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod dispatcher_tests;
