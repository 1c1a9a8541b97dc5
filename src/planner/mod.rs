// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Change planning: desired-vs-observed diffs with the ownership guard.
//!
//! The planner turns the desired record sets of declared entries and the
//! observed zone state into ordered change requests. Deletes are only ever
//! emitted for names owned by a declared, non-Stale entry. Observed records
//! nobody declares are invisible to this system and never touched.

pub mod dispatcher;

pub use dispatcher::{
    ChangeOutcome, DispatchConfig, Dispatcher, OutcomeState, ResultSink, WorkItem,
};

use crate::dns::{diff, order_batch, ChangeRequest, DnsSet, DnsSetName};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use tracing::error;

/// Compute the ordered change requests for one zone.
///
/// `desired` holds the record sets of entries assigned to the zone;
/// `deletions` the names whose owning entries are being removed. Observed
/// names in neither map are unowned and ignored. The returned batch is
/// ordered delete before update before create.
#[must_use]
pub fn compute_changes(
    desired: &BTreeMap<DnsSetName, DnsSet>,
    deletions: &BTreeMap<DnsSetName, ()>,
    observed: &BTreeMap<DnsSetName, DnsSet>,
) -> Vec<ChangeRequest> {
    let mut requests = Vec::new();

    for (name, want) in desired {
        if deletions.contains_key(name) {
            // A deletion intent supersedes a stale upsert for the same name.
            continue;
        }
        requests.extend(diff(observed.get(name), Some(want)));
    }

    for name in deletions.keys() {
        let Some(have) = observed.get(name) else {
            continue;
        };
        requests.extend(diff(Some(have), None));
    }

    // The ownership guard is structural: every emitted delete traces back to
    // a deletion intent or a desired set. Anything else is a planner bug.
    for request in &requests {
        if request.is_delete()
            && !deletions.contains_key(&request.name)
            && !desired.contains_key(&request.name)
        {
            error!(name = %request.name, "planner invariant violated: delete for unowned name");
        }
    }

    order_batch(&mut requests);
    requests
}

/// Stable hash of a desired record set, used to detect no-op resubmissions.
#[must_use]
pub fn desired_hash(set: &DnsSet) -> u64 {
    let serialized = serde_json::to_string(set).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    serialized.hash(&mut hasher);
    hasher.finish()
}

/// Hash marking a deletion intent for a name.
#[must_use]
pub fn deletion_hash(name: &DnsSetName) -> u64 {
    let mut hasher = DefaultHasher::new();
    "delete".hash(&mut hasher);
    name.to_string().hash(&mut hasher);
    hasher.finish()
}
