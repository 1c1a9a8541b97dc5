// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The in-memory unit of DNS state: all record sets at one name.
//!
//! A [`DnsSet`] maps record types to [`RecordSet`]s under one [`DnsSetName`],
//! optionally tagged with a routing policy. [`diff`] compares two (possibly
//! absent) sets and yields the minimal sequence of [`ChangeRequest`]s that
//! turns the old state into the new one; applying that sequence is exactly
//! the mutation handed to a provider handler.

use crate::dns::name::DnsSetName;
use crate::dns::recordset::{RecordSet, RecordType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A routing policy attached to a record set.
///
/// The type is an open-set string; parameters are passed through to the
/// provider handler verbatim and validated there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutingPolicy {
    /// Policy type, e.g. `weighted`, `geolocation`, `latency`, `failover`
    pub r#type: String,

    /// Identifier distinguishing this record set from its siblings under
    /// the same DNS name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,

    /// Provider-specific parameters, e.g. `{"weight": "10"}`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

/// All record sets declared or observed at one DNS name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsSet {
    /// The name (and optional set identifier) these record sets live at
    pub name: DnsSetName,

    /// At most one record set per type
    pub sets: BTreeMap<RecordType, RecordSet>,

    /// Routing policy, passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_policy: Option<RoutingPolicy>,
}

impl DnsSet {
    /// An empty set at the given name.
    #[must_use]
    pub fn new(name: DnsSetName) -> Self {
        Self {
            name,
            sets: BTreeMap::new(),
            routing_policy: None,
        }
    }

    /// Insert a record set, replacing any existing set of the same type.
    pub fn put(&mut self, set: RecordSet) {
        self.sets.insert(set.rtype, set);
    }

    /// Whether no record sets are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Check the CNAME exclusivity rule: a set containing a CNAME may not
    /// contain A, AAAA or TXT records of the same name.
    ///
    /// # Errors
    ///
    /// Returns a message naming the conflicting type.
    pub fn check_cname_exclusive(&self) -> Result<(), String> {
        if !self.sets.contains_key(&RecordType::CNAME) {
            return Ok(());
        }
        for conflicting in [RecordType::A, RecordType::AAAA, RecordType::TXT] {
            if self.sets.contains_key(&conflicting) {
                return Err(format!(
                    "record set {} contains both CNAME and {conflicting} records",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

/// One change to a single `(name, type)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    /// The record set does not exist and must be created
    Create {
        /// The record set to write
        new: RecordSet,
    },
    /// The record set exists with different content
    Update {
        /// The record set as currently observed
        old: RecordSet,
        /// The record set to write
        new: RecordSet,
    },
    /// The record set exists and must be removed
    Delete {
        /// The record set as currently observed
        old: RecordSet,
    },
}

impl Change {
    /// Ordering rank within a batch: deletes before updates before creates.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Change::Delete { .. } => 0,
            Change::Update { .. } => 1,
            Change::Create { .. } => 2,
        }
    }
}

/// A provider-facing change request: one [`Change`] at one name, carrying
/// the routing policy of the desired state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRequest {
    /// The name the change applies to
    pub name: DnsSetName,

    /// The change itself
    pub change: Change,

    /// Routing policy of the desired record set (absent for deletes)
    pub routing_policy: Option<RoutingPolicy>,
}

impl ChangeRequest {
    /// The record type this request touches.
    #[must_use]
    pub fn rtype(&self) -> RecordType {
        match &self.change {
            Change::Create { new } | Change::Update { new, .. } => new.rtype,
            Change::Delete { old } => old.rtype,
        }
    }

    /// Whether this request removes a record set.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self.change, Change::Delete { .. })
    }
}

impl fmt::Display for ChangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            Change::Create { new } => write!(f, "CREATE {} {new}", self.name),
            Change::Update { new, .. } => write!(f, "UPDATE {} {new}", self.name),
            Change::Delete { old } => write!(f, "DELETE {} {old}", self.name),
        }
    }
}

/// Compute the minimal change requests turning `old` into `new` at one name.
///
/// Types are visited in the fixed [`RecordType::ALL`] order so the output is
/// deterministic; equal record sets produce nothing, which makes repeated
/// diffs of a converged state empty.
#[must_use]
pub fn diff(old: Option<&DnsSet>, new: Option<&DnsSet>) -> Vec<ChangeRequest> {
    let name = match (old, new) {
        (Some(set), _) | (None, Some(set)) => set.name.clone(),
        (None, None) => return Vec::new(),
    };
    let policy = new.and_then(|set| set.routing_policy.clone());

    let mut requests = Vec::new();
    for rtype in RecordType::ALL {
        let old_set = old.and_then(|set| set.sets.get(&rtype));
        let new_set = new.and_then(|set| set.sets.get(&rtype));
        let change = match (old_set, new_set) {
            (None, Some(n)) if !n.is_empty() => Some(Change::Create { new: n.clone() }),
            (Some(o), None) => Some(Change::Delete { old: o.clone() }),
            (Some(o), Some(n)) if n.is_empty() => Some(Change::Delete { old: o.clone() }),
            (Some(o), Some(n)) if o != n => Some(Change::Update {
                old: o.clone(),
                new: n.clone(),
            }),
            _ => None,
        };
        if let Some(change) = change {
            let routing_policy = if matches!(change, Change::Delete { .. }) {
                None
            } else {
                policy.clone()
            };
            requests.push(ChangeRequest {
                name: name.clone(),
                change,
                routing_policy,
            });
        }
    }
    requests
}

/// Order a batch of change requests in place: deletes first, then updates,
/// then creates, each group sorted by name and type for determinism.
pub fn order_batch(requests: &mut [ChangeRequest]) {
    requests.sort_by(|a, b| {
        a.change
            .rank()
            .cmp(&b.change.rank())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.rtype().cmp(&b.rtype()))
    });
}

#[cfg(test)]
#[path = "dnsset_tests.rs"]
mod dnsset_tests;
