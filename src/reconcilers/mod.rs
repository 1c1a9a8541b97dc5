// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for dnsman resources.
//!
//! Each reconciler follows the standard controller pattern: watch, compare
//! desired state (CRD spec) against observed state (backend + status),
//! mutate through the dispatcher, and report results back into the status
//! subresource.
//!
//! # Available Reconcilers
//!
//! - [`provider::reconcile_provider`] - Account lifecycle, zone discovery and selection
//! - [`entry::reconcile_entry`] - Per-entry record reconciliation
//! - [`policy::reconcile_policy`] - Hosted-zone cache policies
//! - [`annotation::reconcile_annotation`] - Annotation injection onto foreign objects

pub mod annotation;
pub mod entry;
pub mod finalizers;
pub mod policy;
pub mod provider;

use chrono::Utc;

/// Check if a resource's spec changed by comparing generation with
/// `observed_generation`.
///
/// `metadata.generation` is incremented by the API server only on spec
/// changes; the controller mirrors it into `status.observedGeneration` after
/// processing. Differing values (or a missing observation) mean work is due.
#[must_use]
pub fn should_reconcile(current_generation: Option<i64>, observed_generation: Option<i64>) -> bool {
    match (current_generation, observed_generation) {
        (Some(current), Some(observed)) => current != observed,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Compare a candidate status value with the current one.
///
/// Status patches are issued only when a value actually changed; writing
/// unchanged status re-triggers the watch and loops the controller.
#[must_use]
pub fn status_changed<T: PartialEq>(current_value: &Option<T>, new_value: &Option<T>) -> bool {
    current_value != new_value
}

/// Current time in RFC3339, the format used by `lastUpdateTime` fields.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod mod_tests;
