// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Entry reconciliation: the per-entry state machine.
//!
//! States: Pending → (Invalid | Error | Stale | Ignored | Ready) → Deleting.
//!
//! A reconcile validates the spec, resolves the reference chain, matches the
//! responsible provider by longest base-domain suffix, derives the desired
//! record sets (flattening CNAME targets where required), submits the result
//! to the dispatcher and projects the dispatcher's outcome into status on
//! the following pass. The finalizer is held only while a backend record is
//! owned; Stale entries release it immediately on deletion.

use crate::constants::{
    ANNOTATION_IGNORE, ANNOTATION_OPERATION, ERROR_REQUEUE_DURATION_SECS, FINALIZER_ENTRY,
    IGNORE_FULL, IGNORE_RECONCILE, OPERATION_RECONCILE, PENDING_REQUEUE_DURATION_SECS,
    REQUEUE_WHEN_READY_SECS,
};
use crate::context::{matches_class, Context};
use crate::crd::{object_key, DNSEntry, DNSEntryStatus, EntryReference, EntryState};
use crate::dns::{DnsName, DnsSet, DnsSetName, RoutingPolicy, ZoneId};
use crate::events::{emit_normal, emit_warning};
use crate::planner::{deletion_hash, desired_hash, OutcomeState, WorkItem};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::reconcilers::now_rfc3339;
use crate::resolve::{resolve_targets, resolve_text};
use crate::selection::match_provider;
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Spec fields after reference-chain merging.
#[derive(Clone, Debug, Default)]
struct EffectiveSpec {
    dns_name: String,
    targets: Vec<String>,
    text: Vec<String>,
    ttl: Option<i64>,
    cname_lookup_interval: Option<i64>,
    resolve_targets_to_addresses: Option<bool>,
    routing_policy: Option<RoutingPolicy>,
}

enum SpecFailure {
    Invalid(String),
    Error(String),
}

/// Reconcile one `DNSEntry`.
///
/// # Errors
///
/// Returns an error only for unexpected API failures; every state problem is
/// projected into status instead.
#[allow(clippy::too_many_lines)]
pub async fn reconcile_entry(ctx: Arc<Context>, entry: DNSEntry) -> Result<Action> {
    let namespace = entry.namespace().unwrap_or_default();
    let name = entry.name_any();
    let entry_key = object_key(&namespace, &name);

    if !matches_class(entry.annotations(), &ctx.config.class) {
        debug!(entry = %entry_key, "entry has foreign class, ignoring");
        return Ok(Action::await_change());
    }

    if entry.metadata.deletion_timestamp.is_some() {
        return delete_entry(&ctx, &entry, &entry_key).await;
    }

    let forced = entry.annotations().get(ANNOTATION_OPERATION).map(String::as_str)
        == Some(OPERATION_RECONCILE);

    // Debounce after spec updates; a requested reconcile skips it.
    let observed = entry.status.as_ref().and_then(|s| s.observed_generation);
    if !forced
        && ctx.config.reconciliation_delay_after_update > 0
        && crate::reconcilers::should_reconcile(entry.metadata.generation, observed)
    {
        tokio::time::sleep(Duration::from_secs(
            ctx.config.reconciliation_delay_after_update.min(5),
        ))
        .await;
    }

    // Step 2: ignore annotation. Targets stay frozen at their last observed
    // value; the backend record is left in place.
    if let Some(mode) = entry.annotations().get(ANNOTATION_IGNORE) {
        if mode == IGNORE_RECONCILE || mode == IGNORE_FULL {
            info!(entry = %entry_key, mode = %mode, "entry is ignored");
            let mut status = entry.status.clone().unwrap_or_default();
            status.state = Some(EntryState::Ignored);
            status.message = Some(format!("reconciliation ignored ({mode})"));
            status.observed_generation = entry.metadata.generation;
            update_entry_status(&ctx, &entry, status).await?;
            return Ok(Action::await_change());
        }
    }

    info!(entry = %entry_key, dns_name = %entry.spec.dns_name, "reconciling DNSEntry");

    // Steps 1 and 3: reference resolution, then spec validation.
    let spec = match effective_spec(&ctx, &entry) {
        Ok(spec) => spec,
        Err(SpecFailure::Invalid(message)) => {
            warn!(entry = %entry_key, message = %message, "entry spec invalid");
            let status = failure_status(&entry, EntryState::Invalid, &message);
            if update_entry_status(&ctx, &entry, status).await? {
                emit_warning(&ctx.recorder, &entry, "Invalid", &message).await;
            }
            return Ok(Action::await_change());
        }
        Err(SpecFailure::Error(message)) => {
            let status = failure_status(&entry, EntryState::Error, &message);
            if update_entry_status(&ctx, &entry, status).await? {
                emit_warning(&ctx.recorder, &entry, "Error", &message).await;
            }
            return Ok(Action::requeue(Duration::from_secs(
                ERROR_REQUEUE_DURATION_SECS,
            )));
        }
    };
    let dns_name = match DnsName::new(&spec.dns_name) {
        Ok(dns_name) => dns_name,
        Err(e) => {
            let message = e.to_string();
            let status = failure_status(&entry, EntryState::Invalid, &message);
            if update_entry_status(&ctx, &entry, status).await? {
                emit_warning(&ctx.recorder, &entry, "Invalid", &message).await;
            }
            return Ok(Action::await_change());
        }
    };

    // Steps 4 and 5: provider match, stale detection.
    let selections = ctx.selections();
    let provider_domains: Vec<(&str, Vec<String>)> = selections
        .iter()
        .map(|(key, outcome)| {
            (
                key.as_str(),
                outcome.domains_included.iter().cloned().collect::<Vec<_>>(),
            )
        })
        .collect();
    let matched = match_provider(
        provider_domains
            .iter()
            .map(|(key, domains)| (*key, domains.as_slice())),
        dns_name.as_str(),
    )
    .map(str::to_string);

    let Some(provider_key) = matched else {
        let previously_assigned = entry
            .status
            .as_ref()
            .and_then(|status| status.provider.clone());
        if has_finalizer(&entry, FINALIZER_ENTRY) && previously_assigned.is_some() {
            // The record is assumed to belong to another controller now;
            // withdraw it from enforcement without touching the backend.
            if let Some(previous) = entry.status.as_ref() {
                if let (Some(provider), Some(provider_type), Some(zone)) = (
                    previous.provider.clone(),
                    previous.provider_type.clone(),
                    previous.zone.clone(),
                ) {
                    if let Some(account) = ctx.accounts.lookup(&provider) {
                        ctx.dispatcher.submit(
                            account,
                            ZoneId::new(provider_type, zone),
                            WorkItem::Forget {
                                entry: entry_key.clone(),
                                name: set_name_for(&dns_name, spec.routing_policy.as_ref()),
                            },
                        );
                    }
                }
            }
            let mut status = entry.status.clone().unwrap_or_default();
            status.state = Some(EntryState::Stale);
            status.message = Some("no matching DNS provider found".to_string());
            status.observed_generation = entry.metadata.generation;
            if update_entry_status(&ctx, &entry, status).await? {
                emit_warning(&ctx.recorder, &entry, "Stale", "no matching DNS provider found")
                    .await;
            }
            return Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)));
        }
        // Unowned: no finalizer is added, deletion is unimpeded.
        let message = "no matching DNS provider found";
        let status = failure_status(&entry, EntryState::Error, message);
        if update_entry_status(&ctx, &entry, status).await? {
            emit_warning(&ctx.recorder, &entry, "Error", message).await;
        }
        return Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)));
    };

    let Some(account) = ctx.accounts.lookup(&provider_key) else {
        let status = failure_status(&entry, EntryState::Pending, "waiting for provider account");
        update_entry_status(&ctx, &entry, status).await?;
        return Ok(Action::requeue(Duration::from_secs(
            PENDING_REQUEUE_DURATION_SECS,
        )));
    };
    let selection = ctx.selection(&provider_key).unwrap_or_default();
    let Some((zone_id, _domain)) = selection.zone_for_name(dns_name.as_str()) else {
        let message = "no hosted zone matches the DNS name";
        let status = failure_status(&entry, EntryState::Error, message);
        update_entry_status(&ctx, &entry, status).await?;
        return Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)));
    };
    let zone_id = zone_id.clone();

    // The record is about to be owned; pin the entry.
    ensure_finalizer(&ctx.client, &entry, FINALIZER_ENTRY).await?;

    // Steps 6 and 7: desired record set construction.
    let set_name = set_name_for(&dns_name, spec.routing_policy.as_ref());
    let effective_ttl = spec.ttl.unwrap_or_else(|| provider_default_ttl(&ctx, &provider_key));
    let mut desired = DnsSet::new(set_name.clone());
    desired.routing_policy = spec.routing_policy.clone();

    let (effective_targets, flattened) = if spec.text.is_empty() {
        let resolve = spec.resolve_targets_to_addresses.unwrap_or(false);
        match resolve_targets(
            &set_name,
            &spec.targets,
            effective_ttl,
            resolve,
            ctx.lookup.as_ref(),
            &mut desired,
        )
        .await
        {
            Ok(resolved) => (resolved.effective_targets, resolved.flattened),
            Err(e) => {
                let message = e.to_string();
                let status = failure_status(&entry, EntryState::Error, &message);
                if update_entry_status(&ctx, &entry, status).await? {
                    emit_warning(&ctx.recorder, &entry, "Error", &message).await;
                }
                return Ok(Action::requeue(Duration::from_secs(
                    ERROR_REQUEUE_DURATION_SECS,
                )));
            }
        }
    } else {
        (resolve_text(&spec.text, effective_ttl, &mut desired), false)
    };

    if let Err(message) = desired.check_cname_exclusive() {
        let status = failure_status(&entry, EntryState::Invalid, &message);
        update_entry_status(&ctx, &entry, status).await?;
        return Ok(Action::await_change());
    }

    let lookup_interval = flattened.then(|| {
        spec.cname_lookup_interval
            .unwrap_or(crate::constants::DEFAULT_CNAME_LOOKUP_INTERVAL_SECS)
    });

    // Steps 8 and 9: hand over to the planner, project its last outcome.
    let hash = desired_hash(&desired);
    let sink = ctx.dispatcher.sink();
    let outcome = sink.get(&entry_key);

    // A changed dnsName or set identifier orphans the old record; it must
    // be removed from the zone it was written to.
    if let Some(previous) = &outcome {
        if previous.name != set_name {
            let old_zone = entry
                .status
                .as_ref()
                .and_then(|status| {
                    Some(ZoneId::new(
                        status.provider_type.clone()?,
                        status.zone.clone()?,
                    ))
                })
                .unwrap_or_else(|| zone_id.clone());
            info!(entry = %entry_key, old = %previous.name, new = %set_name, "dns name changed, removing old record");
            ctx.dispatcher.submit(
                account.clone(),
                old_zone,
                WorkItem::Delete {
                    entry: entry_key.clone(),
                    name: previous.name.clone(),
                },
            );
        }
    }
    let projected = ProjectedFields {
        provider: provider_key.clone(),
        provider_type: account.provider_type().to_string(),
        zone: zone_id.id.clone(),
        targets: effective_targets,
        ttl: effective_ttl,
        cname_lookup_interval: lookup_interval,
    };

    match outcome {
        Some(outcome) if outcome.submitted_hash == hash => match outcome.state {
            OutcomeState::Pending => {
                let status = projected.status(&entry, EntryState::Pending, "change request pending");
                update_entry_status(&ctx, &entry, status).await?;
                Ok(Action::requeue(Duration::from_secs(
                    PENDING_REQUEUE_DURATION_SECS,
                )))
            }
            OutcomeState::Applied => {
                let status = projected.status(&entry, EntryState::Ready, "dns entry active");
                if update_entry_status(&ctx, &entry, status).await? {
                    emit_normal(&ctx.recorder, &entry, "Reconciled", "dns entry active").await;
                }
                if forced {
                    clear_operation_annotation(&ctx, &entry).await?;
                }
                let requeue = lookup_interval.map_or(REQUEUE_WHEN_READY_SECS, |interval| {
                    u64::try_from(interval).unwrap_or(REQUEUE_WHEN_READY_SECS)
                });
                Ok(Action::requeue(Duration::from_secs(requeue)))
            }
            OutcomeState::Failed { message, permanent } => {
                let status = projected.status(&entry, EntryState::Error, &message);
                if update_entry_status(&ctx, &entry, status).await? {
                    emit_warning(&ctx.recorder, &entry, "Error", &message).await;
                }
                let requeue = if permanent {
                    REQUEUE_WHEN_READY_SECS
                } else {
                    ERROR_REQUEUE_DURATION_SECS
                };
                Ok(Action::requeue(Duration::from_secs(requeue)))
            }
        },
        _ => {
            debug!(entry = %entry_key, zone = %zone_id, "submitting change request");
            ctx.dispatcher.submit(
                account,
                zone_id,
                WorkItem::Upsert {
                    entry: entry_key.clone(),
                    set: desired,
                },
            );
            let status = projected.status(&entry, EntryState::Pending, "change request queued");
            update_entry_status(&ctx, &entry, status).await?;
            Ok(Action::requeue(Duration::from_secs(
                PENDING_REQUEUE_DURATION_SECS,
            )))
        }
    }
}

/// Handle an entry with a deletion timestamp.
async fn delete_entry(ctx: &Arc<Context>, entry: &DNSEntry, entry_key: &str) -> Result<Action> {
    info!(entry = %entry_key, "DNSEntry is being deleted");

    if !has_finalizer(entry, FINALIZER_ENTRY) {
        ctx.dispatcher.sink().clear(entry_key);
        return Ok(Action::await_change());
    }

    let state = entry.status.as_ref().and_then(|status| status.state);
    let ignore_full = entry.annotations().get(ANNOTATION_IGNORE).map(String::as_str)
        == Some(IGNORE_FULL);

    // Stale records belong to someone else; fully ignored entries keep
    // their record by request. Both release the finalizer immediately,
    // withdrawing the name from enforcement so no later re-diff recreates
    // the record.
    if state == Some(EntryState::Stale) || ignore_full {
        if let Some(status) = entry.status.as_ref() {
            if let (Some(provider), Some(provider_type), Some(zone)) = (
                status.provider.clone(),
                status.provider_type.clone(),
                status.zone.clone(),
            ) {
                if let (Some(account), Ok(dns_name)) = (
                    ctx.accounts.lookup(&provider),
                    DnsName::new(&entry.spec.dns_name),
                ) {
                    ctx.dispatcher.submit(
                        account,
                        ZoneId::new(provider_type, zone),
                        WorkItem::Forget {
                            entry: entry_key.to_string(),
                            name: set_name_for(&dns_name, entry.spec.routing_policy.as_ref()),
                        },
                    );
                }
            }
        }
        ctx.dispatcher.sink().clear(entry_key);
        remove_finalizer(&ctx.client, entry, FINALIZER_ENTRY).await?;
        return Ok(Action::await_change());
    }

    let status = entry.status.clone().unwrap_or_default();
    let (Some(provider_key), Some(provider_type), Some(zone)) =
        (status.provider, status.provider_type, status.zone)
    else {
        // Never assigned; no backend record can exist.
        ctx.dispatcher.sink().clear(entry_key);
        remove_finalizer(&ctx.client, entry, FINALIZER_ENTRY).await?;
        return Ok(Action::await_change());
    };
    let Some(account) = ctx.accounts.lookup(&provider_key) else {
        // The provider is gone; treat the record as no longer owned.
        warn!(entry = %entry_key, provider = %provider_key, "provider account gone, releasing entry");
        ctx.dispatcher.sink().clear(entry_key);
        remove_finalizer(&ctx.client, entry, FINALIZER_ENTRY).await?;
        return Ok(Action::await_change());
    };

    let dns_name = match DnsName::new(&entry.spec.dns_name) {
        Ok(dns_name) => dns_name,
        Err(_) => {
            ctx.dispatcher.sink().clear(entry_key);
            remove_finalizer(&ctx.client, entry, FINALIZER_ENTRY).await?;
            return Ok(Action::await_change());
        }
    };
    let set_name = set_name_for(&dns_name, entry.spec.routing_policy.as_ref());
    let zone_id = ZoneId::new(provider_type, zone);
    let hash = deletion_hash(&set_name);
    let sink = ctx.dispatcher.sink();

    match sink.get(entry_key) {
        Some(outcome) if outcome.submitted_hash == hash => match outcome.state {
            OutcomeState::Applied => {
                sink.clear(entry_key);
                remove_finalizer(&ctx.client, entry, FINALIZER_ENTRY).await?;
                emit_normal(&ctx.recorder, entry, "Deleted", "dns record removed").await;
                Ok(Action::await_change())
            }
            OutcomeState::Pending => {
                let status = failure_status(entry, EntryState::Deleting, "deleting dns record");
                update_entry_status(ctx, entry, status).await?;
                Ok(Action::requeue(Duration::from_secs(
                    PENDING_REQUEUE_DURATION_SECS,
                )))
            }
            OutcomeState::Failed { message, .. } => {
                // Clear so the next pass resubmits the deletion.
                sink.clear(entry_key);
                let status = failure_status(entry, EntryState::Deleting, &message);
                if update_entry_status(ctx, entry, status).await? {
                    emit_warning(&ctx.recorder, entry, "DeleteFailed", &message).await;
                }
                Ok(Action::requeue(Duration::from_secs(
                    ERROR_REQUEUE_DURATION_SECS,
                )))
            }
        },
        _ => {
            ctx.dispatcher.submit(
                account,
                zone_id,
                WorkItem::Delete {
                    entry: entry_key.to_string(),
                    name: set_name,
                },
            );
            let status = failure_status(entry, EntryState::Deleting, "deleting dns record");
            update_entry_status(ctx, entry, status).await?;
            Ok(Action::requeue(Duration::from_secs(
                PENDING_REQUEUE_DURATION_SECS,
            )))
        }
    }
}

/// Fields projected into status when an assignment exists.
struct ProjectedFields {
    provider: String,
    provider_type: String,
    zone: String,
    targets: Vec<String>,
    ttl: i64,
    cname_lookup_interval: Option<i64>,
}

impl ProjectedFields {
    fn status(&self, entry: &DNSEntry, state: EntryState, message: &str) -> DNSEntryStatus {
        DNSEntryStatus {
            observed_generation: entry.metadata.generation,
            state: Some(state),
            message: Some(message.to_string()),
            provider: Some(self.provider.clone()),
            provider_type: Some(self.provider_type.clone()),
            zone: Some(self.zone.clone()),
            targets: Some(self.targets.clone()),
            ttl: Some(self.ttl),
            cname_lookup_interval: self.cname_lookup_interval,
            last_update_time: None,
        }
    }
}

/// Status for failures before any assignment is known; previous assignment
/// fields are preserved so a transient error does not erase them.
fn failure_status(entry: &DNSEntry, state: EntryState, message: &str) -> DNSEntryStatus {
    let mut status = entry.status.clone().unwrap_or_default();
    status.observed_generation = entry.metadata.generation;
    status.state = Some(state);
    status.message = Some(message.to_string());
    status
}

/// Build the record-set name, honoring the routing policy's set identifier.
fn set_name_for(dns_name: &DnsName, policy: Option<&RoutingPolicy>) -> DnsSetName {
    match policy.and_then(|p| p.set_identifier.clone()) {
        Some(id) => DnsSetName::with_identifier(dns_name.clone(), id),
        None => DnsSetName::simple(dns_name.clone()),
    }
}

/// The provider's published default TTL, or the process default.
fn provider_default_ttl(ctx: &Arc<Context>, provider_key: &str) -> i64 {
    ctx.stores
        .providers
        .state()
        .iter()
        .find(|provider| {
            object_key(
                &provider.namespace().unwrap_or_default(),
                &provider.name_any(),
            ) == provider_key
        })
        .and_then(|provider| provider.status.as_ref().and_then(|s| s.default_ttl))
        .unwrap_or(ctx.config.default_ttl)
}

/// Merge the reference chain into one effective spec.
///
/// Cycles and self-references are invalid; a missing referenced entry is a
/// retryable error.
fn effective_spec(ctx: &Arc<Context>, entry: &DNSEntry) -> Result<EffectiveSpec, SpecFailure> {
    let namespace = entry.namespace().unwrap_or_default();
    let mut spec = EffectiveSpec {
        dns_name: entry.spec.dns_name.clone(),
        targets: entry.spec.targets.clone().unwrap_or_default(),
        text: entry.spec.text.clone().unwrap_or_default(),
        ttl: entry.spec.ttl,
        cname_lookup_interval: entry.spec.cname_lookup_interval,
        resolve_targets_to_addresses: entry.spec.resolve_targets_to_addresses,
        routing_policy: entry.spec.routing_policy.clone(),
    };

    let mut visited: HashSet<String> =
        HashSet::from([object_key(&namespace, &entry.name_any())]);
    let mut next = entry.spec.reference.clone();

    while let Some(reference) = next {
        let ref_key = reference_key(&reference, &namespace);
        if !visited.insert(ref_key.clone()) {
            return Err(SpecFailure::Invalid(format!(
                "reference cycle detected at entry {ref_key}"
            )));
        }
        let referenced = ctx
            .stores
            .entries
            .state()
            .iter()
            .find(|candidate| {
                object_key(
                    &candidate.namespace().unwrap_or_default(),
                    &candidate.name_any(),
                ) == ref_key
            })
            .cloned();
        let Some(referenced) = referenced else {
            return Err(SpecFailure::Error(format!(
                "referenced DNSEntry {ref_key} not found"
            )));
        };

        if spec.targets.is_empty() && spec.text.is_empty() {
            spec.targets = referenced.spec.targets.clone().unwrap_or_default();
            spec.text = referenced.spec.text.clone().unwrap_or_default();
        }
        if spec.ttl.is_none() {
            spec.ttl = referenced.spec.ttl;
        }
        if spec.cname_lookup_interval.is_none() {
            spec.cname_lookup_interval = referenced.spec.cname_lookup_interval;
        }
        if spec.resolve_targets_to_addresses.is_none() {
            spec.resolve_targets_to_addresses = referenced.spec.resolve_targets_to_addresses;
        }
        if spec.routing_policy.is_none() {
            spec.routing_policy = referenced.spec.routing_policy.clone();
        }
        next = referenced.spec.reference.clone();
    }

    // Step 1: spec validation on the merged result.
    if !spec.targets.is_empty() && !spec.text.is_empty() {
        return Err(SpecFailure::Invalid(
            "cannot specify both targets and text fields".to_string(),
        ));
    }
    if spec.targets.is_empty() && spec.text.is_empty() {
        return Err(SpecFailure::Invalid(
            "no target or text specified".to_string(),
        ));
    }
    if spec.ttl.is_some_and(|ttl| ttl < 0) {
        return Err(SpecFailure::Invalid("TTL must not be negative".to_string()));
    }
    Ok(spec)
}

fn reference_key(reference: &EntryReference, default_namespace: &str) -> String {
    let namespace = reference
        .namespace
        .clone()
        .unwrap_or_else(|| default_namespace.to_string());
    object_key(&namespace, &reference.name)
}

/// Remove the operation annotation after a successful forced reconcile.
async fn clear_operation_annotation(ctx: &Arc<Context>, entry: &DNSEntry) -> Result<()> {
    let namespace = entry.namespace().unwrap_or_default();
    let api: Api<DNSEntry> = Api::namespaced(ctx.client.clone(), &namespace);
    let patch = json!({
        "metadata": { "annotations": { ANNOTATION_OPERATION: null } }
    });
    api.patch(
        &entry.name_any(),
        &PatchParams::default(),
        &Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}

/// Patch the status subresource when any observable field changed.
///
/// Returns whether a patch was written; `lastUpdateTime` bumps only then.
async fn update_entry_status(
    ctx: &Arc<Context>,
    entry: &DNSEntry,
    mut status: DNSEntryStatus,
) -> Result<bool> {
    let current = entry.status.clone().unwrap_or_default();
    let unchanged = current.state == status.state
        && current.message == status.message
        && current.observed_generation == status.observed_generation
        && current.provider == status.provider
        && current.provider_type == status.provider_type
        && current.zone == status.zone
        && targets_equal(current.targets.as_deref(), status.targets.as_deref())
        && current.ttl == status.ttl
        && current.cname_lookup_interval == status.cname_lookup_interval;
    if unchanged {
        return Ok(false);
    }

    status.last_update_time = Some(now_rfc3339());
    let namespace = entry.namespace().unwrap_or_default();
    let api: Api<DNSEntry> = Api::namespaced(ctx.client.clone(), &namespace);
    api.patch_status(
        &entry.name_any(),
        &PatchParams::default(),
        &Patch::Merge(&json!({ "status": status })),
    )
    .await?;
    Ok(true)
}

/// Targets compare as sets; resolution order is not meaningful.
fn targets_equal(current: Option<&[String]>, new: Option<&[String]>) -> bool {
    match (current, new) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            let mut a: Vec<&String> = a.iter().collect();
            let mut b: Vec<&String> = b.iter().collect();
            a.sort();
            b.sort();
            a == b
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod entry_tests;
