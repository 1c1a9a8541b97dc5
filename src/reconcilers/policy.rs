// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hosted-zone policy reconciliation.
//!
//! A policy selects zones by domain name, provider type or zone id and
//! overrides their zone-state cache TTL. The override is applied onto the
//! caches of every account currently serving a matching zone; the provider
//! reconciler re-applies it whenever selections change.

use crate::constants::REQUEUE_WHEN_READY_SECS;
use crate::context::Context;
use crate::crd::{DNSHostedZonePolicy, DNSHostedZonePolicyStatus};
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use serde_json::json;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::info;

/// Reconcile one `DNSHostedZonePolicy`.
///
/// # Errors
///
/// Returns an error for unexpected API failures.
pub async fn reconcile_policy(ctx: Arc<Context>, policy: DNSHostedZonePolicy) -> Result<Action> {
    let name = policy.name_any();
    info!(policy = %name, "reconciling DNSHostedZonePolicy");

    let selector = &policy.spec.selector;
    let ttl = policy
        .spec
        .policy
        .zone_state_cache_ttl
        .and_then(|secs| u64::try_from(secs).ok())
        .map(Duration::from_secs);

    let mut matched = 0;
    for (provider_key, outcome) in ctx.selections() {
        let Some(account) = ctx.accounts.lookup(&provider_key) else {
            continue;
        };
        for (zone_id, domains) in &outcome.zones {
            let matches = selector
                .zone_ids
                .as_ref()
                .is_some_and(|ids| ids.iter().any(|id| *id == zone_id.id))
                || selector
                    .provider_types
                    .as_ref()
                    .is_some_and(|types| types.iter().any(|t| *t == zone_id.provider_type))
                || selector
                    .domain_names
                    .as_ref()
                    .is_some_and(|names| names.iter().any(|n| domains.contains(n)));
            if matches {
                matched += 1;
                account.cache().set_ttl_override(zone_id, ttl);
            }
        }
    }

    let status = DNSHostedZonePolicyStatus {
        observed_generation: policy.metadata.generation,
        zone_count: Some(matched),
        message: None,
    };
    let current = policy.status.clone().unwrap_or_default();
    if current.zone_count != status.zone_count
        || current.observed_generation != status.observed_generation
    {
        let api: Api<DNSHostedZonePolicy> = Api::all(ctx.client.clone());
        api.patch_status(
            &name,
            &PatchParams::default(),
            &Patch::Merge(&json!({ "status": status })),
        )
        .await?;
    }

    Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)))
}
