// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider reconciliation: the account lifecycle state machine.
//!
//! States: Pending → (Invalid | Error | Ready) → Deleting.
//!
//! A reconcile validates the provider type, pins the provider and its
//! credential secret with finalizers, validates credentials, acquires the
//! deduplicated account, discovers zones, runs the selection engine, and
//! publishes the effective zones, domains, TTL and rate limit into status.
//! Deletion is blocked while any non-Stale entry is still assigned.

use crate::account::{Account, AccountKey};
use crate::constants::{
    EMPTY_ACCOUNT_REQUEUE_SECS, ERROR_REQUEUE_DURATION_SECS, FINALIZER_PROVIDER,
    REQUEUE_WHEN_READY_SECS,
};
use crate::context::{matches_class, Context};
use crate::crd::{
    object_key, DNSProvider, DNSProviderStatus, EntryState, ProviderState, SelectionStatus,
};
use crate::events::{emit_normal, emit_warning};
use crate::provider::registry::TypeRejection;
use crate::provider::SecretData;
use crate::reconcilers::finalizers::{
    ensure_finalizer, ensure_secret_finalizer, has_finalizer, release_secret_finalizer,
    remove_finalizer,
};
use crate::reconcilers::now_rfc3339;
use crate::selection::{select_zones, SelectionOutcome, Selector};
use anyhow::Result;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use serde_json::json;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one provider reconcile step, driving status and requeue.
enum StepFailure {
    Invalid(String),
    Error(String, Duration),
}

/// Reconcile one `DNSProvider`.
///
/// # Errors
///
/// Returns an error only for unexpected API failures; state problems are
/// reported through status instead.
pub async fn reconcile_provider(ctx: Arc<Context>, provider: DNSProvider) -> Result<Action> {
    let namespace = provider.namespace().unwrap_or_default();
    let name = provider.name_any();
    let provider_key = object_key(&namespace, &name);

    if !matches_class(provider.annotations(), &ctx.config.class) {
        debug!(provider = %provider_key, "provider has foreign class, ignoring");
        return Ok(Action::await_change());
    }
    if !ctx.config.provider_namespace.is_empty() && namespace != ctx.config.provider_namespace {
        debug!(provider = %provider_key, "provider outside accepted namespace, ignoring");
        return Ok(Action::await_change());
    }

    if provider.metadata.deletion_timestamp.is_some() {
        return delete_provider(&ctx, &provider, &provider_key).await;
    }

    info!(provider = %provider_key, "reconciling DNSProvider");

    match try_reconcile(&ctx, &provider, &provider_key).await? {
        Ok(outcome) => {
            let zones_included: Vec<String> =
                outcome.zones.keys().map(|id| id.id.clone()).collect();
            let zones_excluded: Vec<String> =
                outcome.zones_excluded.iter().map(|id| id.id.clone()).collect();
            let effective_ttl = provider.spec.default_ttl.unwrap_or(ctx.config.default_ttl);
            let effective_quota = provider
                .spec
                .rate_limit
                .or_else(|| ctx.config.default_rate_limit());

            let status = DNSProviderStatus {
                observed_generation: provider.metadata.generation,
                state: Some(ProviderState::Ready),
                message: Some("provider is ready".to_string()),
                domains: Some(SelectionStatus {
                    included: outcome.domains_included.iter().cloned().collect(),
                    excluded: outcome.domains_excluded.iter().cloned().collect(),
                }),
                zones: Some(SelectionStatus {
                    included: zones_included,
                    excluded: zones_excluded,
                }),
                default_ttl: Some(effective_ttl),
                rate_limit: effective_quota,
                last_update_time: None,
            };
            let changed = update_provider_status(&ctx, &provider, status).await?;
            ctx.put_selection(&provider_key, outcome);
            if changed {
                emit_normal(&ctx.recorder, &provider, "Reconciled", "provider is ready").await;
            }
            Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)))
        }
        Err(StepFailure::Invalid(message)) => {
            warn!(provider = %provider_key, message = %message, "provider spec invalid");
            ctx.remove_selection(&provider_key);
            let status = cleared_status(&provider, ProviderState::Invalid, &message);
            update_provider_status(&ctx, &provider, status).await?;
            emit_warning(&ctx.recorder, &provider, "Invalid", &message).await;
            Ok(Action::await_change())
        }
        Err(StepFailure::Error(message, requeue)) => {
            warn!(provider = %provider_key, message = %message, "provider reconcile failed");
            ctx.remove_selection(&provider_key);
            let status = cleared_status(&provider, ProviderState::Error, &message);
            update_provider_status(&ctx, &provider, status).await?;
            emit_warning(&ctx.recorder, &provider, "Error", &message).await;
            Ok(Action::requeue(requeue))
        }
    }
}

/// Run the ready path, returning a step failure instead of status writes.
async fn try_reconcile(
    ctx: &Arc<Context>,
    provider: &DNSProvider,
    provider_key: &str,
) -> Result<std::result::Result<SelectionOutcome, StepFailure>> {
    let provider_type = provider.spec.r#type.clone();

    // Step 1: type validation.
    let factory = match ctx.registry.lookup(&provider_type) {
        Ok(factory) => factory,
        Err(TypeRejection::Unsupported) => {
            return Ok(Err(StepFailure::Invalid(format!(
                "provider type {provider_type} is not supported"
            ))));
        }
        Err(TypeRejection::Disabled) => {
            return Ok(Err(StepFailure::Invalid(format!(
                "provider type {provider_type} is not enabled"
            ))));
        }
    };

    // Step 2: finalizer on the provider itself.
    ensure_finalizer(&ctx.client, provider, FINALIZER_PROVIDER).await?;

    // Step 3: credential load, pinning the secret.
    let provider_namespace = provider.namespace().unwrap_or_default();
    let secret_data = match &provider.spec.secret_ref {
        Some(secret_ref) => {
            let secret_namespace = secret_ref
                .namespace
                .clone()
                .unwrap_or_else(|| provider_namespace.clone());
            let api: Api<Secret> = Api::namespaced(ctx.client.clone(), &secret_namespace);
            match api.get(&secret_ref.name).await {
                Ok(secret) => {
                    ensure_secret_finalizer(
                        &ctx.client,
                        &secret_namespace,
                        &secret_ref.name,
                        FINALIZER_PROVIDER,
                    )
                    .await?;
                    secret_bytes(&secret)
                }
                Err(kube::Error::Api(e)) if e.code == 404 => {
                    return Ok(Err(StepFailure::Error(
                        format!("secret {secret_namespace}/{} not found", secret_ref.name),
                        Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
        None => SecretData::new(),
    };

    let provider_config = provider
        .spec
        .provider_config
        .clone()
        .unwrap_or(serde_json::Value::Null);

    // Step 4: credential validation, side-effect free.
    if let Err(e) = factory.validate_credentials(&secret_data, &provider_config) {
        return Ok(Err(StepFailure::Error(
            e.to_string(),
            Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
        )));
    }

    // Step 5: account acquire, deduplicated by content hash.
    let key = AccountKey::compute(&provider_type, &secret_data, &provider_config);
    let quota = provider
        .spec
        .rate_limit
        .or_else(|| ctx.config.default_rate_limit());
    let zone_cache_ttl = ctx.config.zone_cache_ttl();
    let account = match ctx.accounts.acquire(provider_key, key.clone(), || {
        let handler = factory.create(&secret_data, &provider_config)?;
        Ok(Account::new(
            key.clone(),
            provider_type.clone(),
            handler,
            quota,
            zone_cache_ttl,
        ))
    }) {
        Ok(account) => account,
        Err(e) => {
            return Ok(Err(StepFailure::Error(
                e.to_string(),
                Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
            )));
        }
    };

    // Step 6: zone discovery.
    let zones = match account.get_zones().await {
        Ok(zones) => zones,
        Err(e) => {
            return Ok(Err(StepFailure::Error(
                e.to_string(),
                Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
            )));
        }
    };
    if zones.is_empty() {
        return Ok(Err(StepFailure::Error(
            "no hosted zones available in account".to_string(),
            Duration::from_secs(EMPTY_ACCOUNT_REQUEUE_SECS),
        )));
    }

    // Step 7: selection.
    let zone_selector = selector_from_spec(provider.spec.zones.as_ref());
    let domain_selector = selector_from_spec(provider.spec.domains.as_ref());
    let outcome = match select_zones(&zones, &zone_selector, &domain_selector) {
        Ok(outcome) => outcome,
        Err(e) => {
            return Ok(Err(StepFailure::Error(
                e.to_string(),
                Duration::from_secs(EMPTY_ACCOUNT_REQUEUE_SECS),
            )));
        }
    };

    // Hosted-zone policies override the cache TTL per selected zone.
    for (zone_id, domains) in &outcome.zones {
        let domain = domains.iter().next().map_or("", |d| d.as_str());
        let ttl = ctx
            .stores
            .policy_cache_ttl(&zone_id.id, &provider_type, domain);
        account.cache().set_ttl_override(zone_id, ttl);
    }

    Ok(Ok(outcome))
}

/// Handle a provider with a deletion timestamp.
async fn delete_provider(
    ctx: &Arc<Context>,
    provider: &DNSProvider,
    provider_key: &str,
) -> Result<Action> {
    info!(provider = %provider_key, "DNSProvider is being deleted");
    ctx.remove_selection(provider_key);

    if !has_finalizer(provider, FINALIZER_PROVIDER) {
        return Ok(Action::await_change());
    }

    // Deletion is blocked while non-Stale entries are still assigned.
    let assigned: Vec<_> = ctx
        .stores
        .entries_assigned_to_provider(provider_key)
        .into_iter()
        .filter(|entry| {
            entry.status.as_ref().and_then(|status| status.state) != Some(EntryState::Stale)
        })
        .collect();
    if !assigned.is_empty() {
        let message = format!(
            "cannot delete provider, {} DNSEntries still assigned to it",
            assigned.len()
        );
        warn!(provider = %provider_key, "{}", message);
        let status = cleared_status(provider, ProviderState::Deleting, &message);
        update_provider_status(ctx, provider, status).await?;
        return Ok(Action::requeue(Duration::from_secs(
            ERROR_REQUEUE_DURATION_SECS,
        )));
    }

    // Release the secret finalizer unless another provider shares the secret.
    if let Some(secret_ref) = &provider.spec.secret_ref {
        let secret_namespace = secret_ref
            .namespace
            .clone()
            .or_else(|| provider.namespace())
            .unwrap_or_default();
        let other_holders = ctx
            .stores
            .providers_referencing_secret(&secret_namespace, &secret_ref.name)
            .into_iter()
            .filter(|p| {
                object_key(&p.namespace().unwrap_or_default(), &p.name_any()) != provider_key
            })
            .count();
        if other_holders == 0 {
            release_secret_finalizer(
                &ctx.client,
                &secret_namespace,
                &secret_ref.name,
                FINALIZER_PROVIDER,
            )
            .await?;
        }
    }

    ctx.accounts.release(provider_key);
    remove_finalizer(&ctx.client, provider, FINALIZER_PROVIDER).await?;
    emit_normal(&ctx.recorder, provider, "Deleted", "provider released").await;
    Ok(Action::await_change())
}

/// Status for non-Ready states: zone, domain and rate info cleared.
fn cleared_status(provider: &DNSProvider, state: ProviderState, message: &str) -> DNSProviderStatus {
    DNSProviderStatus {
        observed_generation: provider.metadata.generation,
        state: Some(state),
        message: Some(message.to_string()),
        domains: None,
        zones: None,
        default_ttl: None,
        rate_limit: None,
        last_update_time: None,
    }
}

/// Patch the status subresource when any observable field changed.
///
/// Returns whether a patch was written; `lastUpdateTime` bumps only then.
async fn update_provider_status(
    ctx: &Arc<Context>,
    provider: &DNSProvider,
    mut status: DNSProviderStatus,
) -> Result<bool> {
    let current = provider.status.clone().unwrap_or_default();
    let unchanged = current.state == status.state
        && current.message == status.message
        && current.observed_generation == status.observed_generation
        && current.domains.as_ref().map(|d| (&d.included, &d.excluded))
            == status.domains.as_ref().map(|d| (&d.included, &d.excluded))
        && current.zones.as_ref().map(|z| (&z.included, &z.excluded))
            == status.zones.as_ref().map(|z| (&z.included, &z.excluded))
        && current.default_ttl == status.default_ttl
        && current.rate_limit == status.rate_limit;
    if unchanged {
        return Ok(false);
    }

    status.last_update_time = Some(now_rfc3339());
    let namespace = provider.namespace().unwrap_or_default();
    let api: Api<DNSProvider> = Api::namespaced(ctx.client.clone(), &namespace);
    api.patch_status(
        &provider.name_any(),
        &PatchParams::default(),
        &Patch::Merge(&json!({ "status": status })),
    )
    .await?;
    Ok(true)
}

/// Translate the optional CRD selector into the engine's form.
fn selector_from_spec(spec: Option<&crate::crd::SelectorSpec>) -> Selector {
    match spec {
        Some(spec) => Selector {
            include: spec.include.clone().unwrap_or_default(),
            exclude: spec.exclude.clone().unwrap_or_default(),
        },
        None => Selector::default(),
    }
}

/// Decode secret data into raw bytes.
fn secret_bytes(secret: &Secret) -> SecretData {
    let mut data = SecretData::new();
    if let Some(map) = &secret.data {
        for (key, value) in map {
            data.insert(key.clone(), value.0.clone());
        }
    }
    if let Some(map) = &secret.string_data {
        for (key, value) in map {
            data.insert(key.clone(), value.as_bytes().to_vec());
        }
    }
    data
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod provider_tests;
