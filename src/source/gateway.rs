// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateway source: projects Gateway API gateways into entries.
//!
//! Gateway API types are not part of `k8s-openapi`, so gateways are read
//! dynamically and the listener hostnames / status addresses are extracted
//! from the raw object data. `dnsnames: "*"` derives the names from
//! `spec.listeners[].hostname`; targets come from `status.addresses`.

use crate::constants::{FINALIZER_SOURCE, REQUEUE_WHEN_READY_SECS};
use crate::context::{matches_class, Context};
use crate::reconcilers::finalizers::{has_finalizer, remove_finalizer};
use crate::source::{
    ignore_from_annotation, names_from_annotation, owner_id, project_entries,
    routing_policy_from_annotation, ttl_from_annotation, SourceSpec,
};
use anyhow::Result;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde_json::json;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info};

/// The Gateway API resource read by this source.
#[must_use]
pub fn gateway_api_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        "gateway.networking.k8s.io",
        "v1",
        "Gateway",
    ))
}

/// Listener hostnames from the raw gateway data.
fn listener_hostnames(gateway: &DynamicObject) -> Vec<String> {
    gateway
        .data
        .pointer("/spec/listeners")
        .and_then(serde_json::Value::as_array)
        .map(|listeners| {
            listeners
                .iter()
                .filter_map(|listener| listener.pointer("/hostname"))
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Address values from the gateway status.
fn status_addresses(gateway: &DynamicObject) -> Vec<String> {
    gateway
        .data
        .pointer("/status/addresses")
        .and_then(serde_json::Value::as_array)
        .map(|addresses| {
            addresses
                .iter()
                .filter_map(|address| address.pointer("/value"))
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reconcile one Gateway source object.
///
/// # Errors
///
/// Returns an error when API operations fail.
pub async fn reconcile_gateway(ctx: Arc<Context>, gateway: DynamicObject) -> Result<Action> {
    let namespace = gateway.namespace().unwrap_or_default();
    let name = gateway.name_any();

    if !matches_class(gateway.annotations(), &ctx.config.class) {
        return Ok(Action::await_change());
    }

    let owner = owner_id(
        &ctx.config.source_target_cluster_id,
        &ctx.config.source_cluster_id,
        "gateway.networking.k8s.io",
        "Gateway",
        &namespace,
        &name,
    );

    if gateway.metadata.deletion_timestamp.is_some() {
        if has_finalizer(&gateway, FINALIZER_SOURCE) {
            project_entries(&ctx, &owner, &namespace, &name, &SourceSpec::default()).await?;
            remove_gateway_finalizer(&ctx, &gateway, &namespace).await?;
        }
        return Ok(Action::await_change());
    }

    let hosts = listener_hostnames(&gateway);
    let names = names_from_annotation(gateway.annotations(), &hosts);
    if names.is_empty() {
        if has_finalizer(&gateway, FINALIZER_SOURCE) {
            project_entries(&ctx, &owner, &namespace, &name, &SourceSpec::default()).await?;
            remove_gateway_finalizer(&ctx, &gateway, &namespace).await?;
        }
        return Ok(Action::await_change());
    }

    let targets = status_addresses(&gateway);
    if targets.is_empty() {
        debug!(gateway = %format!("{namespace}/{name}"), "gateway has no addresses yet");
        return Ok(Action::requeue(Duration::from_secs(30)));
    }

    ensure_gateway_finalizer(&ctx, &gateway, &namespace).await?;

    let spec = SourceSpec {
        names,
        targets,
        text: Vec::new(),
        ttl: ttl_from_annotation(gateway.annotations()),
        routing_policy: routing_policy_from_annotation(gateway.annotations()),
        ignore: ignore_from_annotation(gateway.annotations()),
    };
    info!(gateway = %format!("{namespace}/{name}"), names = spec.names.len(), "projecting gateway");
    project_entries(&ctx, &owner, &namespace, &name, &spec).await?;

    Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)))
}

async fn ensure_gateway_finalizer(
    ctx: &Arc<Context>,
    gateway: &DynamicObject,
    namespace: &str,
) -> Result<()> {
    if has_finalizer(gateway, FINALIZER_SOURCE) {
        return Ok(());
    }
    let mut finalizers = gateway.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(FINALIZER_SOURCE.to_string());
    patch_gateway_finalizers(ctx, gateway, namespace, finalizers).await
}

async fn remove_gateway_finalizer(
    ctx: &Arc<Context>,
    gateway: &DynamicObject,
    namespace: &str,
) -> Result<()> {
    let mut finalizers = gateway.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != FINALIZER_SOURCE);
    patch_gateway_finalizers(ctx, gateway, namespace, finalizers).await
}

async fn patch_gateway_finalizers(
    ctx: &Arc<Context>,
    gateway: &DynamicObject,
    namespace: &str,
    finalizers: Vec<String>,
) -> Result<()> {
    let api: Api<DynamicObject> =
        Api::namespaced_with(ctx.client.clone(), namespace, &gateway_api_resource());
    api.patch(
        &gateway.name_any(),
        &PatchParams::default(),
        &Patch::Merge(&json!({ "metadata": { "finalizers": finalizers } })),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod gateway_tests;
