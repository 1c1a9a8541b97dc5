// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNSAnnotation reconciliation.
//!
//! A `DNSAnnotation` attaches source-controller annotations to a referenced
//! foreign object without editing it directly. The target is addressed
//! dynamically so any kind can be decorated. On deletion the injected
//! annotation keys are removed again, which is why the object carries a
//! finalizer while active.

use crate::constants::{ERROR_REQUEUE_DURATION_SECS, FINALIZER_ANNOTATION, REQUEUE_WHEN_READY_SECS};
use crate::context::Context;
use crate::crd::{DNSAnnotation, DNSAnnotationStatus, ResourceReference};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use anyhow::Result;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde_json::json;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

/// Reconcile one `DNSAnnotation`.
///
/// # Errors
///
/// Returns an error for unexpected API failures.
pub async fn reconcile_annotation(ctx: Arc<Context>, annotation: DNSAnnotation) -> Result<Action> {
    let namespace = annotation.namespace().unwrap_or_default();
    let name = annotation.name_any();

    if annotation.metadata.deletion_timestamp.is_some() {
        return delete_annotation(&ctx, &annotation).await;
    }

    info!(annotation = %format!("{namespace}/{name}"), "reconciling DNSAnnotation");
    ensure_finalizer(&ctx.client, &annotation, FINALIZER_ANNOTATION).await?;

    let target = target_api(&ctx, &annotation.spec.resource_ref, &namespace);
    let patch: serde_json::Map<String, serde_json::Value> = annotation
        .spec
        .annotations
        .iter()
        .map(|(key, value)| (key.clone(), json!(value)))
        .collect();

    let result = target
        .patch(
            &annotation.spec.resource_ref.name,
            &PatchParams::default(),
            &Patch::Merge(&json!({ "metadata": { "annotations": patch } })),
        )
        .await;

    let (active, message, requeue) = match result {
        Ok(_) => (true, "annotations applied".to_string(), REQUEUE_WHEN_READY_SECS),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            let reference = &annotation.spec.resource_ref;
            (
                false,
                format!("{} {} not found", reference.kind, reference.name),
                ERROR_REQUEUE_DURATION_SECS,
            )
        }
        Err(e) => return Err(e.into()),
    };
    if !active {
        warn!(annotation = %format!("{namespace}/{name}"), message = %message, "annotation target missing");
    }

    let status = DNSAnnotationStatus {
        observed_generation: annotation.metadata.generation,
        active: Some(active),
        message: Some(message),
    };
    let current = annotation.status.clone().unwrap_or_default();
    if current.active != status.active
        || current.message != status.message
        || current.observed_generation != status.observed_generation
    {
        let api: Api<DNSAnnotation> = Api::namespaced(ctx.client.clone(), &namespace);
        api.patch_status(
            &name,
            &PatchParams::default(),
            &Patch::Merge(&json!({ "status": status })),
        )
        .await?;
    }

    Ok(Action::requeue(Duration::from_secs(requeue)))
}

/// Strip the injected annotation keys from the target, then release.
async fn delete_annotation(ctx: &Arc<Context>, annotation: &DNSAnnotation) -> Result<Action> {
    if !has_finalizer(annotation, FINALIZER_ANNOTATION) {
        return Ok(Action::await_change());
    }
    let namespace = annotation.namespace().unwrap_or_default();

    let target = target_api(ctx, &annotation.spec.resource_ref, &namespace);
    let removals: serde_json::Map<String, serde_json::Value> = annotation
        .spec
        .annotations
        .keys()
        .map(|key| (key.clone(), serde_json::Value::Null))
        .collect();
    let result = target
        .patch(
            &annotation.spec.resource_ref.name,
            &PatchParams::default(),
            &Patch::Merge(&json!({ "metadata": { "annotations": removals } })),
        )
        .await;
    match result {
        Ok(_) => {}
        Err(kube::Error::Api(e)) if e.code == 404 => {}
        Err(e) => return Err(e.into()),
    }

    remove_finalizer(&ctx.client, annotation, FINALIZER_ANNOTATION).await?;
    Ok(Action::await_change())
}

fn target_api(
    ctx: &Arc<Context>,
    reference: &ResourceReference,
    default_namespace: &str,
) -> Api<DynamicObject> {
    let (group, version) = reference
        .api_version
        .split_once('/')
        .unwrap_or(("", reference.api_version.as_str()));
    let gvk = GroupVersionKind::gvk(group, version, &reference.kind);
    let resource = ApiResource::from_gvk(&gvk);
    let namespace = reference
        .namespace
        .clone()
        .unwrap_or_else(|| default_namespace.to_string());
    Api::namespaced_with(ctx.client.clone(), &namespace, &resource)
}
