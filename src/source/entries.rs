// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Foreign-cluster DNSEntry mirror.
//!
//! When a target kubeconfig is configured, entries declared on the source
//! cluster are mirrored as owned entries onto the target cluster. The
//! mirrored copies carry the owners annotation and the configured target
//! class, so the target cluster's controller (a different class instance)
//! reconciles them while this instance leaves them alone.

use crate::constants::{FINALIZER_SOURCE, REQUEUE_WHEN_READY_SECS};
use crate::context::{matches_class, Context};
use crate::crd::DNSEntry;
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::source::{owner_id, project_entries, SourceSpec};
use anyhow::Result;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::info;

/// Whether mirroring is active for this process.
#[must_use]
pub fn mirroring_enabled(ctx: &Arc<Context>) -> bool {
    !ctx.config.target_kubeconfig.is_empty()
}

/// Reconcile one source-cluster entry into its mirrored counterpart.
///
/// # Errors
///
/// Returns an error when API operations fail.
pub async fn reconcile_source_entry(ctx: Arc<Context>, entry: DNSEntry) -> Result<Action> {
    if !mirroring_enabled(&ctx) {
        return Ok(Action::await_change());
    }
    if !matches_class(entry.annotations(), &ctx.config.class) {
        return Ok(Action::await_change());
    }

    let namespace = entry.namespace().unwrap_or_default();
    let name = entry.name_any();
    let owner = owner_id(
        &ctx.config.source_target_cluster_id,
        &ctx.config.source_cluster_id,
        "dns.gardener.cloud",
        "DNSEntry",
        &namespace,
        &name,
    );

    if entry.metadata.deletion_timestamp.is_some() {
        if has_finalizer(&entry, FINALIZER_SOURCE) {
            project_entries(&ctx, &owner, &namespace, &name, &SourceSpec::default()).await?;
            remove_finalizer(&ctx.client, &entry, FINALIZER_SOURCE).await?;
        }
        return Ok(Action::await_change());
    }

    ensure_finalizer(&ctx.client, &entry, FINALIZER_SOURCE).await?;

    let spec = SourceSpec {
        names: vec![entry.spec.dns_name.clone()],
        targets: entry.spec.targets.clone().unwrap_or_default(),
        text: entry.spec.text.clone().unwrap_or_default(),
        ttl: entry.spec.ttl,
        routing_policy: entry.spec.routing_policy.clone(),
        ignore: None,
    };
    info!(entry = %format!("{namespace}/{name}"), "mirroring entry to target cluster");
    project_entries(&ctx, &owner, &namespace, &name, &spec).await?;

    Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)))
}
