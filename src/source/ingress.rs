// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress source: projects ingress hosts into entries.
//!
//! `dnsnames: "*"` derives the names from `spec.rules[].host`; targets come
//! from the ingress load-balancer status.

use crate::constants::{FINALIZER_SOURCE, REQUEUE_WHEN_READY_SECS};
use crate::context::{matches_class, Context};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::source::{
    ignore_from_annotation, names_from_annotation, owner_id, project_entries,
    routing_policy_from_annotation, ttl_from_annotation, SourceSpec,
};
use anyhow::Result;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info};

/// Hosts declared in the ingress rules.
fn rule_hosts(ingress: &Ingress) -> Vec<String> {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_ref())
        .map(|rules| rules.iter().filter_map(|rule| rule.host.clone()).collect())
        .unwrap_or_default()
}

/// Targets from the ingress load-balancer status.
fn status_targets(ingress: &Ingress) -> Vec<String> {
    let Some(lb_ingress) = ingress
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
    else {
        return Vec::new();
    };
    let ips: Vec<String> = lb_ingress.iter().filter_map(|i| i.ip.clone()).collect();
    if !ips.is_empty() {
        return ips;
    }
    lb_ingress
        .iter()
        .filter_map(|i| i.hostname.clone())
        .collect()
}

/// Reconcile one Ingress source object.
///
/// # Errors
///
/// Returns an error when API operations fail.
pub async fn reconcile_ingress(ctx: Arc<Context>, ingress: Ingress) -> Result<Action> {
    let namespace = ingress.namespace().unwrap_or_default();
    let name = ingress.name_any();

    if !matches_class(ingress.annotations(), &ctx.config.class) {
        return Ok(Action::await_change());
    }

    let owner = owner_id(
        &ctx.config.source_target_cluster_id,
        &ctx.config.source_cluster_id,
        "networking.k8s.io",
        "Ingress",
        &namespace,
        &name,
    );

    if ingress.metadata.deletion_timestamp.is_some() {
        if has_finalizer(&ingress, FINALIZER_SOURCE) {
            project_entries(&ctx, &owner, &namespace, &name, &SourceSpec::default()).await?;
            remove_finalizer(&ctx.client, &ingress, FINALIZER_SOURCE).await?;
        }
        return Ok(Action::await_change());
    }

    let hosts = rule_hosts(&ingress);
    let names = names_from_annotation(ingress.annotations(), &hosts);
    if names.is_empty() {
        if has_finalizer(&ingress, FINALIZER_SOURCE) {
            project_entries(&ctx, &owner, &namespace, &name, &SourceSpec::default()).await?;
            remove_finalizer(&ctx.client, &ingress, FINALIZER_SOURCE).await?;
        }
        return Ok(Action::await_change());
    }

    let targets = status_targets(&ingress);
    if targets.is_empty() {
        debug!(ingress = %format!("{namespace}/{name}"), "ingress load balancer not provisioned yet");
        return Ok(Action::requeue(Duration::from_secs(30)));
    }

    ensure_finalizer(&ctx.client, &ingress, FINALIZER_SOURCE).await?;

    let spec = SourceSpec {
        names,
        targets,
        text: Vec::new(),
        ttl: ttl_from_annotation(ingress.annotations()),
        routing_policy: routing_policy_from_annotation(ingress.annotations()),
        ignore: ignore_from_annotation(ingress.annotations()),
    };
    info!(ingress = %format!("{namespace}/{name}"), names = spec.names.len(), "projecting ingress");
    project_entries(&ctx, &owner, &namespace, &name, &spec).await?;

    Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)))
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;
