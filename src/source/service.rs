// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service source: projects load-balancer services into entries.
//!
//! A Service requests DNS names through the dnsnames annotation (there are
//! no host fields to derive from). Targets come from the load balancer
//! ingress status, preferring IP addresses over hostnames.

use crate::constants::{FINALIZER_SOURCE, REQUEUE_WHEN_READY_SECS};
use crate::context::{matches_class, Context};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::source::{
    ignore_from_annotation, names_from_annotation, owner_id, project_entries,
    routing_policy_from_annotation, ttl_from_annotation, SourceSpec,
};
use anyhow::Result;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info};

/// Targets from a load balancer ingress list: IPs, falling back to
/// hostnames when the backend only exposes names.
fn load_balancer_targets(
    ingress: &[k8s_openapi::api::core::v1::LoadBalancerIngress],
) -> Vec<String> {
    let ips: Vec<String> = ingress.iter().filter_map(|i| i.ip.clone()).collect();
    if !ips.is_empty() {
        return ips;
    }
    ingress.iter().filter_map(|i| i.hostname.clone()).collect()
}

/// Reconcile one Service source object.
///
/// # Errors
///
/// Returns an error when API operations fail.
pub async fn reconcile_service(ctx: Arc<Context>, service: Service) -> Result<Action> {
    let namespace = service.namespace().unwrap_or_default();
    let name = service.name_any();

    if !matches_class(service.annotations(), &ctx.config.class) {
        return Ok(Action::await_change());
    }

    let owner = owner_id(
        &ctx.config.source_target_cluster_id,
        &ctx.config.source_cluster_id,
        "",
        "Service",
        &namespace,
        &name,
    );

    if service.metadata.deletion_timestamp.is_some() {
        if has_finalizer(&service, FINALIZER_SOURCE) {
            project_entries(&ctx, &owner, &namespace, &name, &SourceSpec::default()).await?;
            remove_finalizer(&ctx.client, &service, FINALIZER_SOURCE).await?;
        }
        return Ok(Action::await_change());
    }

    let names = names_from_annotation(service.annotations(), &[]);
    if names.is_empty() {
        // No DNS intent; clean up anything projected earlier.
        if has_finalizer(&service, FINALIZER_SOURCE) {
            project_entries(&ctx, &owner, &namespace, &name, &SourceSpec::default()).await?;
            remove_finalizer(&ctx.client, &service, FINALIZER_SOURCE).await?;
        }
        return Ok(Action::await_change());
    }

    let targets = service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .map(|ingress| load_balancer_targets(ingress))
        .unwrap_or_default();
    if targets.is_empty() {
        debug!(service = %format!("{namespace}/{name}"), "load balancer not provisioned yet");
        return Ok(Action::requeue(Duration::from_secs(30)));
    }

    ensure_finalizer(&ctx.client, &service, FINALIZER_SOURCE).await?;

    let spec = SourceSpec {
        names,
        targets,
        text: Vec::new(),
        ttl: ttl_from_annotation(service.annotations()),
        routing_policy: routing_policy_from_annotation(service.annotations()),
        ignore: ignore_from_annotation(service.annotations()),
    };
    info!(service = %format!("{namespace}/{name}"), names = spec.names.len(), "projecting service");
    project_entries(&ctx, &owner, &namespace, &name, &spec).await?;

    Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)))
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
