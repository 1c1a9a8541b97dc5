// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Source translation: projecting foreign objects into managed entries.
//!
//! Each watched foreign kind (Service, Ingress, Gateway, mirrored DNSEntry)
//! is translated into a set of owned `DNSEntry` objects on the target
//! cluster. Ownership is encoded in the owners annotation
//! `[targetClusterID:]clusterID:group/Kind/namespace/name`; the projector
//! creates, updates and deletes entries so the projected set exactly matches
//! the set derived from the source object.

pub mod entries;
pub mod gateway;
pub mod ingress;
pub mod replication;
pub mod service;

use crate::constants::{
    ANNOTATION_CLASS, ANNOTATION_DNSNAMES, ANNOTATION_IGNORE, ANNOTATION_OWNERS,
    ANNOTATION_ROUTING_POLICY, ANNOTATION_TTL,
};
use crate::context::Context;
use crate::crd::{DNSEntry, DNSEntrySpec};
use crate::dns::RoutingPolicy;
use anyhow::Result;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// DNS intent extracted from one source object.
#[derive(Clone, Debug, Default)]
pub struct SourceSpec {
    /// Desired DNS names
    pub names: Vec<String>,

    /// Desired targets (addresses or hostnames)
    pub targets: Vec<String>,

    /// Desired TXT payloads (mirrored entries only)
    pub text: Vec<String>,

    /// Optional TTL
    pub ttl: Option<i64>,

    /// Optional routing policy
    pub routing_policy: Option<RoutingPolicy>,

    /// Ignore semantics carried over to the projected entries
    pub ignore: Option<String>,
}

/// Compose the owner id of a source object.
#[must_use]
pub fn owner_id(
    target_cluster_id: &str,
    source_cluster_id: &str,
    group: &str,
    kind: &str,
    namespace: &str,
    name: &str,
) -> String {
    let base = format!("{source_cluster_id}:{group}/{kind}/{namespace}/{name}");
    if target_cluster_id.is_empty() {
        base
    } else {
        format!("{target_cluster_id}:{base}")
    }
}

/// Read the DNS names annotation; `*` derives the names from the object's
/// own host fields (`derived`).
#[must_use]
pub fn names_from_annotation(
    annotations: &BTreeMap<String, String>,
    derived: &[String],
) -> Vec<String> {
    let Some(raw) = annotations.get(ANNOTATION_DNSNAMES) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part == "*" {
            names.extend(derived.iter().cloned());
        } else {
            names.push(part.to_string());
        }
    }
    names.dedup();
    names
}

/// Read the optional TTL annotation.
#[must_use]
pub fn ttl_from_annotation(annotations: &BTreeMap<String, String>) -> Option<i64> {
    annotations
        .get(ANNOTATION_TTL)
        .and_then(|raw| raw.parse().ok())
}

/// Read the optional routing-policy annotation (JSON).
#[must_use]
pub fn routing_policy_from_annotation(
    annotations: &BTreeMap<String, String>,
) -> Option<RoutingPolicy> {
    annotations
        .get(ANNOTATION_ROUTING_POLICY)
        .and_then(|raw| serde_json::from_str(raw).ok())
}

/// Read the ignore annotation.
#[must_use]
pub fn ignore_from_annotation(annotations: &BTreeMap<String, String>) -> Option<String> {
    annotations.get(ANNOTATION_IGNORE).cloned()
}

/// Deterministic name for a projected entry.
fn projected_entry_name(prefix: &str, source_name: &str, dns_name: &str) -> String {
    let digest = Sha256::digest(dns_name.as_bytes());
    let mut hash = String::with_capacity(8);
    for byte in &digest[..4] {
        hash.push_str(&format!("{byte:02x}"));
    }
    format!("{prefix}{source_name}-{hash}")
}

/// Reconcile the projected entries of one source object.
///
/// Creates, updates and deletes owned entries on the target cluster so that
/// exactly one entry exists per desired DNS name. An empty [`SourceSpec`]
/// deletes everything the owner still holds (source-object teardown).
///
/// # Errors
///
/// Returns an error when target-cluster API operations fail.
pub async fn project_entries(
    ctx: &Arc<Context>,
    owner: &str,
    source_namespace: &str,
    source_name: &str,
    spec: &SourceSpec,
) -> Result<()> {
    let target_namespace = if ctx.config.source_target_namespace.is_empty() {
        source_namespace.to_string()
    } else {
        ctx.config.source_target_namespace.clone()
    };
    let api: Api<DNSEntry> = Api::namespaced(ctx.target_client.clone(), &target_namespace);

    // Current owned set.
    let existing: Vec<DNSEntry> = api
        .list(&ListParams::default())
        .await?
        .items
        .into_iter()
        .filter(|entry| {
            entry.annotations().get(ANNOTATION_OWNERS).map(String::as_str) == Some(owner)
        })
        .collect();

    for dns_name in &spec.names {
        let desired_spec = DNSEntrySpec {
            dns_name: dns_name.clone(),
            targets: (!spec.targets.is_empty()).then(|| spec.targets.clone()),
            text: (!spec.text.is_empty()).then(|| spec.text.clone()),
            ttl: spec.ttl,
            cname_lookup_interval: None,
            resolve_targets_to_addresses: None,
            routing_policy: spec.routing_policy.clone(),
            reference: None,
        };

        match existing.iter().find(|entry| entry.spec.dns_name == *dns_name) {
            Some(current) => {
                let spec_value = serde_json::to_value(&desired_spec)?;
                if serde_json::to_value(&current.spec)? != spec_value {
                    info!(owner = %owner, dns_name = %dns_name, "updating projected entry");
                    api.patch(
                        &current.name_any(),
                        &PatchParams::default(),
                        &Patch::Merge(&serde_json::json!({ "spec": spec_value })),
                    )
                    .await?;
                }
            }
            None => {
                let name = projected_entry_name(
                    &ctx.config.source_target_name_prefix,
                    source_name,
                    dns_name,
                );
                info!(owner = %owner, dns_name = %dns_name, entry = %name, "creating projected entry");
                let entry = DNSEntry {
                    metadata: ObjectMeta {
                        name: Some(name),
                        namespace: Some(target_namespace.clone()),
                        annotations: Some(projected_annotations(ctx, owner, spec.ignore.as_deref())),
                        labels: projected_labels(ctx),
                        ..Default::default()
                    },
                    spec: desired_spec,
                    status: None,
                };
                api.create(&PostParams::default(), &entry).await?;
            }
        }
    }

    // Remove owned entries whose DNS name is no longer derived.
    for entry in &existing {
        if !spec.names.iter().any(|name| *name == entry.spec.dns_name) {
            info!(owner = %owner, entry = %entry.name_any(), "deleting projected entry");
            match api
                .delete(&entry.name_any(), &kube::api::DeleteParams::default())
                .await
            {
                Ok(_) => {}
                Err(kube::Error::Api(e)) if e.code == 404 => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    debug!(owner = %owner, desired = spec.names.len(), "projection reconciled");
    Ok(())
}

fn projected_annotations(
    ctx: &Arc<Context>,
    owner: &str,
    ignore: Option<&str>,
) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::from([(ANNOTATION_OWNERS.to_string(), owner.to_string())]);
    if !ctx.config.source_target_class.is_empty() {
        annotations.insert(
            ANNOTATION_CLASS.to_string(),
            ctx.config.source_target_class.clone(),
        );
    }
    if let Some(ignore) = ignore {
        annotations.insert(ANNOTATION_IGNORE.to_string(), ignore.to_string());
    }
    annotations
}

fn projected_labels(ctx: &Arc<Context>) -> Option<BTreeMap<String, String>> {
    let labels: BTreeMap<String, String> = ctx.config.target_labels().into_iter().collect();
    (!labels.is_empty()).then_some(labels)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
