// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNSProvider replication across clusters.
//!
//! A variant of the source translator that projects providers (and their
//! credential secrets) onto the target cluster. An existing target provider
//! of matching type is adopted and updated in place; a type mismatch
//! replaces it. When credential validation fails during replication, the
//! provider is still projected without secret data, and the validation
//! message is pushed back into the source provider's status.

use crate::constants::{ANNOTATION_OWNERS, ERROR_REQUEUE_DURATION_SECS, REQUEUE_WHEN_READY_SECS};
use crate::context::{matches_class, Context};
use crate::crd::{object_key, DNSProvider, SecretReference};
use crate::provider::SecretData;
use crate::source::entries::mirroring_enabled;
use crate::source::owner_id;
use anyhow::Result;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

/// Reconcile one source-cluster provider into its replicated counterpart.
///
/// # Errors
///
/// Returns an error when API operations fail.
#[allow(clippy::too_many_lines)]
pub async fn replicate_provider(ctx: Arc<Context>, provider: DNSProvider) -> Result<Action> {
    if !mirroring_enabled(&ctx) {
        return Ok(Action::await_change());
    }
    if !matches_class(provider.annotations(), &ctx.config.class) {
        return Ok(Action::await_change());
    }

    let namespace = provider.namespace().unwrap_or_default();
    let name = provider.name_any();
    let provider_key = object_key(&namespace, &name);
    let owner = owner_id(
        &ctx.config.source_target_cluster_id,
        &ctx.config.source_cluster_id,
        "dns.gardener.cloud",
        "DNSProvider",
        &namespace,
        &name,
    );
    let target_namespace = if ctx.config.source_target_namespace.is_empty() {
        namespace.clone()
    } else {
        ctx.config.source_target_namespace.clone()
    };
    let target_providers: Api<DNSProvider> =
        Api::namespaced(ctx.target_client.clone(), &target_namespace);

    if provider.metadata.deletion_timestamp.is_some() {
        for replica in owned_replicas(&target_providers, &owner).await? {
            match target_providers
                .delete(&replica.name_any(), &DeleteParams::default())
                .await
            {
                Ok(_) => {}
                Err(kube::Error::Api(e)) if e.code == 404 => {}
                Err(e) => return Err(e.into()),
            }
        }
        return Ok(Action::await_change());
    }

    // Load and validate the credentials before carrying them across.
    let (secret_data, validation_error) = match load_secret(&ctx, &provider).await? {
        Some(data) => match ctx.registry.lookup(&provider.spec.r#type) {
            Ok(factory) => {
                let config = provider
                    .spec
                    .provider_config
                    .clone()
                    .unwrap_or(serde_json::Value::Null);
                match factory.validate_credentials(&data, &config) {
                    Ok(()) => (Some(data), None),
                    Err(e) => (None, Some(e.to_string())),
                }
            }
            Err(_) => (Some(data), None),
        },
        None => (None, None),
    };

    // Replicate the secret when it validated.
    let replica_secret_name = format!("{}-credentials", name);
    if let Some(data) = &secret_data {
        replicate_secret(&ctx, &target_namespace, &replica_secret_name, &owner, data).await?;
    }

    let mut replica_spec = provider.spec.clone();
    replica_spec.secret_ref = secret_data.is_some().then(|| SecretReference {
        name: replica_secret_name.clone(),
        namespace: None,
    });

    // Adopt a matching-type replica; replace a mismatched one.
    let replicas = owned_replicas(&target_providers, &owner).await?;
    let adoptable = replicas
        .iter()
        .find(|replica| replica.spec.r#type == provider.spec.r#type);
    match adoptable {
        Some(replica) => {
            info!(provider = %provider_key, replica = %replica.name_any(), "adopting replicated provider");
            target_providers
                .patch(
                    &replica.name_any(),
                    &PatchParams::default(),
                    &Patch::Merge(&json!({ "spec": replica_spec })),
                )
                .await?;
        }
        None => {
            for stale in &replicas {
                info!(provider = %provider_key, replica = %stale.name_any(), "replacing replicated provider");
                match target_providers
                    .delete(&stale.name_any(), &DeleteParams::default())
                    .await
                {
                    Ok(_) => {}
                    Err(kube::Error::Api(e)) if e.code == 404 => {}
                    Err(e) => return Err(e.into()),
                }
            }
            let replica = DNSProvider {
                metadata: ObjectMeta {
                    name: Some(format!(
                        "{}{name}",
                        ctx.config.source_target_name_prefix
                    )),
                    namespace: Some(target_namespace.clone()),
                    annotations: Some(BTreeMap::from([(
                        ANNOTATION_OWNERS.to_string(),
                        owner.clone(),
                    )])),
                    ..Default::default()
                },
                spec: replica_spec,
                status: None,
            };
            target_providers.create(&PostParams::default(), &replica).await?;
        }
    }

    // Push a validation failure back to the source object.
    if let Some(message) = validation_error {
        warn!(provider = %provider_key, message = %message, "replicated without secret data");
        let source_api: Api<DNSProvider> = Api::namespaced(ctx.client.clone(), &namespace);
        source_api
            .patch_status(
                &name,
                &PatchParams::default(),
                &Patch::Merge(&json!({ "status": { "message": message } })),
            )
            .await?;
        return Ok(Action::requeue(Duration::from_secs(
            ERROR_REQUEUE_DURATION_SECS,
        )));
    }

    Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)))
}

async fn owned_replicas(api: &Api<DNSProvider>, owner: &str) -> Result<Vec<DNSProvider>> {
    Ok(api
        .list(&ListParams::default())
        .await?
        .items
        .into_iter()
        .filter(|provider| {
            provider.annotations().get(ANNOTATION_OWNERS).map(String::as_str) == Some(owner)
        })
        .collect())
}

async fn load_secret(ctx: &Arc<Context>, provider: &DNSProvider) -> Result<Option<SecretData>> {
    let Some(secret_ref) = &provider.spec.secret_ref else {
        return Ok(None);
    };
    let namespace = secret_ref
        .namespace
        .clone()
        .or_else(|| provider.namespace())
        .unwrap_or_default();
    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
    match api.get(&secret_ref.name).await {
        Ok(secret) => {
            let mut data = SecretData::new();
            if let Some(map) = secret.data {
                for (key, value) in map {
                    data.insert(key, value.0);
                }
            }
            Ok(Some(data))
        }
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn replicate_secret(
    ctx: &Arc<Context>,
    namespace: &str,
    name: &str,
    owner: &str,
    data: &SecretData,
) -> Result<()> {
    let api: Api<Secret> = Api::namespaced(ctx.target_client.clone(), namespace);
    let encoded: BTreeMap<String, k8s_openapi::ByteString> = data
        .iter()
        .map(|(key, value)| (key.clone(), k8s_openapi::ByteString(value.clone())))
        .collect();
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([(
                ANNOTATION_OWNERS.to_string(),
                owner.to_string(),
            )])),
            ..Default::default()
        },
        data: Some(encoded),
        ..Default::default()
    };
    match api.create(&PostParams::default(), &secret).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 409 => {
            api.patch(
                name,
                &PatchParams::default(),
                &Patch::Merge(&serde_json::to_value(&secret)?),
            )
            .await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
