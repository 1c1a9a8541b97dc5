// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use dnsman::{
    config::Config,
    constants::{
        ERROR_REQUEUE_DURATION_SECS, KIND_DNS_ANNOTATION, KIND_DNS_ENTRY,
        KIND_DNS_HOSTED_ZONE_POLICY, KIND_DNS_PROVIDER, METRICS_SERVER_BIND_ADDRESS,
        METRICS_SERVER_PATH, METRICS_SERVER_PORT, RECONCILE_SOFT_DEADLINE_SECS,
        TOKIO_WORKER_THREADS,
    },
    context::{Context, Stores},
    crd::{DNSAnnotation, DNSEntry, DNSHostedZonePolicy, DNSProvider},
    events, metrics,
    planner::{DispatchConfig, Dispatcher},
    provider::{mock::InMemoryFactory, HandlerRegistry},
    reconcilers::{
        annotation::reconcile_annotation, entry::reconcile_entry, policy::reconcile_policy,
        provider::reconcile_provider,
    },
    resolve::SystemLookup,
    source::{
        entries::{mirroring_enabled, reconcile_source_entry},
        gateway::{gateway_api_resource, reconcile_gateway},
        ingress::reconcile_ingress,
        replication::replicate_provider,
        service::reconcile_service,
    },
};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    api::DynamicObject,
    runtime::{
        controller::Action, reflector, reflector::ObjectRef, watcher,
        watcher::Config as WatcherConfig, Controller,
    },
    Api, Client, Resource, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("dnsman-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging with custom format.
///
/// Respects `RUST_LOG` if set, otherwise defaults to INFO level. Respects
/// `RUST_LOG_FORMAT` for output format (json or text).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting dnsman operator");
}

/// Build the handler registry with every compiled-in provider type.
fn build_registry(config: &Config) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(InMemoryFactory::new()));
    registry.set_enabled_types(config.enabled_types());
    registry.set_disabled_types(config.disabled_types());
    info!(types = ?registry.registered_types(), "handler registry initialized");
    registry
}

/// Initialize reflectors for the dnsman CRDs and assemble the context.
async fn initialize_shared_context(
    client: Client,
    target_client: Client,
    config: Config,
    shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<Arc<Context>> {
    info!("Initializing reflectors for all CRD types");

    let entries_api = Api::<DNSEntry>::all(client.clone());
    let providers_api = Api::<DNSProvider>::all(client.clone());
    let policies_api = Api::<DNSHostedZonePolicy>::all(client.clone());

    let (entries_store, entries_writer) = reflector::store();
    let (providers_store, providers_writer) = reflector::store();
    let (policies_store, policies_writer) = reflector::store();

    tokio::spawn(async move {
        let stream = watcher(entries_api, WatcherConfig::default());
        reflector(entries_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("DNSEntry reflector stream ended");
    });

    tokio::spawn(async move {
        let stream = watcher(providers_api, WatcherConfig::default());
        reflector(providers_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("DNSProvider reflector stream ended");
    });

    tokio::spawn(async move {
        let stream = watcher(policies_api, WatcherConfig::default());
        reflector(policies_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("DNSHostedZonePolicy reflector stream ended");
    });

    let stores = Stores {
        entries: entries_store,
        providers: providers_store,
        policies: policies_store,
    };

    let registry = build_registry(&config);
    let dispatcher = Dispatcher::new(
        DispatchConfig {
            batch_window: Duration::from_millis(config.batch_window_millis),
            ..DispatchConfig::default()
        },
        shutdown,
    );
    let recorder = events::recorder(client.clone());
    let lookup = Arc::new(SystemLookup::from_system_conf()?);

    let context = Arc::new(Context::new(
        client,
        target_client,
        stores,
        registry,
        dispatcher,
        recorder,
        config,
        lookup,
    ));
    info!("Shared context initialized");
    Ok(context)
}

/// Start the Prometheus metrics HTTP server.
fn start_metrics_server() -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = METRICS_SERVER_BIND_ADDRESS,
        port = METRICS_SERVER_PORT,
        path = METRICS_SERVER_PATH,
        "Starting Prometheus metrics HTTP server"
    );

    tokio::spawn(async move {
        async fn metrics_handler() -> String {
            match metrics::gather_metrics() {
                Ok(metrics_text) => metrics_text,
                Err(e) => {
                    error!("Failed to gather metrics: {}", e);
                    String::from("# Error gathering metrics\n")
                }
            }
        }

        let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
        let bind_addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{METRICS_SERVER_PORT}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };
        info!("Metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {e}");
        }
    })
}

#[inline]
fn default_watcher_config() -> WatcherConfig {
    WatcherConfig::default()
}

#[inline]
fn semantic_watcher_config() -> WatcherConfig {
    WatcherConfig::default().any_semantic()
}

/// Reconcile once for every existing provider and entry on startup, so
/// drift that accumulated while the operator was down is corrected before
/// the controllers settle.
async fn perform_startup_resync(context: Arc<Context>) {
    info!("Starting resync for DNSProvider resources...");
    let providers_api: Api<DNSProvider> = Api::all(context.client.clone());
    match providers_api.list(&kube::api::ListParams::default()).await {
        Ok(providers) => {
            info!("Found {} DNSProvider resources", providers.items.len());
            for provider in providers.items {
                let name = provider.name_any();
                match Box::pin(reconcile_provider(context.clone(), provider)).await {
                    Ok(_) => debug!("DNSProvider {} resynced", name),
                    Err(e) => warn!("Failed to resync DNSProvider {}: {}", name, e),
                }
            }
        }
        Err(e) => warn!("Failed to list DNSProvider resources: {}", e),
    }

    info!("Starting resync for DNSEntry resources...");
    let entries_api: Api<DNSEntry> = Api::all(context.client.clone());
    match entries_api.list(&kube::api::ListParams::default()).await {
        Ok(entries) => {
            info!("Found {} DNSEntry resources", entries.items.len());
            for entry in entries.items {
                let name = entry.name_any();
                match Box::pin(reconcile_entry(context.clone(), entry)).await {
                    Ok(_) => debug!("DNSEntry {} resynced", name),
                    Err(e) => warn!("Failed to resync DNSEntry {}: {}", name, e),
                }
            }
        }
        Err(e) => warn!("Failed to list DNSEntry resources: {}", e),
    }

    info!("Startup resync completed");
}

fn error_policy<K>(_object: Arc<K>, error: &ReconcileError, _ctx: Arc<Context>) -> Action
where
    K: Resource,
{
    warn!(error = %error, "reconcile failed, requeueing with backoff");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Wrap a reconciler with metrics and the soft deadline.
async fn instrumented<F>(kind: &'static str, fut: F) -> Result<Action, ReconcileError>
where
    F: std::future::Future<Output = Result<Action>>,
{
    let start = std::time::Instant::now();
    let deadline = Duration::from_secs(RECONCILE_SOFT_DEADLINE_SECS);
    let result = tokio::time::timeout(deadline, fut).await;
    let duration = start.elapsed();
    match result {
        Ok(Ok(action)) => {
            metrics::record_reconciliation_success(kind, duration);
            Ok(action)
        }
        Ok(Err(e)) => {
            metrics::record_reconciliation_error(kind, duration);
            Err(e.into())
        }
        Err(_) => {
            // Soft deadline exceeded: requeue, this is not a permanent error.
            warn!(kind = kind, "reconcile exceeded soft deadline, requeueing");
            metrics::record_reconciliation_error(kind, duration);
            Ok(Action::requeue(Duration::from_secs(
                ERROR_REQUEUE_DURATION_SECS,
            )))
        }
    }
}

/// Run the `DNSProvider` operator.
///
/// Secret changes enqueue referencing providers; entry changes enqueue the
/// assigned provider so blocked deletions make progress.
async fn run_provider_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting DNSProvider operator");

    let client = context.client.clone();
    let api = Api::<DNSProvider>::all(client.clone());
    let secrets_api = Api::<Secret>::all(client.clone());
    let entries_api = Api::<DNSEntry>::all(client.clone());

    let stores_for_secrets = context.stores.clone();

    Controller::new(api, default_watcher_config())
        .watches(secrets_api, default_watcher_config(), move |secret| {
            let namespace = secret.namespace().unwrap_or_default();
            let name = secret.name_any();
            stores_for_secrets
                .providers_referencing_secret(&namespace, &name)
                .into_iter()
                .map(|provider| {
                    ObjectRef::new(&provider.name_any())
                        .within(&provider.namespace().unwrap_or_default())
                })
                .collect::<Vec<_>>()
        })
        .watches(entries_api, default_watcher_config(), move |entry| {
            entry
                .status
                .as_ref()
                .and_then(|status| status.provider.as_ref())
                .and_then(|provider| provider.split_once('/'))
                .map(|(namespace, name)| ObjectRef::new(name).within(namespace))
                .into_iter()
                .collect::<Vec<_>>()
        })
        .run(
            |provider, ctx| async move {
                instrumented(
                    KIND_DNS_PROVIDER,
                    reconcile_provider(ctx, (*provider).clone()),
                )
                .await
            },
            error_policy,
            context,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `DNSEntry` operator.
///
/// Provider changes enqueue every entry: a provider becoming ready, changing
/// its selection or going away can re-match any entry.
async fn run_entry_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting DNSEntry operator");

    let client = context.client.clone();
    let api = Api::<DNSEntry>::all(client.clone());
    let providers_api = Api::<DNSProvider>::all(client.clone());

    let stores_for_providers = context.stores.clone();

    Controller::new(api, default_watcher_config())
        .watches(providers_api, default_watcher_config(), move |_provider| {
            stores_for_providers
                .entries
                .state()
                .into_iter()
                .map(|entry| {
                    ObjectRef::new(&entry.name_any())
                        .within(&entry.namespace().unwrap_or_default())
                })
                .collect::<Vec<_>>()
        })
        .run(
            |entry, ctx| async move {
                instrumented(KIND_DNS_ENTRY, reconcile_entry(ctx, (*entry).clone())).await
            },
            error_policy,
            context,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `DNSHostedZonePolicy` operator.
async fn run_policy_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting DNSHostedZonePolicy operator");

    let api = Api::<DNSHostedZonePolicy>::all(context.client.clone());
    Controller::new(api, semantic_watcher_config())
        .run(
            |policy, ctx| async move {
                instrumented(
                    KIND_DNS_HOSTED_ZONE_POLICY,
                    reconcile_policy(ctx, (*policy).clone()),
                )
                .await
            },
            error_policy,
            context,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `DNSAnnotation` operator.
async fn run_annotation_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting DNSAnnotation operator");

    let api = Api::<DNSAnnotation>::all(context.client.clone());
    Controller::new(api, semantic_watcher_config())
        .run(
            |annotation, ctx| async move {
                instrumented(
                    KIND_DNS_ANNOTATION,
                    reconcile_annotation(ctx, (*annotation).clone()),
                )
                .await
            },
            error_policy,
            context,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the Service source operator.
async fn run_service_source_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting Service source operator");

    let api = Api::<Service>::all(context.client.clone());
    Controller::new(api, default_watcher_config())
        .run(
            |service, ctx| async move {
                instrumented("Service", reconcile_service(ctx, (*service).clone())).await
            },
            error_policy,
            context,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the Ingress source operator.
async fn run_ingress_source_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting Ingress source operator");

    let api = Api::<Ingress>::all(context.client.clone());
    Controller::new(api, default_watcher_config())
        .run(
            |ingress, ctx| async move {
                instrumented("Ingress", reconcile_ingress(ctx, (*ingress).clone())).await
            },
            error_policy,
            context,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the Gateway source operator (requires the Gateway API CRDs).
async fn run_gateway_source_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting Gateway source operator");

    let resource = gateway_api_resource();
    let api = Api::<DynamicObject>::all_with(context.client.clone(), &resource);
    Controller::new_with(api, default_watcher_config(), resource)
        .run(
            |gateway, ctx| async move {
                instrumented("Gateway", reconcile_gateway(ctx, (*gateway).clone())).await
            },
            error_policy,
            context,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the cross-cluster mirror operators (entries + provider replication).
async fn run_mirror_operators(context: Arc<Context>) -> Result<()> {
    info!("Starting cross-cluster mirror operators");

    let entries_api = Api::<DNSEntry>::all(context.client.clone());
    let providers_api = Api::<DNSProvider>::all(context.client.clone());

    let entry_mirror = Controller::new(entries_api, default_watcher_config())
        .run(
            |entry, ctx| async move {
                instrumented(
                    "DNSEntryMirror",
                    reconcile_source_entry(ctx, (*entry).clone()),
                )
                .await
            },
            error_policy,
            context.clone(),
        )
        .for_each(|_| futures::future::ready(()));

    let provider_replication = Controller::new(providers_api, default_watcher_config())
        .run(
            |provider, ctx| async move {
                instrumented(
                    "DNSProviderReplication",
                    replicate_provider(ctx, (*provider).clone()),
                )
                .await
            },
            error_policy,
            context,
        )
        .for_each(|_| futures::future::ready(()));

    tokio::join!(entry_mirror, provider_replication);
    Ok(())
}

/// Run every operator concurrently; none of them is expected to return.
async fn run_all_operators(context: Arc<Context>) -> Result<()> {
    let mut tasks: Vec<tokio::task::JoinHandle<Result<()>>> = vec![
        tokio::spawn(run_provider_operator(context.clone())),
        tokio::spawn(run_entry_operator(context.clone())),
        tokio::spawn(run_policy_operator(context.clone())),
        tokio::spawn(run_annotation_operator(context.clone())),
        tokio::spawn(run_service_source_operator(context.clone())),
        tokio::spawn(run_ingress_source_operator(context.clone())),
    ];
    if context.config.gateway_source_enabled {
        tasks.push(tokio::spawn(run_gateway_source_operator(context.clone())));
    }
    if mirroring_enabled(&context) {
        tasks.push(tokio::spawn(run_mirror_operators(context.clone())));
    }

    for task in tasks {
        task.await??;
    }
    Ok(())
}

async fn async_main() -> Result<()> {
    initialize_logging();
    let config = Config::parse();

    let kube_config = kube::Config::infer().await?;
    let client = Client::try_from(kube_config)?;

    let target_client = if config.target_kubeconfig.is_empty() {
        client.clone()
    } else {
        let kubeconfig =
            kube::config::Kubeconfig::read_from(std::path::Path::new(&config.target_kubeconfig))?;
        let target_config = kube::Config::from_custom_kubeconfig(
            kubeconfig,
            &kube::config::KubeConfigOptions::default(),
        )
        .await?;
        Client::try_from(target_config)?
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let context =
        initialize_shared_context(client, target_client, config, shutdown_rx).await?;

    let _metrics_handle = start_metrics_server();

    info!("Performing startup resync across providers and entries...");
    perform_startup_resync(context.clone()).await;

    let shutdown_result: Result<()> = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }

        result = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                sigterm.recv().await;
                Ok::<(), anyhow::Error>(())
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
                Ok::<(), anyhow::Error>(())
            }
        } => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }

        result = run_all_operators(context.clone()) => {
            result
        }
    };

    // Stop the dispatch workers before exiting so no batch mutates state
    // after cancellation.
    let _ = shutdown_tx.send(true);
    shutdown_result?;
    info!("Graceful shutdown completed successfully");
    Ok(())
}
