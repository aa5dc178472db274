//! # Watch Loop
//!
//! Controller watch loop that monitors `Wordpress` sites, the objects they own
//! and the `WordpressRuntime` objects they reference, and triggers
//! reconciliation when any of them changes.

use crate::controller::identity::ObjectKey;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::crd::{Wordpress, WordpressRuntime};
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use crate::server::ServerState;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::Api;
use kube::{Client, Resource, ResourceExt};
use kube_runtime::controller::{self, Controller};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::watcher;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

const WATCH_BACKOFF_START_MS: u64 = 1_000;
const WATCH_BACKOFF_MAX_MS: u64 = 30_000;

/// `Api` for a namespaced kind, limited to `namespace` when set
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Drop everything the operator keeps in memory for a deleted site
fn forget_site(ctx: &Reconciler, site: &ObjectKey) {
    info!(site = %site, "Site no longer exists, dropping its runtime entry and wp-cron loop");
    ctx.registry.remove(site);
    ctx.wp_cron.stop(site);
    if let Ok(mut states) = ctx.backoff_states.lock() {
        states.remove(&site.to_string());
    }
}

/// Run the controller watch loop until a shutdown signal arrives
pub async fn run_watch_loop(
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    info!("Starting controller watch loop...");

    // SIGTERM/SIGINT: stop reporting ready while in-flight reconciliations finish
    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, initiating graceful shutdown...");
            shutdown_state.set_ready(false);
        }
    });

    let backoff_ms = Arc::new(AtomicU64::new(WATCH_BACKOFF_START_MS));
    server_state.set_ready(true);

    loop {
        if !server_state.is_ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop"
        );

        let client = reconciler.client.clone();
        let namespace = reconciler.config.watch_namespace.clone();
        let ns = namespace.as_deref();
        let registry = Arc::clone(&reconciler.registry);
        let ctx = Arc::clone(&reconciler);
        let stream_backoff = Arc::clone(&backoff_ms);
        let restart_delay = reconciler.config.watch_restart_delay();

        Controller::new(
            scoped_api::<Wordpress>(&client, ns),
            watcher::Config::default().any_semantic(),
        )
        .owns(scoped_api::<Deployment>(&client, ns), watcher::Config::default())
        .owns(scoped_api::<Service>(&client, ns), watcher::Config::default())
        .owns(scoped_api::<Ingress>(&client, ns), watcher::Config::default())
        .owns(
            scoped_api::<PersistentVolumeClaim>(&client, ns),
            watcher::Config::default(),
        )
        .owns(scoped_api::<CronJob>(&client, ns), watcher::Config::default())
        .owns(scoped_api::<Job>(&client, ns), watcher::Config::default())
        .owns(scoped_api::<Secret>(&client, ns), watcher::Config::default())
        .watches(
            Api::<WordpressRuntime>::all(client.clone()),
            watcher::Config::default(),
            move |runtime| {
                registry
                    .sites_for(&runtime.name_any())
                    .into_iter()
                    .map(|site| ObjectRef::new(&site.name).within(&site.namespace))
            },
        )
        .with_config(
            controller::Config::default().concurrency(reconciler.config.max_concurrent_reconciliations),
        )
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
        .for_each(move |result| {
            let ctx = Arc::clone(&ctx);
            let backoff = Arc::clone(&stream_backoff);
            async move {
                match result {
                    Ok((site, _action)) => {
                        backoff.store(WATCH_BACKOFF_START_MS, std::sync::atomic::Ordering::Relaxed);
                        debug!(site = %site, "watch.event.reconciled");
                    }
                    Err(controller::Error::ReconcilerFailed(error, site)) => {
                        // Already logged and backed off by the error policy
                        debug!(site = %site, error = %error, "watch.event.reconciliation_failed");
                    }
                    Err(controller::Error::ObjectNotFound(site)) => {
                        let namespace = site.namespace.clone().unwrap_or_default();
                        forget_site(&ctx, &ObjectKey::new(namespace, site.name.clone()));
                    }
                    Err(e) => {
                        handle_watch_stream_error(
                            &format!("{e:?}"),
                            &backoff,
                            WATCH_BACKOFF_MAX_MS,
                            restart_delay,
                        )
                        .await;
                    }
                }
            }
        })
        .instrument(watch_span)
        .await;

        if !server_state.is_ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = reconciler.config.watch_restart_delay();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}
