//! # Reconcile
//!
//! One pass over a site: resolve the effective spec, drive every syncer through
//! the apply engine in order, stop at the first failure, then record the
//! outcome as the `Ready` condition.

use super::types::{Reconciler, ReconcilerError};
use crate::config::CronMode;
use crate::constants::{CONDITION_READY, REASON_RECONCILE_SUCCEEDED};
use crate::controller::apply::{ApplyOutcome, ClusterClient, EventSink, KubeEventSink};
use crate::controller::error::SyncError;
use crate::controller::identity::ObjectKey;
use crate::controller::resolver::{resolve, EffectiveSpec};
use crate::controller::status::{update_condition, ConditionUpdate};
use crate::controller::syncer::{site_syncers, SyncOptions};
use crate::controller::wp_cron::WpCronTarget;
use crate::crd::{ConditionStatus, Wordpress, WordpressRuntime, WordpressRuntimeSpec};
use crate::observability::metrics;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::Api;
use kube::{Client, Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

const READY_MESSAGE: &str = "All dependent objects are in sync";

/// Result of a successful pass
#[derive(Debug, Clone)]
pub struct SiteReport {
    pub spec: Arc<EffectiveSpec>,
    /// One outcome per syncer, in apply order
    pub outcomes: Vec<ApplyOutcome>,
}

impl SiteReport {
    /// Number of objects created or updated
    pub fn changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| **o != ApplyOutcome::Unchanged)
            .count()
    }
}

/// Apply the site's syncers in order; the first error aborts the pass
pub async fn sync_site<C, E>(
    client: &C,
    events: &E,
    spec: Arc<EffectiveSpec>,
    owner: &OwnerReference,
    options: &SyncOptions,
) -> Result<Vec<ApplyOutcome>, SyncError>
where
    C: ClusterClient,
    E: EventSink,
{
    let syncers = site_syncers(spec, options);
    let mut outcomes = Vec::with_capacity(syncers.len());
    for syncer in &syncers {
        outcomes.push(syncer.sync(client, events, owner).await?);
    }
    Ok(outcomes)
}

/// Converge `site` and write its `Ready` condition
///
/// The condition write is best effort: a failure is logged and the pass
/// result is returned unchanged.
pub async fn reconcile_site<C, E>(
    client: &C,
    events: &E,
    site: &Wordpress,
    runtime: Option<&WordpressRuntimeSpec>,
    options: &SyncOptions,
) -> Result<SiteReport, SyncError>
where
    C: ClusterClient,
    E: EventSink,
{
    let key = ObjectKey::of(site)
        .ok_or_else(|| SyncError::Validation("site has no name or namespace".to_string()))?;

    let result = converge_site(client, events, site, runtime, options).await;

    let message = match &result {
        Ok(_) => READY_MESSAGE.to_string(),
        Err(e) => e.to_string(),
    };
    let update = match &result {
        Ok(_) => ConditionUpdate {
            condition_type: CONDITION_READY,
            status: ConditionStatus::True,
            reason: REASON_RECONCILE_SUCCEEDED,
            message: &message,
            observed_generation: site.metadata.generation,
        },
        Err(e) => ConditionUpdate {
            condition_type: CONDITION_READY,
            status: ConditionStatus::False,
            reason: e.reason(),
            message: &message,
            observed_generation: None,
        },
    };
    if let Err(e) = update_condition(client, &key, &update).await {
        warn!(site = %key, error = %e, "Failed to update Ready condition");
    }

    result
}

async fn converge_site<C, E>(
    client: &C,
    events: &E,
    site: &Wordpress,
    runtime: Option<&WordpressRuntimeSpec>,
    options: &SyncOptions,
) -> Result<SiteReport, SyncError>
where
    C: ClusterClient,
    E: EventSink,
{
    let spec = Arc::new(resolve(site, runtime)?);
    let owner = site.controller_owner_ref(&()).ok_or_else(|| {
        SyncError::Validation(format!(
            "site {}/{} has no uid yet",
            spec.namespace, spec.name
        ))
    })?;
    let outcomes = sync_site(client, events, Arc::clone(&spec), &owner, options).await?;
    Ok(SiteReport { spec, outcomes })
}

/// Look up the runtime a site refers to; a dangling reference falls back to built-in defaults
async fn fetch_runtime(
    client: &Client,
    name: &str,
) -> Result<Option<WordpressRuntimeSpec>, SyncError> {
    if name.is_empty() {
        return Ok(None);
    }
    let api: Api<WordpressRuntime> = Api::all(client.clone());
    let runtime = api.get_opt(name).await?;
    if runtime.is_none() {
        warn!(runtime = name, "WordpressRuntime not found, using built-in defaults");
    }
    Ok(runtime.map(|rt| rt.spec))
}

/// Controller entry point
pub async fn reconcile(
    site: Arc<Wordpress>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = site.name_any();
    let namespace = site.namespace().unwrap_or_default();
    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        resource.generation = site.metadata.generation.unwrap_or(0)
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations();

        let key = ObjectKey::new(namespace, name);
        let runtime_name = site.spec.runtime.clone().unwrap_or_default();
        ctx.registry.record(key.clone(), &runtime_name);

        let runtime = fetch_runtime(&ctx.client, &runtime_name).await?;
        let events = KubeEventSink::new(ctx.client.clone(), site.object_ref(&()));
        let options = ctx.sync_options();

        let result = reconcile_site(
            ctx.cluster.as_ref(),
            &events,
            &site,
            runtime.as_ref(),
            &options,
        )
        .await;
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        let report = result?;

        if options.cron_mode == CronMode::Http {
            ctx.wp_cron
                .ensure(Arc::clone(&ctx.cluster), WpCronTarget::for_site(&report.spec));
        }
        ctx.reset_backoff(&key.to_string());

        if report.changed() > 0 {
            info!(
                objects = report.outcomes.len(),
                changed = report.changed(),
                "Site reconciled"
            );
        } else {
            debug!(objects = report.outcomes.len(), "Site already in sync");
        }

        metrics::increment_requeues_total("resync");
        Ok::<_, ReconcilerError>(Action::requeue(ctx.config.resync_interval()))
    }
    .instrument(span)
    .await
}
