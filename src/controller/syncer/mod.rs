//! # Syncers
//!
//! One syncer per dependent object kind. A syncer knows the key of its object,
//! how to build an empty one, and how to turn whatever is in the cluster into
//! the desired object. Transforms are pure and idempotent; the apply engine does
//! every read and write.
//!
//! [`site_syncers`] lists the syncers of one site in apply order.

mod claim;
mod cron;
mod deployment;
mod ingress;
mod secret;
mod service;
mod upgrade;

pub use claim::ClaimSyncer;
pub use cron::{CronSyncer, CRON_COMMAND};
pub use deployment::DeploymentSyncer;
pub use ingress::{upsert_path, IngressSyncer};
pub use secret::SecretSyncer;
pub use service::ServiceSyncer;
pub use upgrade::{DbUpgradeSyncer, UPGRADE_COMMAND};

use crate::config::CronMode;
use crate::controller::apply::{apply, ApplyOutcome, ClusterClient, EventSink};
use crate::controller::error::SyncError;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::resolver::{CodeSource, EffectiveSpec, MediaSource};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::NamespaceResourceScope;
use kube::api::ObjectMeta;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Namespaced cluster object the operator can read, compare and write
pub trait ManagedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + PartialEq
    + Serialize
    + DeserializeOwned
    + Default
    + Send
    + Sync
    + 'static
{
}

impl<T> ManagedObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Default
        + Send
        + Sync
        + 'static
{
}

/// Kind name of a managed object type, e.g. `Deployment`
pub fn kind_of<K: ManagedObject>() -> String {
    K::kind(&()).into_owned()
}

pub trait Syncer: Send + Sync {
    type Object: ManagedObject;

    fn key(&self) -> ObjectKey;

    /// Zeroed object carrying only its identity
    fn placeholder(&self) -> Self::Object {
        let key = self.key();
        let mut obj = Self::Object::default();
        let meta = obj.meta_mut();
        meta.name = Some(key.name);
        meta.namespace = Some(key.namespace);
        obj
    }

    /// Desired object given the current one (or the placeholder)
    fn transform(&self, existing: Self::Object) -> Result<Self::Object, SyncError>;
}

/// Add `labels` to the object's labels, keeping foreign ones
pub(crate) fn merge_labels(meta: &mut ObjectMeta, labels: BTreeMap<String, String>) {
    meta.labels.get_or_insert_with(BTreeMap::new).extend(labels);
}

pub(crate) fn merge_annotations(meta: &mut ObjectMeta, annotations: BTreeMap<String, String>) {
    if annotations.is_empty() {
        return;
    }
    meta.annotations
        .get_or_insert_with(BTreeMap::new)
        .extend(annotations);
}

/// Site-wide knobs that come from the operator configuration, not from the site
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub ingress_class: Option<String>,
    pub cron_mode: CronMode,
}

/// Every syncer kind, so one site's syncers fit in a single ordered list
#[derive(Debug)]
pub enum SiteSyncer {
    Secret(SecretSyncer),
    Claim(ClaimSyncer),
    Deployment(DeploymentSyncer),
    Service(ServiceSyncer),
    Ingress(IngressSyncer),
    Cron(CronSyncer),
    DbUpgrade(DbUpgradeSyncer),
}

impl SiteSyncer {
    pub fn key(&self) -> ObjectKey {
        match self {
            Self::Secret(s) => s.key(),
            Self::Claim(s) => s.key(),
            Self::Deployment(s) => s.key(),
            Self::Service(s) => s.key(),
            Self::Ingress(s) => s.key(),
            Self::Cron(s) => s.key(),
            Self::DbUpgrade(s) => s.key(),
        }
    }

    /// Fetch, transform and write this syncer's object
    pub async fn sync<C, E>(
        &self,
        client: &C,
        events: &E,
        owner: &OwnerReference,
    ) -> Result<ApplyOutcome, SyncError>
    where
        C: ClusterClient,
        E: EventSink,
    {
        match self {
            Self::Secret(s) => apply(client, events, owner, s).await,
            Self::Claim(s) => apply(client, events, owner, s).await,
            Self::Deployment(s) => apply(client, events, owner, s).await,
            Self::Service(s) => apply(client, events, owner, s).await,
            Self::Ingress(s) => apply(client, events, owner, s).await,
            Self::Cron(s) => apply(client, events, owner, s).await,
            Self::DbUpgrade(s) => apply(client, events, owner, s).await,
        }
    }
}

/// Syncers for one site, in apply order
///
/// Claims are only listed for claim-backed sources and the CronJob only when
/// wp-cron runs as a job.
pub fn site_syncers(spec: Arc<EffectiveSpec>, options: &SyncOptions) -> Vec<SiteSyncer> {
    let mut syncers = vec![SiteSyncer::Secret(SecretSyncer::new(spec.clone()))];

    if matches!(
        spec.code.as_ref().map(|c| &c.source),
        Some(CodeSource::PersistentVolumeClaim(_))
    ) {
        syncers.push(SiteSyncer::Claim(ClaimSyncer::new(
            spec.clone(),
            Component::CodePvc,
        )));
    }
    if matches!(
        spec.media.as_ref().map(|m| &m.source),
        Some(MediaSource::PersistentVolumeClaim(_))
    ) {
        syncers.push(SiteSyncer::Claim(ClaimSyncer::new(
            spec.clone(),
            Component::MediaPvc,
        )));
    }

    syncers.push(SiteSyncer::Deployment(DeploymentSyncer::new(spec.clone())));
    syncers.push(SiteSyncer::Service(ServiceSyncer::new(spec.clone())));
    syncers.push(SiteSyncer::Ingress(IngressSyncer::new(
        spec.clone(),
        options.ingress_class.clone(),
    )));
    if options.cron_mode == CronMode::Job {
        syncers.push(SiteSyncer::Cron(CronSyncer::new(spec.clone())));
    }
    syncers.push(SiteSyncer::DbUpgrade(DbUpgradeSyncer::new(spec)));
    syncers
}
