//! # Apply Engine
//!
//! Generic fetch, transform, compare and write protocol shared by every syncer.
//!
//! 1. Read the object at the syncer's key; start from the placeholder when absent.
//! 2. Transform it. A transform error aborts before any write.
//! 3. Ensure the owner reference to the site.
//! 4. Create when absent; otherwise replace only if the desired object differs.
//!    The replace carries the read resource version, so a concurrent writer
//!    surfaces as a 409 for the caller to retry on the next reconciliation.
//!
//! Every outcome, failures included, produces exactly one event and one metric sample.

mod client;
mod events;
mod memory;

pub use client::{ClusterClient, KubeClusterClient};
pub use events::{EventSink, KubeEventSink, RecordingEventSink, Severity, SyncEvent};
pub use memory::InMemoryCluster;

use crate::controller::error::SyncError;
use crate::controller::syncer::{kind_of, Syncer};
use crate::observability::metrics;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::ObjectMeta;
use kube::Resource;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
}

impl ApplyOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }

    fn reason_suffix(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Unchanged => "Unchanged",
        }
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point `meta` at `owner`, replacing a reference to the same kind and name
pub fn ensure_owner_reference(meta: &mut ObjectMeta, owner: &OwnerReference) {
    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    match refs
        .iter_mut()
        .find(|r| r.kind == owner.kind && r.name == owner.name)
    {
        Some(existing) => *existing = owner.clone(),
        None => refs.push(owner.clone()),
    }
}

/// Converge one dependent object
pub async fn apply<C, E, S>(
    client: &C,
    events: &E,
    owner: &OwnerReference,
    syncer: &S,
) -> Result<ApplyOutcome, SyncError>
where
    C: ClusterClient,
    E: EventSink,
    S: Syncer,
{
    let kind = kind_of::<S::Object>();
    let key = syncer.key();

    let result = converge(client, owner, syncer).await;
    match &result {
        Ok(outcome) => {
            match outcome {
                ApplyOutcome::Unchanged => debug!(kind = %kind, object = %key, "unchanged"),
                _ => info!(kind = %kind, object = %key, outcome = %outcome, "applied"),
            }
            metrics::increment_apply_total(&kind, outcome.as_str());
            events.publish(SyncEvent::applied(&kind, &key, *outcome)).await;
        }
        Err(e) => {
            warn!(kind = %kind, object = %key, error = %e, reason = e.reason(), "apply failed");
            metrics::increment_apply_total(&kind, "failed");
            events.publish(SyncEvent::failed(&kind, &key, e)).await;
        }
    }
    result
}

async fn converge<C, S>(
    client: &C,
    owner: &OwnerReference,
    syncer: &S,
) -> Result<ApplyOutcome, SyncError>
where
    C: ClusterClient,
    S: Syncer,
{
    let current = client.get::<S::Object>(&syncer.key()).await?;
    let found = current.is_some();
    let existing = current.unwrap_or_else(|| syncer.placeholder());

    let mut desired = syncer.transform(existing.clone())?;
    ensure_owner_reference(desired.meta_mut(), owner);

    if !found {
        client.create(&desired).await?;
        return Ok(ApplyOutcome::Created);
    }
    if desired == existing {
        return Ok(ApplyOutcome::Unchanged);
    }
    client.replace(&desired).await?;
    Ok(ApplyOutcome::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::identity::ObjectKey;
    use k8s_openapi::api::core::v1::ConfigMap;
    use std::collections::BTreeMap;

    fn owner(uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: "wordpress.presslabs.org/v1alpha1".to_string(),
            kind: "Wordpress".to_string(),
            name: "blog".to_string(),
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    /// Writes `value` under `key`; fails when `value` is empty
    struct ValueSyncer(&'static str);

    impl Syncer for ValueSyncer {
        type Object = ConfigMap;

        fn key(&self) -> ObjectKey {
            ObjectKey::new("sites", "settings")
        }

        fn transform(&self, mut existing: ConfigMap) -> Result<ConfigMap, SyncError> {
            if self.0.is_empty() {
                return Err(SyncError::Validation("empty value".to_string()));
            }
            existing
                .data
                .get_or_insert_with(BTreeMap::new)
                .insert("key".to_string(), self.0.to_string());
            Ok(existing)
        }
    }

    #[test]
    fn test_owner_reference_is_never_duplicated() {
        let mut meta = ObjectMeta::default();
        ensure_owner_reference(&mut meta, &owner("a"));
        ensure_owner_reference(&mut meta, &owner("b"));
        let refs = meta.owner_references.expect("refs");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, "b");
    }

    #[tokio::test]
    async fn test_created_updated_unchanged() {
        let cluster = InMemoryCluster::new();
        let sink = RecordingEventSink::new();
        let owner = owner("uid-1");

        let first = apply(&cluster, &sink, &owner, &ValueSyncer("a")).await;
        assert_eq!(first.expect("apply"), ApplyOutcome::Created);
        let again = apply(&cluster, &sink, &owner, &ValueSyncer("a")).await;
        assert_eq!(again.expect("apply"), ApplyOutcome::Unchanged);
        let changed = apply(&cluster, &sink, &owner, &ValueSyncer("b")).await;
        assert_eq!(changed.expect("apply"), ApplyOutcome::Updated);

        assert_eq!(cluster.writes(), 2);
        assert_eq!(
            sink.reasons(),
            vec!["ConfigMapCreated", "ConfigMapUnchanged", "ConfigMapUpdated"]
        );

        let stored: ConfigMap = cluster
            .get(&ObjectKey::new("sites", "settings"))
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.metadata.owner_references.map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn test_transform_error_writes_nothing() {
        let cluster = InMemoryCluster::new();
        let sink = RecordingEventSink::new();

        let err = apply(&cluster, &sink, &owner("uid-1"), &ValueSyncer(""))
            .await
            .expect_err("transform fails");
        assert!(err.is_permanent());
        assert_eq!(cluster.writes(), 0);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, "ConfigMapFailed");
        assert_eq!(events[0].severity, Severity::Warning);
    }
}
