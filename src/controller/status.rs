//! # Status
//!
//! Read-modify-write of one site condition, skipped when nothing changed.

use crate::controller::apply::ClusterClient;
use crate::controller::error::SyncError;
use crate::controller::identity::ObjectKey;
use crate::crd::{set_condition, ConditionStatus, Wordpress};
use serde_json::json;
use tracing::debug;

/// Desired state of one condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionUpdate<'a> {
    pub condition_type: &'a str,
    pub status: ConditionStatus,
    pub reason: &'a str,
    pub message: &'a str,
    /// Also record the generation the condition was computed for
    pub observed_generation: Option<i64>,
}

/// Apply `update` to the site's status; returns whether a write happened
///
/// A site that no longer exists is not an error and yields `false`.
pub async fn update_condition<C: ClusterClient>(
    client: &C,
    site: &ObjectKey,
    update: &ConditionUpdate<'_>,
) -> Result<bool, SyncError> {
    let Some(wordpress) = client.get::<Wordpress>(site).await? else {
        return Ok(false);
    };
    let status = wordpress.status.unwrap_or_default();
    let mut conditions = status.conditions;

    let mut changed = set_condition(
        &mut conditions,
        update.condition_type,
        update.status,
        update.reason,
        update.message,
        chrono::Utc::now(),
    );
    let generation_changed = update
        .observed_generation
        .is_some_and(|g| status.observed_generation != Some(g));
    changed |= generation_changed;
    if !changed {
        debug!(site = %site, condition = update.condition_type, "condition unchanged");
        return Ok(false);
    }

    let mut patch = json!({ "conditions": conditions });
    if let Some(generation) = update.observed_generation {
        patch["observedGeneration"] = json!(generation);
    }
    client.patch_status::<Wordpress>(site, &patch).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::apply::InMemoryCluster;
    use crate::crd::WordpressSpec;
    use kube::api::ObjectMeta;

    fn ready(status: ConditionStatus, message: &str) -> ConditionUpdate<'_> {
        ConditionUpdate {
            condition_type: "Ready",
            status,
            reason: "ReconcileSucceeded",
            message,
            observed_generation: Some(1),
        }
    }

    async fn cluster_with_site() -> (InMemoryCluster, ObjectKey) {
        let cluster = InMemoryCluster::new();
        let site = Wordpress {
            metadata: ObjectMeta {
                name: Some("blog".to_string()),
                namespace: Some("sites".to_string()),
                ..Default::default()
            },
            spec: WordpressSpec::default(),
            status: None,
        };
        cluster.create(&site).await.expect("create site");
        (cluster, ObjectKey::new("sites", "blog"))
    }

    #[tokio::test]
    async fn test_writes_only_on_change() {
        let (cluster, key) = cluster_with_site().await;
        let writes = cluster.writes();

        assert!(update_condition(&cluster, &key, &ready(ConditionStatus::True, "ok"))
            .await
            .expect("update"));
        assert!(!update_condition(&cluster, &key, &ready(ConditionStatus::True, "ok"))
            .await
            .expect("update"));
        assert_eq!(cluster.writes(), writes + 1);

        assert!(update_condition(&cluster, &key, &ready(ConditionStatus::False, "boom"))
            .await
            .expect("update"));

        let site: Wordpress = cluster.get(&key).await.expect("get").expect("exists");
        let status = site.status.expect("status");
        assert_eq!(status.observed_generation, Some(1));
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].status, ConditionStatus::False);
        assert_eq!(status.conditions[0].message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_missing_site_is_not_an_error() {
        let cluster = InMemoryCluster::new();
        let key = ObjectKey::new("sites", "gone");
        assert!(!update_condition(&cluster, &key, &ready(ConditionStatus::True, "ok"))
            .await
            .expect("update"));
    }
}
