//! In-memory [`ClusterClient`] for tests and dry runs.
//!
//! Behaves like the API server where the apply engine can tell the difference:
//! create fails with 409 on an existing object, replace fails with 404 on a
//! missing one and with 409 on a stale resource version, writes assign
//! `resourceVersion`, `uid` and `creationTimestamp`, and replace leaves the
//! status alone.

use super::client::ClusterClient;
use crate::controller::identity::ObjectKey;
use crate::controller::syncer::{kind_of, ManagedObject};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use kube::error::ErrorResponse;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type StoreKey = (String, ObjectKey);

#[derive(Debug, Default)]
pub struct InMemoryCluster {
    objects: Mutex<BTreeMap<StoreKey, Value>>,
    revision: AtomicU64,
    writes: AtomicUsize,
}

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

fn object_key(meta: &Value) -> Result<ObjectKey, kube::Error> {
    let field = |name: &str| meta.get(name).and_then(Value::as_str).map(str::to_string);
    match (field("namespace"), field("name")) {
        (Some(namespace), Some(name)) => Ok(ObjectKey::new(namespace, name)),
        _ => Err(api_error(
            422,
            "Invalid",
            "metadata.name and metadata.namespace are required".to_string(),
        )),
    }
}

/// RFC 7386 merge patch
fn merge_patch(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(key);
                } else {
                    merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, BTreeMap<StoreKey, Value>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_revision(&self) -> String {
        (self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Number of successful create, replace and status writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored objects of kind `K`
    pub fn count<K: ManagedObject>(&self) -> usize {
        let kind = kind_of::<K>();
        self.store().keys().filter(|(k, _)| *k == kind).count()
    }

    /// Drop an object, as a user deleting it would; returns whether it existed
    pub fn delete<K: ManagedObject>(&self, key: &ObjectKey) -> bool {
        self.store().remove(&(kind_of::<K>(), key.clone())).is_some()
    }

    fn finish_write<K: ManagedObject>(&self, value: Value) -> Result<K, kube::Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        serde_json::from_value(value).map_err(kube::Error::SerdeError)
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn get<K: ManagedObject>(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error> {
        let stored = self.store().get(&(kind_of::<K>(), key.clone())).cloned();
        stored
            .map(|value| serde_json::from_value(value).map_err(kube::Error::SerdeError))
            .transpose()
    }

    async fn create<K: ManagedObject>(&self, obj: &K) -> Result<K, kube::Error> {
        let mut value = serde_json::to_value(obj).map_err(kube::Error::SerdeError)?;
        let key = object_key(&value["metadata"])?;
        let kind = kind_of::<K>();

        let mut store = self.store();
        let slot = (kind.clone(), key.clone());
        if store.contains_key(&slot) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{kind} {key} already exists"),
            ));
        }
        let revision = self.next_revision();
        let meta = &mut value["metadata"];
        meta["resourceVersion"] = Value::String(revision.clone());
        meta["uid"] = Value::String(format!("uid-{revision}"));
        meta["creationTimestamp"] =
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        store.insert(slot, value.clone());
        drop(store);

        self.finish_write(value)
    }

    async fn replace<K: ManagedObject>(&self, obj: &K) -> Result<K, kube::Error> {
        let mut value = serde_json::to_value(obj).map_err(kube::Error::SerdeError)?;
        let key = object_key(&value["metadata"])?;
        let kind = kind_of::<K>();

        let mut store = self.store();
        let slot = (kind.clone(), key.clone());
        let Some(current) = store.get(&slot) else {
            return Err(api_error(404, "NotFound", format!("{kind} {key} not found")));
        };
        let current_revision = current["metadata"]["resourceVersion"].clone();
        let given_revision = value["metadata"]["resourceVersion"].clone();
        if !given_revision.is_null() && given_revision != current_revision {
            return Err(api_error(
                409,
                "Conflict",
                format!(
                    "Operation cannot be fulfilled on {kind} {key}: the object has been modified"
                ),
            ));
        }

        let status = current.get("status").cloned();
        let uid = current["metadata"]["uid"].clone();
        let created = current["metadata"]["creationTimestamp"].clone();
        match status {
            Some(status) => value["status"] = status,
            None => {
                if let Some(obj) = value.as_object_mut() {
                    obj.remove("status");
                }
            }
        }
        let meta = &mut value["metadata"];
        meta["resourceVersion"] = Value::String(self.next_revision());
        meta["uid"] = uid;
        meta["creationTimestamp"] = created;
        store.insert(slot, value.clone());
        drop(store);

        self.finish_write(value)
    }

    async fn patch_status<K: ManagedObject>(
        &self,
        key: &ObjectKey,
        status: &Value,
    ) -> Result<K, kube::Error> {
        let kind = kind_of::<K>();
        let mut store = self.store();
        let Some(current) = store.get_mut(&(kind.clone(), key.clone())) else {
            return Err(api_error(404, "NotFound", format!("{kind} {key} not found")));
        };
        merge_patch(current, &serde_json::json!({ "status": status }));
        current["metadata"]["resourceVersion"] = Value::String(self.next_revision());
        let value = current.clone();
        drop(store);

        self.finish_write(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn config_map(data: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("settings".to_string()),
                namespace: Some("sites".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("key".to_string(), data.to_string())])),
            ..Default::default()
        }
    }

    fn code(err: kube::Error) -> u16 {
        match err {
            kube::Error::Api(e) => e.code,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let cluster = InMemoryCluster::new();
        let key = ObjectKey::new("sites", "settings");
        assert!(cluster.get::<ConfigMap>(&key).await.expect("get").is_none());

        let created = cluster.create(&config_map("a")).await.expect("create");
        assert!(created.metadata.resource_version.is_some());
        assert!(created.metadata.creation_timestamp.is_some());
        assert_eq!(cluster.get::<ConfigMap>(&key).await.expect("get"), Some(created));
        assert_eq!(cluster.count::<ConfigMap>(), 1);
        assert_eq!(cluster.writes(), 1);
    }

    #[tokio::test]
    async fn test_create_existing_conflicts() {
        let cluster = InMemoryCluster::new();
        cluster.create(&config_map("a")).await.expect("create");
        let err = cluster.create(&config_map("b")).await.expect_err("exists");
        assert_eq!(code(err), 409);
    }

    #[tokio::test]
    async fn test_stale_replace_conflicts() {
        let cluster = InMemoryCluster::new();
        let first = cluster.create(&config_map("a")).await.expect("create");

        let mut update = first.clone();
        update.data = Some(BTreeMap::from([("key".to_string(), "b".to_string())]));
        let updated = cluster.replace(&update).await.expect("replace");
        assert_ne!(
            updated.metadata.resource_version,
            first.metadata.resource_version
        );
        assert_eq!(updated.metadata.uid, first.metadata.uid);

        let err = cluster.replace(&first).await.expect_err("stale");
        assert_eq!(code(err), 409);
    }

    #[tokio::test]
    async fn test_replace_missing_is_not_found() {
        let cluster = InMemoryCluster::new();
        let err = cluster.replace(&config_map("a")).await.expect_err("missing");
        assert_eq!(code(err), 404);
        assert_eq!(cluster.writes(), 0);
    }

    #[test]
    fn test_merge_patch() {
        let mut target = serde_json::json!({"a": 1, "b": {"c": 2, "d": 3}});
        merge_patch(&mut target, &serde_json::json!({"b": {"c": null, "e": 4}}));
        assert_eq!(target, serde_json::json!({"a": 1, "b": {"d": 3, "e": 4}}));
    }
}
