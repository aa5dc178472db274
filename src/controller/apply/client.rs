//! Narrow cluster API used by the apply engine and the status writer.

use crate::constants::OPERATOR_NAME;
use crate::controller::identity::ObjectKey;
use crate::controller::syncer::ManagedObject;
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Read one object; `None` when it does not exist
    async fn get<K: ManagedObject>(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error>;

    async fn create<K: ManagedObject>(&self, obj: &K) -> Result<K, kube::Error>;

    /// Full update, rejected with 409 when the object's resource version is stale
    async fn replace<K: ManagedObject>(&self, obj: &K) -> Result<K, kube::Error>;

    /// Merge-patch the status subresource
    async fn patch_status<K: ManagedObject>(
        &self,
        key: &ObjectKey,
        status: &serde_json::Value,
    ) -> Result<K, kube::Error>;
}

/// [`ClusterClient`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: ManagedObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn api_for<K: ManagedObject>(&self, obj: &K) -> Api<K> {
        self.api(obj.meta().namespace.as_deref().unwrap_or("default"))
    }
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

fn post_params() -> PostParams {
    PostParams {
        dry_run: false,
        field_manager: Some(OPERATOR_NAME.to_string()),
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get<K: ManagedObject>(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error> {
        self.api::<K>(&key.namespace).get_opt(&key.name).await
    }

    async fn create<K: ManagedObject>(&self, obj: &K) -> Result<K, kube::Error> {
        self.api_for(obj).create(&post_params(), obj).await
    }

    async fn replace<K: ManagedObject>(&self, obj: &K) -> Result<K, kube::Error> {
        let name = obj.meta().name.clone().unwrap_or_default();
        self.api_for(obj).replace(&name, &post_params(), obj).await
    }

    async fn patch_status<K: ManagedObject>(
        &self,
        key: &ObjectKey,
        status: &serde_json::Value,
    ) -> Result<K, kube::Error> {
        self.api::<K>(&key.namespace)
            .patch_status(
                &key.name,
                &PatchParams::default(),
                &Patch::Merge(serde_json::json!({ "status": status })),
            )
            .await
    }
}
