//! End-to-end reconciliation against the in-memory cluster

mod common;

use async_trait::async_trait;
use common::*;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::error::ErrorResponse;
use std::collections::BTreeMap;
use wordpress_operator::config::CronMode;
use wordpress_operator::constants::{
    ANNOTATION_INGRESS_CLASS, CONDITION_READY, GIT_CONTAINER_NAME, SALT_KEYS, WEB_CONTAINER_NAME,
};
use wordpress_operator::controller::apply::{
    ApplyOutcome, ClusterClient, InMemoryCluster, RecordingEventSink, Severity,
};
use wordpress_operator::controller::error::SyncError;
use wordpress_operator::controller::identity::ObjectKey;
use wordpress_operator::controller::reconciler::reconcile_site;
use wordpress_operator::controller::syncer::{kind_of, ManagedObject, SyncOptions};
use wordpress_operator::crd::{ConditionStatus, WordpressRuntimeSpec, WordpressSpec};

async fn get<K: ManagedObject>(cluster: &InMemoryCluster, name: &str) -> Option<K> {
    cluster.get(&key(name)).await.expect("get")
}

#[tokio::test]
async fn test_git_site_reconciles_to_full_object_set() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, git_spec()).await;

    let report = reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("reconciles");
    assert!(report.outcomes.iter().all(|o| *o == ApplyOutcome::Created));

    let deployment: Deployment = get(&cluster, "blog").await.expect("deployment");
    let pod = deployment
        .spec
        .and_then(|s| s.template.spec)
        .expect("pod spec");
    let init: Vec<String> = pod
        .init_containers
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(init, vec![GIT_CONTAINER_NAME.to_string()]);
    let web = pod
        .containers
        .iter()
        .find(|c| c.name == WEB_CONTAINER_NAME)
        .expect("web container");
    let home = web
        .env
        .iter()
        .flatten()
        .find(|e| e.name == "WP_HOME")
        .and_then(|e| e.value.clone());
    assert_eq!(home.as_deref(), Some("http://blog.example.com"));

    let service: Service = get(&cluster, "blog").await.expect("service");
    assert_eq!(
        service.spec.and_then(|s| s.ports).map(|p| p.len()),
        Some(1)
    );

    let ingress: Ingress = get(&cluster, "blog").await.expect("ingress");
    let rules = ingress.spec.and_then(|s| s.rules).unwrap_or_default();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].host.as_deref(), Some(DOMAIN));

    assert!(get::<Secret>(&cluster, "blog-wp").await.is_some());
    assert!(get::<CronJob>(&cluster, "blog-wp-cron").await.is_some());
    let upgrade = format!("blog-upgrade-for-{}", report.spec.version_hash());
    assert!(get::<Job>(&cluster, &upgrade).await.is_some());

    // git code lives in an emptyDir; no media source means no media objects
    assert_eq!(cluster.count::<PersistentVolumeClaim>(), 0);

    let reasons = sink.reasons();
    assert!(reasons.contains(&"DeploymentCreated".to_string()));
    assert!(sink.events().iter().all(|e| e.severity == Severity::Normal));
}

#[tokio::test]
async fn test_claim_backed_code_creates_one_claim() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, claim_code_spec("1Gi")).await;

    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("reconciles");

    assert_eq!(cluster.count::<PersistentVolumeClaim>(), 1);
    let claim: PersistentVolumeClaim = get(&cluster, "blog-code").await.expect("code claim");
    assert_eq!(claim.spec, Some(claim_spec("1Gi")));
    assert!(get::<PersistentVolumeClaim>(&cluster, "blog-media").await.is_none());
}

#[tokio::test]
async fn test_second_pass_changes_nothing() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, git_spec()).await;

    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("first pass");
    let site = reload_site(&cluster).await;
    let writes = cluster.writes();

    let report = reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("second pass");
    assert_eq!(report.changed(), 0);
    assert!(report
        .outcomes
        .iter()
        .all(|o| *o == ApplyOutcome::Unchanged));
    assert_eq!(cluster.writes(), writes);
}

#[tokio::test]
async fn test_ready_condition_tracks_generation() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, routed_spec()).await;

    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("reconciles");
    let site = update_site_spec(
        &cluster,
        WordpressSpec {
            replicas: Some(2),
            ..routed_spec()
        },
    )
    .await;
    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("reconciles");

    let status = reload_site(&cluster).await.status.expect("status");
    assert_eq!(status.observed_generation, Some(2));
    let ready = status
        .conditions
        .iter()
        .find(|c| c.r#type == CONDITION_READY)
        .expect("Ready condition");
    assert_eq!(ready.status, ConditionStatus::True);
}

#[tokio::test]
async fn test_claim_spec_is_written_once() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, claim_code_spec("1Gi")).await;
    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("first pass");

    let site = update_site_spec(&cluster, claim_code_spec("5Gi")).await;
    let report = reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("second pass");

    // secret, code claim, deployment, ...
    assert_eq!(report.outcomes[1], ApplyOutcome::Unchanged);
    let claim: PersistentVolumeClaim = get(&cluster, "blog-code").await.expect("code claim");
    assert_eq!(claim.spec, Some(claim_spec("1Gi")));
}

#[tokio::test]
async fn test_salts_are_generated_once() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, routed_spec()).await;

    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("first pass");
    let first: Secret = get(&cluster, "blog-wp").await.expect("secret");
    let salts = first.data.clone().expect("salts");
    assert_eq!(salts.len(), SALT_KEYS.len());
    assert!(salts.values().all(|v| !v.0.is_empty()));

    let site = reload_site(&cluster).await;
    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("second pass");
    let second: Secret = get(&cluster, "blog-wp").await.expect("secret");
    assert_eq!(second.data, Some(salts));
}

#[tokio::test]
async fn test_changed_selector_fails_the_pass() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, routed_spec()).await;
    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("first pass");

    let mut deployment: Deployment = get(&cluster, "blog").await.expect("deployment");
    if let Some(spec) = deployment.spec.as_mut() {
        spec.selector.match_labels = Some(BTreeMap::from([(
            "app".to_string(),
            "someone-else".to_string(),
        )]));
    }
    cluster.replace(&deployment).await.expect("tamper");

    let site = reload_site(&cluster).await;
    let err = reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect_err("selector is immutable");
    assert!(matches!(
        err,
        SyncError::ImmutableField {
            kind: "Deployment",
            field: "spec.selector",
            ..
        }
    ));
    assert!(sink.reasons().contains(&"DeploymentFailed".to_string()));

    let ready = reload_site(&cluster)
        .await
        .status
        .and_then(|s| s.conditions.into_iter().find(|c| c.r#type == CONDITION_READY))
        .expect("Ready condition");
    assert_eq!(ready.status, ConditionStatus::False);
    assert_eq!(ready.reason.as_deref(), Some("ImmutableField"));
}

/// Rejects every Deployment update as if another writer got there first
#[derive(Debug, Default)]
struct ContendedCluster {
    inner: InMemoryCluster,
}

#[async_trait]
impl ClusterClient for ContendedCluster {
    async fn get<K: ManagedObject>(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error> {
        self.inner.get(key).await
    }

    async fn create<K: ManagedObject>(&self, obj: &K) -> Result<K, kube::Error> {
        self.inner.create(obj).await
    }

    async fn replace<K: ManagedObject>(&self, obj: &K) -> Result<K, kube::Error> {
        if kind_of::<K>() == "Deployment" {
            return Err(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "the object has been modified".to_string(),
                reason: "Conflict".to_string(),
                code: 409,
            }));
        }
        self.inner.replace(obj).await
    }

    async fn patch_status<K: ManagedObject>(
        &self,
        key: &ObjectKey,
        status: &serde_json::Value,
    ) -> Result<K, kube::Error> {
        self.inner.patch_status(key, status).await
    }
}

#[tokio::test]
async fn test_conflict_surfaces_for_retry() {
    let cluster = ContendedCluster::default();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster.inner, routed_spec()).await;
    reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect("first pass creates");

    let site = update_site_spec(
        &cluster.inner,
        WordpressSpec {
            replicas: Some(3),
            ..routed_spec()
        },
    )
    .await;
    let err = reconcile_site(&cluster, &sink, &site, None, &SyncOptions::default())
        .await
        .expect_err("deployment update conflicts");
    assert!(err.is_conflict());
    assert!(!err.is_permanent());
    // fail-fast: nothing after the deployment was touched
    let reasons = sink.reasons();
    assert_eq!(reasons.last().map(String::as_str), Some("DeploymentFailed"));
}

#[tokio::test]
async fn test_runtime_defaults_fill_the_image() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(
        &cluster,
        WordpressSpec {
            runtime: Some("php74".to_string()),
            ..routed_spec()
        },
    )
    .await;
    let runtime = WordpressRuntimeSpec {
        default_image: Some("registry.example.com/wordpress".to_string()),
        default_tag: Some("6.4".to_string()),
        ..Default::default()
    };

    reconcile_site(&cluster, &sink, &site, Some(&runtime), &SyncOptions::default())
        .await
        .expect("reconciles");

    let deployment: Deployment = get(&cluster, "blog").await.expect("deployment");
    let image = deployment
        .spec
        .and_then(|s| s.template.spec)
        .and_then(|p| p.containers.into_iter().find(|c| c.name == WEB_CONTAINER_NAME))
        .and_then(|c| c.image);
    assert_eq!(image.as_deref(), Some("registry.example.com/wordpress:6.4"));
}

#[tokio::test]
async fn test_http_cron_mode_skips_cron_job() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, routed_spec()).await;
    let options = SyncOptions {
        cron_mode: CronMode::Http,
        ..Default::default()
    };

    reconcile_site(&cluster, &sink, &site, None, &options)
        .await
        .expect("reconciles");
    assert_eq!(cluster.count::<CronJob>(), 0);
    assert_eq!(cluster.count::<Deployment>(), 1);
}

#[tokio::test]
async fn test_ingress_class_option_is_applied() {
    let cluster = InMemoryCluster::new();
    let sink = RecordingEventSink::new();
    let site = stored_site(&cluster, routed_spec()).await;
    let options = SyncOptions {
        ingress_class: Some("nginx".to_string()),
        ..Default::default()
    };

    reconcile_site(&cluster, &sink, &site, None, &options)
        .await
        .expect("reconciles");
    let ingress: Ingress = get(&cluster, "blog").await.expect("ingress");
    let class = ingress
        .metadata
        .annotations
        .and_then(|a| a.get(ANNOTATION_INGRESS_CLASS).cloned());
    assert_eq!(class.as_deref(), Some("nginx"));
}
