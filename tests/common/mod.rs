//! Helpers shared by the integration tests

#![allow(dead_code, reason = "each test binary uses a different subset")]

use k8s_openapi::api::core::v1::{PersistentVolumeClaimSpec, VolumeResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use wordpress_operator::controller::apply::{ClusterClient, InMemoryCluster};
use wordpress_operator::controller::identity::ObjectKey;
use wordpress_operator::crd::{CodeVolumeSpec, GitVolumeSource, RouteSpec, Wordpress, WordpressSpec};

pub const NAMESPACE: &str = "sites";
pub const NAME: &str = "blog";
pub const DOMAIN: &str = "blog.example.com";

pub fn site_key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, NAME)
}

pub fn key(name: &str) -> ObjectKey {
    ObjectKey::new(NAMESPACE, name)
}

pub fn routed_spec() -> WordpressSpec {
    WordpressSpec {
        routes: vec![RouteSpec {
            domain: DOMAIN.to_string(),
            path: None,
        }],
        ..Default::default()
    }
}

pub fn git_spec() -> WordpressSpec {
    WordpressSpec {
        code: Some(CodeVolumeSpec {
            git: Some(GitVolumeSource {
                repository: "https://github.com/example/blog.git".to_string(),
                reference: Some("main".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..routed_spec()
    }
}

pub fn claim_spec(size: &str) -> PersistentVolumeClaimSpec {
    PersistentVolumeClaimSpec {
        access_modes: Some(vec!["ReadWriteOnce".to_string()]),
        resources: Some(VolumeResourceRequirements {
            requests: Some(BTreeMap::from([(
                "storage".to_string(),
                Quantity(size.to_string()),
            )])),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn claim_code_spec(size: &str) -> WordpressSpec {
    WordpressSpec {
        code: Some(CodeVolumeSpec {
            persistent_volume_claim: Some(claim_spec(size)),
            ..Default::default()
        }),
        ..routed_spec()
    }
}

/// Store a site the way the API server would, so it carries a uid
pub async fn stored_site(cluster: &InMemoryCluster, spec: WordpressSpec) -> Wordpress {
    let site = Wordpress {
        metadata: ObjectMeta {
            name: Some(NAME.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            generation: Some(1),
            ..Default::default()
        },
        spec,
        status: None,
    };
    cluster.create(&site).await.expect("create site")
}

pub async fn reload_site(cluster: &InMemoryCluster) -> Wordpress {
    cluster
        .get(&site_key())
        .await
        .expect("get site")
        .expect("site exists")
}

/// Replace the stored site's spec and bump its generation
pub async fn update_site_spec(cluster: &InMemoryCluster, spec: WordpressSpec) -> Wordpress {
    let mut site = reload_site(cluster).await;
    site.spec = spec;
    site.metadata.generation = site.metadata.generation.map(|g| g + 1);
    cluster.replace(&site).await.expect("replace site")
}
