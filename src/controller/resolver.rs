//! # Spec Resolver
//!
//! Merges a `Wordpress` spec over the optional `WordpressRuntime` defaults into an
//! [`EffectiveSpec`]: every optional field populated, volume sources collapsed to
//! exactly one variant. The effective spec lives for a single reconciliation and
//! is never persisted.
//!
//! Rules, applied per field:
//! - image, tag, pull policy: site value if non-empty, else runtime default, else constant
//! - code and media volume specs: site wins, else runtime; neither means no volume
//! - mount paths default to the conventional wp-content / uploads locations
//! - replicas default to 1 when unset or below 1

use super::error::SyncError;
use crate::constants::{
    APP_NAME, DEFAULT_CODE_MOUNT_PATH, DEFAULT_IMAGE, DEFAULT_IMAGE_PULL_POLICY,
    DEFAULT_MEDIA_SUB_DIR, DEFAULT_TAG, LABEL_PART_OF,
};
use crate::crd::{
    BootstrapSpec, CodeVolumeSpec, GitVolumeSource, MediaVolumeSpec, ObjectStorageVolumeSource,
    Wordpress, WordpressRuntimeSpec,
};
use k8s_openapi::api::apps::v1::DeploymentStrategy;
use k8s_openapi::api::core::v1::{
    Affinity, EmptyDirVolumeSource, EnvFromSource, EnvVar, HostPathVolumeSource,
    LocalObjectReference, PersistentVolumeClaimSpec, ResourceRequirements, ServiceSpec,
    Toleration, Volume, VolumeMount,
};
use std::collections::BTreeMap;

/// One served route with its path kept as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub domain: String,
    pub path: String,
}

/// Where wp-content comes from, after precedence is applied
#[derive(Debug, Clone, PartialEq)]
pub enum CodeSource {
    Git(GitVolumeSource),
    PersistentVolumeClaim(PersistentVolumeClaimSpec),
    HostPath(HostPathVolumeSource),
    EmptyDir(EmptyDirVolumeSource),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCode {
    pub source: CodeSource,
    pub read_only: bool,
    pub mount_path: String,
    pub content_sub_path: Option<String>,
    pub claim_labels: BTreeMap<String, String>,
    pub claim_annotations: BTreeMap<String, String>,
}

/// Where wp-content/uploads comes from, after precedence is applied
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    S3(ObjectStorageVolumeSource),
    Gcs(ObjectStorageVolumeSource),
    PersistentVolumeClaim(PersistentVolumeClaimSpec),
    HostPath(HostPathVolumeSource),
    EmptyDir(EmptyDirVolumeSource),
}

impl MediaSource {
    /// Object storage media is served by rclone sidecars instead of a volume
    pub fn is_object_storage(&self) -> bool {
        matches!(self, Self::S3(_) | Self::Gcs(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMedia {
    pub source: MediaSource,
    pub read_only: bool,
    pub mount_path: String,
    pub sub_path: Option<String>,
    pub claim_labels: BTreeMap<String, String>,
    pub claim_annotations: BTreeMap<String, String>,
}

/// Fully resolved site specification
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSpec {
    pub name: String,
    pub namespace: String,
    pub part_of: String,
    /// Never empty; the first route is canonical
    pub routes: Vec<Route>,
    pub tls_secret_ref: Option<String>,
    pub image: String,
    pub tag: String,
    pub image_pull_policy: String,
    pub image_pull_secrets: Vec<LocalObjectReference>,
    pub service_account_name: Option<String>,
    pub code: Option<ResolvedCode>,
    pub media: Option<ResolvedMedia>,
    pub volumes: Vec<Volume>,
    pub volume_mounts: Vec<VolumeMount>,
    pub env: Vec<EnvVar>,
    pub env_from: Vec<EnvFromSource>,
    pub resources: Option<ResourceRequirements>,
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Toleration>,
    pub affinity: Option<Affinity>,
    pub priority_class_name: Option<String>,
    pub bootstrap: Option<BootstrapSpec>,
    pub deployment_strategy: Option<DeploymentStrategy>,
    pub replicas: i32,
    pub ingress_annotations: BTreeMap<String, String>,
    pub service_spec: Option<ServiceSpec>,
}

/// Resolve a site over optional runtime defaults
///
/// Never contacts the cluster. Fails only on malformed required fields.
pub fn resolve(
    site: &Wordpress,
    runtime: Option<&WordpressRuntimeSpec>,
) -> Result<EffectiveSpec, SyncError> {
    let name = site
        .metadata
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SyncError::Validation("site has no name".to_string()))?;
    let namespace = site
        .metadata
        .namespace
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SyncError::Validation(format!("site {name} has no namespace")))?;

    let spec = &site.spec;
    if spec.routes.is_empty() {
        return Err(SyncError::Validation(format!(
            "site {namespace}/{name} must declare at least one route"
        )));
    }
    let mut routes = Vec::with_capacity(spec.routes.len());
    for route in &spec.routes {
        let domain = route.domain.trim();
        if domain.is_empty() {
            return Err(SyncError::Validation(format!(
                "site {namespace}/{name} has a route with an empty domain"
            )));
        }
        routes.push(Route {
            domain: domain.to_string(),
            path: route.path.clone().unwrap_or_default(),
        });
    }

    let part_of = site
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(LABEL_PART_OF))
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| APP_NAME.to_string());

    let image = first_non_empty(
        spec.image.as_deref(),
        runtime.and_then(|rt| rt.default_image.as_deref()),
        DEFAULT_IMAGE,
    );
    let tag = first_non_empty(
        spec.tag.as_deref(),
        runtime.and_then(|rt| rt.default_tag.as_deref()),
        DEFAULT_TAG,
    );
    let image_pull_policy = first_non_empty(
        spec.image_pull_policy.as_deref(),
        runtime.and_then(|rt| rt.default_image_pull_policy.as_deref()),
        DEFAULT_IMAGE_PULL_POLICY,
    );

    let code_spec = spec
        .code
        .as_ref()
        .or_else(|| runtime.and_then(|rt| rt.code_volume_spec.as_ref()));
    let code = code_spec.map(resolve_code);

    let content_mount = code
        .as_ref()
        .map_or(DEFAULT_CODE_MOUNT_PATH, |c| c.mount_path.as_str());
    let media_spec = spec
        .media
        .as_ref()
        .or_else(|| runtime.and_then(|rt| rt.media_volume_spec.as_ref()));
    let media = media_spec.map(|m| resolve_media(m, content_mount));

    let mut ingress_annotations = runtime
        .map(|rt| rt.ingress_annotations.clone())
        .unwrap_or_default();
    ingress_annotations.extend(spec.ingress_annotations.clone());

    let service_spec = spec
        .service_spec
        .clone()
        .or_else(|| runtime.and_then(|rt| rt.service_spec.clone()));

    Ok(EffectiveSpec {
        name,
        namespace,
        part_of,
        routes,
        tls_secret_ref: spec.tls_secret_ref.clone().filter(|s| !s.is_empty()),
        image,
        tag,
        image_pull_policy,
        image_pull_secrets: spec.image_pull_secrets.clone(),
        service_account_name: spec.service_account_name.clone().filter(|s| !s.is_empty()),
        code,
        media,
        volumes: spec.volumes.clone(),
        volume_mounts: spec.volume_mounts.clone(),
        env: spec.env.clone(),
        env_from: spec.env_from.clone(),
        resources: spec.resources.clone(),
        node_selector: spec.node_selector.clone(),
        tolerations: spec.tolerations.clone(),
        affinity: spec.affinity.clone(),
        priority_class_name: spec.priority_class_name.clone().filter(|s| !s.is_empty()),
        bootstrap: spec.bootstrap.clone(),
        deployment_strategy: spec.deployment_strategy.clone(),
        replicas: spec.replicas.filter(|r| *r >= 1).unwrap_or(1),
        ingress_annotations,
        service_spec,
    })
}

fn first_non_empty(site: Option<&str>, runtime: Option<&str>, fallback: &str) -> String {
    site.filter(|s| !s.is_empty())
        .or_else(|| runtime.filter(|s| !s.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

fn resolve_code(spec: &CodeVolumeSpec) -> ResolvedCode {
    let source = if let Some(git) = &spec.git {
        CodeSource::Git(git.clone())
    } else if let Some(claim) = &spec.persistent_volume_claim {
        CodeSource::PersistentVolumeClaim(claim.clone())
    } else if let Some(host_path) = &spec.host_path {
        CodeSource::HostPath(host_path.clone())
    } else {
        CodeSource::EmptyDir(spec.empty_dir.clone().unwrap_or_default())
    };

    ResolvedCode {
        source,
        read_only: spec.read_only,
        mount_path: spec
            .mount_path
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_CODE_MOUNT_PATH.to_string()),
        content_sub_path: spec.content_sub_path.clone().filter(|p| !p.is_empty()),
        claim_labels: spec.labels.clone(),
        claim_annotations: spec.annotations.clone(),
    }
}

fn resolve_media(spec: &MediaVolumeSpec, content_mount: &str) -> ResolvedMedia {
    let source = if let Some(s3) = &spec.s3 {
        MediaSource::S3(s3.clone())
    } else if let Some(gcs) = &spec.gcs {
        MediaSource::Gcs(gcs.clone())
    } else if let Some(claim) = &spec.persistent_volume_claim {
        MediaSource::PersistentVolumeClaim(claim.clone())
    } else if let Some(host_path) = &spec.host_path {
        MediaSource::HostPath(host_path.clone())
    } else {
        MediaSource::EmptyDir(spec.empty_dir.clone().unwrap_or_default())
    };

    ResolvedMedia {
        source,
        read_only: spec.read_only,
        mount_path: spec
            .mount_path
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| {
                format!("{}/{DEFAULT_MEDIA_SUB_DIR}", content_mount.trim_end_matches('/'))
            }),
        sub_path: spec.sub_path.clone().filter(|p| !p.is_empty()),
        claim_labels: spec.labels.clone(),
        claim_annotations: spec.annotations.clone(),
    }
}
