//! # Volume Sources
//!
//! Code and media sources. Several sources may be set at once; the resolver
//! picks one by fixed precedence:
//!
//! - code: `git` > `persistentVolumeClaim` > `hostPath` > `emptyDir`
//! - media: `s3` > `gcs` > `persistentVolumeClaim` > `hostPath` > `emptyDir`

use k8s_openapi::api::core::v1::{
    EmptyDirVolumeSource, EnvFromSource, EnvVar, HostPathVolumeSource, PersistentVolumeClaimSpec,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source of wp-content (themes, plugins, mu-plugins)
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeVolumeSpec {
    /// Clone a git repository into an emptyDir on pod start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitVolumeSource>,
    /// Keep code on a PersistentVolumeClaim named `<site>-code`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_path: Option<HostPathVolumeSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolumeSource>,
    #[serde(default)]
    pub read_only: bool,
    /// Defaults to `/var/www/html/wp-content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    /// Sub-path of the code volume mounted at `mountPath`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sub_path: Option<String>,
    /// Labels for the generated claim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations for the generated claim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitVolumeSource {
    pub repository: String,
    /// Branch, tag or commit to check out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Extra environment for the clone container (e.g. `SSH_RSA_PRIVATE_KEY`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<EnvFromSource>,
    /// Custom emptyDir backing the clone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolumeSource>,
}

/// Source of wp-content/uploads
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaVolumeSpec {
    /// Serve media from an S3 bucket through rclone sidecars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<ObjectStorageVolumeSource>,
    /// Serve media from a GCS bucket through rclone sidecars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs: Option<ObjectStorageVolumeSource>,
    /// Keep media on a PersistentVolumeClaim named `<site>-media`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_path: Option<HostPathVolumeSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolumeSource>,
    #[serde(default)]
    pub read_only: bool,
    /// Defaults to `<code mount path>/uploads`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    /// Labels for the generated claim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations for the generated claim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Bucket reference for S3 or GCS backed media
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorageVolumeSource {
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    /// Credentials and rclone settings (`RCLONE_CONFIG_S3_*`, `RCLONE_CONFIG_GS_*`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}
