//! # WordpressRuntime
//!
//! Cluster-scoped defaults shared by many sites. Consulted only for fields a
//! site leaves unset.

use super::volume::{CodeVolumeSpec, MediaVolumeSpec};
use k8s_openapi::api::core::v1::ServiceSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "WordpressRuntime",
    group = "wordpress.presslabs.org",
    version = "v1alpha1",
    shortname = "wprt",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct WordpressRuntimeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_image_pull_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_volume_spec: Option<CodeVolumeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_volume_spec: Option<MediaVolumeSpec>,
    /// Annotations applied to every site Ingress; site annotations win on conflict
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingress_annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_spec: Option<ServiceSpec>,
}
