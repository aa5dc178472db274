use super::{merge_labels, Syncer};
use crate::controller::error::SyncError;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::merge::merge_into;
use crate::controller::resolver::EffectiveSpec;
use crate::controller::template::web_pod_template;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::sync::Arc;

/// Web Deployment
#[derive(Debug)]
pub struct DeploymentSyncer {
    spec: Arc<EffectiveSpec>,
}

impl DeploymentSyncer {
    pub fn new(spec: Arc<EffectiveSpec>) -> Self {
        Self { spec }
    }
}

impl Syncer for DeploymentSyncer {
    type Object = Deployment;

    fn key(&self) -> ObjectKey {
        self.spec.component_key(Component::Deployment)
    }

    fn transform(&self, mut existing: Deployment) -> Result<Deployment, SyncError> {
        let spec = &self.spec;
        merge_labels(
            &mut existing.metadata,
            spec.component_labels(Component::Deployment),
        );

        let selector = LabelSelector {
            match_labels: Some(spec.web_pod_labels()),
            match_expressions: None,
        };
        let mut deployment = existing.spec.take().unwrap_or_default();
        if existing.metadata.creation_timestamp.is_none() {
            deployment.selector = selector;
        } else if deployment.selector != selector {
            return Err(SyncError::ImmutableField {
                kind: "Deployment",
                name: spec.component_name(Component::Deployment),
                field: "spec.selector",
            });
        }

        deployment.template = merge_into(&deployment.template, &web_pod_template(spec))
            .map_err(|source| SyncError::Merge {
                kind: "Deployment",
                source,
            })?;
        deployment.replicas = Some(spec.replicas);
        if let Some(strategy) = &spec.deployment_strategy {
            deployment.strategy = Some(strategy.clone());
        }

        existing.spec = Some(deployment);
        Ok(existing)
    }
}
