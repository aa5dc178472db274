use super::{merge_annotations, merge_labels, Syncer};
use crate::constants::{ANNOTATION_UPGRADE_IMAGE, UPGRADE_ACTIVE_DEADLINE_SECS};
use crate::controller::error::SyncError;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::resolver::EffectiveSpec;
use crate::controller::template::job_pod_template;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const UPGRADE_COMMAND: [&str; 3] = [
    "/bin/sh",
    "-c",
    "wp core update-db --network || wp core update-db && wp cache flush",
];

/// Database migration Job, one per image version
///
/// A job that already exists is returned untouched whatever its outcome; a
/// failed migration is not retried until the image changes.
#[derive(Debug)]
pub struct DbUpgradeSyncer {
    spec: Arc<EffectiveSpec>,
}

impl DbUpgradeSyncer {
    pub fn new(spec: Arc<EffectiveSpec>) -> Self {
        Self { spec }
    }
}

impl Syncer for DbUpgradeSyncer {
    type Object = Job;

    fn key(&self) -> ObjectKey {
        self.spec.component_key(Component::DbUpgrade)
    }

    fn transform(&self, mut existing: Job) -> Result<Job, SyncError> {
        if existing.metadata.creation_timestamp.is_some() {
            return Ok(existing);
        }

        let spec = &self.spec;
        merge_labels(
            &mut existing.metadata,
            spec.component_labels(Component::DbUpgrade),
        );
        merge_annotations(
            &mut existing.metadata,
            BTreeMap::from([(ANNOTATION_UPGRADE_IMAGE.to_string(), spec.image_ref())]),
        );
        existing.spec = Some(JobSpec {
            backoff_limit: Some(0),
            active_deadline_seconds: Some(UPGRADE_ACTIVE_DEADLINE_SECS),
            template: job_pod_template(spec, &UPGRADE_COMMAND),
            ..Default::default()
        });
        Ok(existing)
    }
}
