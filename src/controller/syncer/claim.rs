use super::{merge_annotations, merge_labels, Syncer};
use crate::controller::error::SyncError;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::resolver::{CodeSource, EffectiveSpec, MediaSource};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, PersistentVolumeClaimSpec};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Code or media PersistentVolumeClaim
///
/// The claim spec is written once. After that only labels and annotations follow
/// the site.
#[derive(Debug)]
pub struct ClaimSyncer {
    spec: Arc<EffectiveSpec>,
    component: Component,
}

impl ClaimSyncer {
    /// `component` is [`Component::CodePvc`] or [`Component::MediaPvc`]
    pub fn new(spec: Arc<EffectiveSpec>, component: Component) -> Self {
        Self { spec, component }
    }

    fn volume_kind(&self) -> &'static str {
        self.component.logical_name()
    }

    /// Desired claim spec with the claim's own labels and annotations
    fn claim(
        &self,
    ) -> Option<(
        &PersistentVolumeClaimSpec,
        &BTreeMap<String, String>,
        &BTreeMap<String, String>,
    )> {
        match self.component {
            Component::CodePvc => self.spec.code.as_ref().and_then(|code| match &code.source {
                CodeSource::PersistentVolumeClaim(claim) => {
                    Some((claim, &code.claim_labels, &code.claim_annotations))
                }
                _ => None,
            }),
            Component::MediaPvc => self.spec.media.as_ref().and_then(|media| match &media.source {
                MediaSource::PersistentVolumeClaim(claim) => {
                    Some((claim, &media.claim_labels, &media.claim_annotations))
                }
                _ => None,
            }),
            _ => None,
        }
    }
}

impl Syncer for ClaimSyncer {
    type Object = PersistentVolumeClaim;

    fn key(&self) -> ObjectKey {
        self.spec.component_key(self.component)
    }

    fn transform(
        &self,
        mut existing: PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, SyncError> {
        let (claim, labels, annotations) = self
            .claim()
            .ok_or(SyncError::MissingVolumeSource(self.volume_kind()))?;

        let mut all_labels = self.spec.component_labels(self.component);
        all_labels.extend(labels.clone());
        merge_labels(&mut existing.metadata, all_labels);
        merge_annotations(&mut existing.metadata, annotations.clone());

        let written = existing
            .spec
            .as_ref()
            .is_some_and(|s| *s != PersistentVolumeClaimSpec::default());
        if !written {
            existing.spec = Some(claim.clone());
        }
        Ok(existing)
    }
}
