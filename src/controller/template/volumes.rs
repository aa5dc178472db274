//! Code and media volumes.
//!
//! One volume per configured source, chosen by the precedence already applied in
//! the resolver. Unconfigured sources produce nothing. Object storage media has
//! no volume either; rclone sidecars serve it.

use super::env::{upsert_volume, upsert_volume_mount_by_path};
use crate::constants::{CODE_SRC_MOUNT_PATH, CODE_VOLUME_NAME, MEDIA_VOLUME_NAME};
use crate::controller::identity::Component;
use crate::controller::resolver::{CodeSource, EffectiveSpec, MediaSource};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaimVolumeSource, Volume, VolumeMount,
};

fn claim_volume(name: &str, claim_name: String) -> Volume {
    Volume {
        name: name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name,
            read_only: None,
        }),
        ..Default::default()
    }
}

pub fn code_volume(spec: &EffectiveSpec) -> Option<Volume> {
    let code = spec.code.as_ref()?;
    let volume = match &code.source {
        CodeSource::Git(git) => Volume {
            name: CODE_VOLUME_NAME.to_string(),
            empty_dir: Some(git.empty_dir.clone().unwrap_or_default()),
            ..Default::default()
        },
        CodeSource::PersistentVolumeClaim(_) => {
            claim_volume(CODE_VOLUME_NAME, spec.component_name(Component::CodePvc))
        }
        CodeSource::HostPath(host_path) => Volume {
            name: CODE_VOLUME_NAME.to_string(),
            host_path: Some(host_path.clone()),
            ..Default::default()
        },
        CodeSource::EmptyDir(empty_dir) => Volume {
            name: CODE_VOLUME_NAME.to_string(),
            empty_dir: Some(empty_dir.clone()),
            ..Default::default()
        },
    };
    Some(volume)
}

pub fn media_volume(spec: &EffectiveSpec) -> Option<Volume> {
    let media = spec.media.as_ref()?;
    match &media.source {
        MediaSource::S3(_) | MediaSource::Gcs(_) => None,
        MediaSource::PersistentVolumeClaim(_) => Some(claim_volume(
            MEDIA_VOLUME_NAME,
            spec.component_name(Component::MediaPvc),
        )),
        MediaSource::HostPath(host_path) => Some(Volume {
            name: MEDIA_VOLUME_NAME.to_string(),
            host_path: Some(host_path.clone()),
            ..Default::default()
        }),
        MediaSource::EmptyDir(empty_dir) => Some(Volume {
            name: MEDIA_VOLUME_NAME.to_string(),
            empty_dir: Some(empty_dir.clone()),
            ..Default::default()
        }),
    }
}

/// Extra site volumes followed by the code and media volumes
pub fn volumes(spec: &EffectiveSpec) -> Vec<Volume> {
    [code_volume(spec), media_volume(spec)]
        .into_iter()
        .flatten()
        .fold(spec.volumes.clone(), upsert_volume)
}

/// Mounts for the primary container
///
/// The code volume is mounted twice: raw at the source path and at the content
/// path (optionally a sub-path of it). Media is mounted once at its uploads path.
pub fn volume_mounts(spec: &EffectiveSpec) -> Vec<VolumeMount> {
    let mut mounts = Vec::new();
    if let Some(code) = &spec.code {
        mounts.push(VolumeMount {
            name: CODE_VOLUME_NAME.to_string(),
            mount_path: CODE_SRC_MOUNT_PATH.to_string(),
            read_only: code.read_only.then_some(true),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: CODE_VOLUME_NAME.to_string(),
            mount_path: code.mount_path.clone(),
            read_only: code.read_only.then_some(true),
            sub_path: code.content_sub_path.clone(),
            ..Default::default()
        });
    }
    if let Some(media) = spec
        .media
        .as_ref()
        .filter(|m| !m.source.is_object_storage())
    {
        mounts.push(VolumeMount {
            name: MEDIA_VOLUME_NAME.to_string(),
            mount_path: media.mount_path.clone(),
            read_only: media.read_only.then_some(true),
            sub_path: media.sub_path.clone(),
            ..Default::default()
        });
    }
    mounts
        .into_iter()
        .fold(spec.volume_mounts.clone(), upsert_volume_mount_by_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::resolver::resolve;
    use crate::crd::{
        CodeVolumeSpec, GitVolumeSource, MediaVolumeSpec, ObjectStorageVolumeSource, RouteSpec,
        Wordpress, WordpressSpec,
    };
    use k8s_openapi::api::core::v1::{HostPathVolumeSource, PersistentVolumeClaimSpec};
    use kube::api::ObjectMeta;

    fn effective(spec: WordpressSpec) -> EffectiveSpec {
        let site = Wordpress {
            metadata: ObjectMeta {
                name: Some("blog".to_string()),
                namespace: Some("sites".to_string()),
                ..Default::default()
            },
            spec: WordpressSpec {
                routes: vec![RouteSpec {
                    domain: "blog.example.com".to_string(),
                    path: None,
                }],
                ..spec
            },
            status: None,
        };
        resolve(&site, None).expect("resolves")
    }

    #[test]
    fn test_no_sources_no_volumes() {
        let spec = effective(WordpressSpec::default());
        assert!(volumes(&spec).is_empty());
        assert!(volume_mounts(&spec).is_empty());
    }

    #[test]
    fn test_git_code_is_empty_dir_mounted_twice() {
        let spec = effective(WordpressSpec {
            code: Some(CodeVolumeSpec {
                git: Some(GitVolumeSource {
                    repository: "https://example.com/repo.git".to_string(),
                    ..Default::default()
                }),
                content_sub_path: Some("wp-content".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        let vols = volumes(&spec);
        assert_eq!(vols.len(), 1);
        assert!(vols[0].empty_dir.is_some());

        let mounts = volume_mounts(&spec);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].mount_path, CODE_SRC_MOUNT_PATH);
        assert_eq!(mounts[1].mount_path, "/var/www/html/wp-content");
        assert_eq!(mounts[1].sub_path.as_deref(), Some("wp-content"));
    }

    #[test]
    fn test_claim_volumes_reference_component_names() {
        let spec = effective(WordpressSpec {
            code: Some(CodeVolumeSpec {
                persistent_volume_claim: Some(PersistentVolumeClaimSpec::default()),
                host_path: Some(HostPathVolumeSource {
                    path: "/ignored".to_string(),
                    type_: None,
                }),
                ..Default::default()
            }),
            media: Some(MediaVolumeSpec {
                persistent_volume_claim: Some(PersistentVolumeClaimSpec::default()),
                ..Default::default()
            }),
            ..Default::default()
        });
        let vols = volumes(&spec);
        let claims: Vec<_> = vols
            .iter()
            .filter_map(|v| v.persistent_volume_claim.as_ref())
            .map(|c| c.claim_name.as_str())
            .collect();
        assert_eq!(claims, vec!["blog-code", "blog-media"]);
        assert!(vols.iter().all(|v| v.host_path.is_none()));
    }

    #[test]
    fn test_object_storage_media_has_no_volume() {
        let spec = effective(WordpressSpec {
            media: Some(MediaVolumeSpec {
                s3: Some(ObjectStorageVolumeSource {
                    bucket: "media".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(media_volume(&spec).is_none());
        assert!(volume_mounts(&spec).is_empty());
    }

    #[test]
    fn test_site_mount_on_same_path_is_replaced() {
        let spec = effective(WordpressSpec {
            media: Some(MediaVolumeSpec::default()),
            volume_mounts: vec![VolumeMount {
                name: "custom".to_string(),
                mount_path: "/var/www/html/wp-content/uploads".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });
        let mounts = volume_mounts(&spec);
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].name, MEDIA_VOLUME_NAME);
    }
}
