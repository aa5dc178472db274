//! Containers shared by the web and job pod templates.

use super::env::upsert_env_vars;
use super::volumes::volume_mounts;
use crate::constants::{
    CODE_SRC_MOUNT_PATH, CODE_VOLUME_NAME, GIT_CLONE_IMAGE, GIT_CONTAINER_NAME,
    INSTALL_CONTAINER_NAME, MEDIA_FTP_PORT, MEDIA_HTTP_PORT, RCLONE_IMAGE, WWW_DATA_USER_ID,
};
use crate::controller::identity::{join_url_path, Component};
use crate::controller::resolver::{CodeSource, EffectiveSpec, MediaSource};
use crate::crd::{BootstrapSpec, GitVolumeSource, ObjectStorageVolumeSource};
use k8s_openapi::api::core::v1::{
    Container, EnvFromSource, EnvVar, SecretEnvSource, SecurityContext, VolumeMount,
};

const GIT_CLONE_SCRIPT: &str = r#"#!/bin/bash
set -e
set -o pipefail

export HOME="$(mktemp -d)"
export GIT_SSH_COMMAND="ssh -o UserKnownHostsFile=$HOME/.ssh/known_hosts -o StrictHostKeyChecking=no"

test -d "$HOME/.ssh" || mkdir "$HOME/.ssh"

if [ ! -z "$SSH_RSA_PRIVATE_KEY" ] ; then
    echo "$SSH_RSA_PRIVATE_KEY" > "$HOME/.ssh/id_rsa"
    chmod 0400 "$HOME/.ssh/id_rsa"
    export GIT_SSH_COMMAND="$GIT_SSH_COMMAND -o IdentityFile=$HOME/.ssh/id_rsa"
fi

if [ -z "$GIT_CLONE_URL" ] ; then
    echo "No \$GIT_CLONE_URL specified" >&2
    exit 1
fi

find "$SRC_DIR" -maxdepth 1 -mindepth 1 -print0 | xargs -0 /bin/rm -rf

set -x
git clone "$GIT_CLONE_URL" "$SRC_DIR"
cd "$SRC_DIR"
if [ ! -z "$GIT_CLONE_REF" ] ; then
    git checkout -B "$GIT_CLONE_REF" "$GIT_CLONE_REF"
fi
"#;

const INSTALL_SCRIPT: &str = r#"set -e
if wp core is-installed ; then
    exit 0
fi
wp core install \
    --url="$WP_HOME" \
    --title="${WORDPRESS_BOOTSTRAP_TITLE:-WordPress}" \
    --admin_user="$WORDPRESS_BOOTSTRAP_USER" \
    --admin_password="$WORDPRESS_BOOTSTRAP_PASSWORD" \
    --admin_email="$WORDPRESS_BOOTSTRAP_EMAIL" \
    --skip-email
"#;

fn env_var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        value_from: None,
    }
}

fn object_storage(spec: &EffectiveSpec) -> Option<(&'static str, &ObjectStorageVolumeSource)> {
    match &spec.media.as_ref()?.source {
        MediaSource::S3(source) => Some(("s3", source)),
        MediaSource::Gcs(source) => Some(("gs", source)),
        _ => None,
    }
}

/// Environment of every WordPress container
///
/// Site env vars are upserted last so they can override the derived ones.
pub fn wordpress_env(spec: &EffectiveSpec) -> Vec<EnvVar> {
    let mut env = Vec::new();
    if object_storage(spec).is_some() {
        env.push(env_var("UPLOADS_FTP_HOST", format!("127.0.0.1:{MEDIA_FTP_PORT}")));
        env.push(env_var("UPLOADS_HTTP_PROXY", format!("127.0.0.1:{MEDIA_HTTP_PORT}")));
    }
    env.push(env_var("WP_HOME", spec.home_url(&[])));
    env.push(env_var("WP_SITEURL", spec.site_url(&[])));
    upsert_env_vars(env, spec.env.clone())
}

/// The generated site secret, always first, then the site's own sources
pub fn wordpress_env_from(spec: &EffectiveSpec) -> Vec<EnvFromSource> {
    let mut out = vec![EnvFromSource {
        secret_ref: Some(SecretEnvSource {
            name: spec.component_name(Component::Secret),
            optional: None,
        }),
        ..Default::default()
    }];
    out.extend(spec.env_from.iter().cloned());
    out
}

fn git_clone_container(git: &GitVolumeSource) -> Container {
    let mut env = vec![
        env_var("GIT_CLONE_URL", git.repository.clone()),
        env_var("SRC_DIR", CODE_SRC_MOUNT_PATH),
    ];
    if let Some(reference) = git.reference.as_deref().filter(|r| !r.is_empty()) {
        env.push(env_var("GIT_CLONE_REF", reference));
    }

    Container {
        name: GIT_CONTAINER_NAME.to_string(),
        image: Some(GIT_CLONE_IMAGE.to_string()),
        args: Some(vec![
            "/bin/bash".to_string(),
            "-c".to_string(),
            GIT_CLONE_SCRIPT.to_string(),
        ]),
        env: Some(upsert_env_vars(env, git.env.clone())),
        env_from: (!git.env_from.is_empty()).then(|| git.env_from.clone()),
        volume_mounts: Some(vec![VolumeMount {
            name: CODE_VOLUME_NAME.to_string(),
            mount_path: CODE_SRC_MOUNT_PATH.to_string(),
            ..Default::default()
        }]),
        security_context: Some(SecurityContext {
            run_as_user: Some(WWW_DATA_USER_ID),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn install_container(spec: &EffectiveSpec, bootstrap: &BootstrapSpec) -> Container {
    let mut env_from = wordpress_env_from(spec);
    env_from.extend(bootstrap.env_from.iter().cloned());

    Container {
        name: INSTALL_CONTAINER_NAME.to_string(),
        image: Some(spec.image_ref()),
        image_pull_policy: Some(spec.image_pull_policy.clone()),
        args: Some(vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            INSTALL_SCRIPT.to_string(),
        ]),
        env: Some(upsert_env_vars(wordpress_env(spec), bootstrap.env.clone())),
        env_from: Some(env_from),
        volume_mounts: Some(volume_mounts(spec)),
        ..Default::default()
    }
}

fn rclone_container(
    name: &str,
    prefix: &str,
    source: &ObjectStorageVolumeSource,
    args: Vec<String>,
) -> Container {
    let bucket = format!("{prefix}:{}", source.bucket);
    let stream = format!(
        "{bucket}{}",
        join_url_path(&[source.path_prefix.as_deref().unwrap_or_default()])
    );

    Container {
        name: name.to_string(),
        image: Some(RCLONE_IMAGE.to_string()),
        args: Some(args),
        env: Some(upsert_env_vars(
            source.env.clone(),
            [env_var("RCLONE_STREAM", stream)],
        )),
        ..Default::default()
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_string()).collect()
}

/// rclone sidecars serving object storage media over FTP (writes) and HTTP (reads)
pub fn media_containers(spec: &EffectiveSpec) -> Vec<Container> {
    let Some((prefix, source)) = object_storage(spec) else {
        return Vec::new();
    };

    // writes go through the FTP server, so cache them; thumbnails are generated right after upload
    let mut ftp_args = to_args(&[
        "serve",
        "ftp",
        "-vvv",
        "--vfs-cache-max-age",
        "30s",
        "--vfs-cache-mode",
        "full",
        "--vfs-cache-poll-interval",
        "0",
        "--poll-interval",
        "0",
        "$(RCLONE_STREAM)/",
    ]);
    ftp_args.push(format!("--addr=0.0.0.0:{MEDIA_FTP_PORT}"));

    // reads are cached by another layer; buckets may be eventually consistent
    let mut http_args = to_args(&["serve", "http", "-vvv", "--dir-cache-time", "0", "$(RCLONE_STREAM)/"]);
    http_args.push(format!("--addr=0.0.0.0:{MEDIA_HTTP_PORT}"));

    vec![
        rclone_container("rclone-ftp", prefix, source, ftp_args),
        rclone_container("rclone-http", prefix, source, http_args),
    ]
}

/// Ordered init containers: git clone, uploads root for object storage, install
pub fn init_containers(spec: &EffectiveSpec) -> Vec<Container> {
    let mut containers = Vec::new();

    if let Some(CodeSource::Git(git)) = spec.code.as_ref().map(|c| &c.source) {
        containers.push(git_clone_container(git));
    }

    if let Some((prefix, source)) = object_storage(spec) {
        // the FTP server cannot create the uploads root on its own
        containers.push(rclone_container(
            "rclone-init-ftp",
            prefix,
            source,
            to_args(&["touch", "-vvv", "$(RCLONE_STREAM)/wp-content/uploads/.keep"]),
        ));
    }

    if let Some(bootstrap) = &spec.bootstrap {
        containers.push(install_container(spec, bootstrap));
    }

    containers
}
