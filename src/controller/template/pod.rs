//! Web and job pod templates.

use super::containers::{init_containers, media_containers, wordpress_env, wordpress_env_from};
use super::volumes::{volume_mounts, volumes};
use crate::constants::{
    CLI_CONTAINER_NAME, HTTP_PORT_NAME, INTERNAL_HTTP_PORT, WEB_CONTAINER_NAME, WWW_DATA_USER_ID,
};
use crate::controller::resolver::EffectiveSpec;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSecurityContext, PodSpec, PodTemplateSpec,
};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// Primary WordPress container without the web/job specific bits
fn wordpress_container(spec: &EffectiveSpec, name: &str) -> Container {
    Container {
        name: name.to_string(),
        image: Some(spec.image_ref()),
        image_pull_policy: Some(spec.image_pull_policy.clone()),
        env: non_empty(wordpress_env(spec)),
        env_from: non_empty(wordpress_env_from(spec)),
        volume_mounts: non_empty(volume_mounts(spec)),
        ..Default::default()
    }
}

fn pod_template(
    spec: &EffectiveSpec,
    labels: BTreeMap<String, String>,
    primary: Container,
) -> PodTemplateSpec {
    let mut containers = vec![primary];
    containers.extend(media_containers(spec));

    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            init_containers: non_empty(init_containers(spec)),
            containers,
            volumes: non_empty(volumes(spec)),
            image_pull_secrets: non_empty(spec.image_pull_secrets.clone()),
            service_account_name: spec.service_account_name.clone(),
            node_selector: (!spec.node_selector.is_empty()).then(|| spec.node_selector.clone()),
            tolerations: non_empty(spec.tolerations.clone()),
            affinity: spec.affinity.clone(),
            priority_class_name: spec.priority_class_name.clone(),
            security_context: Some(PodSecurityContext {
                fs_group: Some(WWW_DATA_USER_ID),
                ..Default::default()
            }),
            ..Default::default()
        }),
    }
}

/// Pod template of the long-running web Deployment
pub fn web_pod_template(spec: &EffectiveSpec) -> PodTemplateSpec {
    let primary = Container {
        resources: spec.resources.clone(),
        ports: Some(vec![ContainerPort {
            name: Some(HTTP_PORT_NAME.to_string()),
            container_port: INTERNAL_HTTP_PORT,
            ..Default::default()
        }]),
        ..wordpress_container(spec, WEB_CONTAINER_NAME)
    };
    pod_template(spec, spec.web_pod_labels(), primary)
}

/// Pod template of a wp-cli task running `cmd`
pub fn job_pod_template(spec: &EffectiveSpec, cmd: &[&str]) -> PodTemplateSpec {
    let primary = Container {
        args: Some(cmd.iter().map(|a| (*a).to_string()).collect()),
        ..wordpress_container(spec, CLI_CONTAINER_NAME)
    };
    let mut template = pod_template(spec, spec.job_pod_labels(), primary);
    if let Some(pod) = template.spec.as_mut() {
        pod.restart_policy = Some("Never".to_string());
    }
    template
}
