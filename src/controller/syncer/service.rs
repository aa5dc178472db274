use super::{merge_labels, Syncer};
use crate::constants::{HTTP_PORT_NAME, SERVICE_HTTP_PORT};
use crate::controller::error::SyncError;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::merge::merge_into;
use crate::controller::resolver::EffectiveSpec;
use k8s_openapi::api::core::v1::{Service, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::sync::Arc;

/// Web Service
///
/// The runtime (or site) service spec is merged over the live one. The selector
/// is frozen after creation and the cluster-assigned IPs are carried over.
#[derive(Debug)]
pub struct ServiceSyncer {
    spec: Arc<EffectiveSpec>,
}

impl ServiceSyncer {
    pub fn new(spec: Arc<EffectiveSpec>) -> Self {
        Self { spec }
    }
}

fn merge_error(source: serde_json::Error) -> SyncError {
    SyncError::Merge {
        kind: "Service",
        source,
    }
}

impl Syncer for ServiceSyncer {
    type Object = Service;

    fn key(&self) -> ObjectKey {
        self.spec.component_key(Component::Service)
    }

    fn transform(&self, mut existing: Service) -> Result<Service, SyncError> {
        let spec = &self.spec;
        merge_labels(
            &mut existing.metadata,
            spec.component_labels(Component::Service),
        );

        let mut service = existing.spec.take().unwrap_or_default();
        let cluster_ip = service.cluster_ip.clone();
        let cluster_ips = service.cluster_ips.clone();
        let current_ports = service.ports.take().unwrap_or_default();

        if let Some(overlay) = &spec.service_spec {
            service = merge_into(&service, overlay).map_err(merge_error)?;
        }

        let selector = spec.web_pod_labels();
        if existing.metadata.creation_timestamp.is_none() {
            service.selector = Some(selector);
        } else if service.selector.as_ref() != Some(&selector) {
            return Err(SyncError::ImmutableField {
                kind: "Service",
                name: spec.component_name(Component::Service),
                field: "spec.selector",
            });
        }

        let ports = vec![ServicePort {
            name: Some(HTTP_PORT_NAME.to_string()),
            port: SERVICE_HTTP_PORT,
            target_port: Some(IntOrString::String(HTTP_PORT_NAME.to_string())),
            ..Default::default()
        }];
        service.ports = Some(merge_into(&current_ports, &ports).map_err(merge_error)?);

        if cluster_ip.as_deref().is_some_and(|ip| !ip.is_empty()) {
            service.cluster_ip = cluster_ip;
            service.cluster_ips = cluster_ips;
        }

        existing.spec = Some(service);
        Ok(existing)
    }
}
