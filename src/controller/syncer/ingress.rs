use super::{merge_annotations, merge_labels, Syncer};
use crate::constants::{ANNOTATION_INGRESS_CLASS, HTTP_PORT_NAME};
use crate::controller::error::SyncError;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::resolver::EffectiveSpec;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressTLS, ServiceBackendPort,
};
use std::sync::Arc;

const DEFAULT_PATH: &str = "/";
const PATH_TYPE: &str = "ImplementationSpecific";

/// Add or update the `(host, path)` pair in `rules`
///
/// A new host gets a new rule at the end, a new path is appended to its host's
/// rule, a known path only gets its backend replaced. Nothing is ever removed
/// and unrelated rules keep their order and content.
pub fn upsert_path(
    mut rules: Vec<IngressRule>,
    host: &str,
    path: &str,
    backend: &IngressBackend,
) -> Vec<IngressRule> {
    let path = if path.is_empty() { DEFAULT_PATH } else { path };

    let index = match rules.iter().position(|r| r.host.as_deref() == Some(host)) {
        Some(index) => index,
        None => {
            rules.push(IngressRule {
                host: Some(host.to_string()),
                http: None,
            });
            rules.len() - 1
        }
    };

    if let Some(rule) = rules.get_mut(index) {
        let http = rule.http.get_or_insert_with(HTTPIngressRuleValue::default);
        match http
            .paths
            .iter_mut()
            .find(|p| p.path.as_deref() == Some(path))
        {
            Some(existing) => existing.backend = backend.clone(),
            None => http.paths.push(HTTPIngressPath {
                path: Some(path.to_string()),
                path_type: PATH_TYPE.to_string(),
                backend: backend.clone(),
            }),
        }
    }
    rules
}

/// Routing rules for every site route
#[derive(Debug)]
pub struct IngressSyncer {
    spec: Arc<EffectiveSpec>,
    ingress_class: Option<String>,
}

impl IngressSyncer {
    pub fn new(spec: Arc<EffectiveSpec>, ingress_class: Option<String>) -> Self {
        Self {
            spec,
            ingress_class,
        }
    }

    fn backend(&self) -> IngressBackend {
        IngressBackend {
            service: Some(IngressServiceBackend {
                name: self.spec.component_name(Component::Service),
                port: Some(ServiceBackendPort {
                    name: Some(HTTP_PORT_NAME.to_string()),
                    number: None,
                }),
            }),
            resource: None,
        }
    }
}

impl Syncer for IngressSyncer {
    type Object = Ingress;

    fn key(&self) -> ObjectKey {
        self.spec.component_key(Component::Ingress)
    }

    fn transform(&self, mut existing: Ingress) -> Result<Ingress, SyncError> {
        let spec = &self.spec;
        merge_labels(
            &mut existing.metadata,
            spec.component_labels(Component::Ingress),
        );
        let mut annotations = spec.ingress_annotations.clone();
        if let Some(class) = self.ingress_class.as_ref().filter(|c| !c.is_empty()) {
            annotations.insert(ANNOTATION_INGRESS_CLASS.to_string(), class.clone());
        }
        merge_annotations(&mut existing.metadata, annotations);

        let backend = self.backend();
        let mut ingress = existing.spec.take().unwrap_or_default();
        let rules = spec
            .routes
            .iter()
            .fold(ingress.rules.take().unwrap_or_default(), |rules, route| {
                upsert_path(rules, &route.domain, &route.path, &backend)
            });
        ingress.rules = Some(rules);

        ingress.tls = spec.tls_secret_ref.as_ref().map(|secret| {
            let mut hosts: Vec<String> = Vec::with_capacity(spec.routes.len());
            for route in &spec.routes {
                if !hosts.contains(&route.domain) {
                    hosts.push(route.domain.clone());
                }
            }
            vec![IngressTLS {
                hosts: Some(hosts),
                secret_name: Some(secret.clone()),
            }]
        });

        existing.spec = Some(ingress);
        Ok(existing)
    }
}
