//! # Identity
//!
//! Deterministic naming, labelling and URL helpers. The same site identity
//! always yields the same object keys and label sets.

use super::resolver::EffectiveSpec;
use crate::constants::{
    APP_NAME, LABEL_COMPONENT, LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME, LABEL_PART_OF,
    LABEL_UPGRADE_FOR, OPERATOR_NAME, VERSION_HASH_LEN,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Namespaced identity of a cluster object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced object, if it has both a name and a namespace
    pub fn of<K: kube::Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Dependent object kinds and their (logical name, name format) pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Secret,
    Deployment,
    Service,
    Ingress,
    CodePvc,
    MediaPvc,
    Cron,
    DbUpgrade,
}

impl Component {
    /// Value of the `app.kubernetes.io/component` label
    pub fn logical_name(self) -> &'static str {
        match self {
            Self::Secret | Self::Deployment | Self::Service | Self::Ingress => "web",
            Self::CodePvc => "code",
            Self::MediaPvc => "media",
            Self::Cron => "cron",
            Self::DbUpgrade => "upgrade",
        }
    }

    /// Suffix appended to the site name
    fn name_suffix(self) -> &'static str {
        match self {
            Self::Secret => "-wp",
            Self::Deployment | Self::Service | Self::Ingress => "",
            Self::CodePvc => "-code",
            Self::MediaPvc => "-media",
            Self::Cron => "-wp-cron",
            Self::DbUpgrade => "-upgrade",
        }
    }
}

/// Short stable hash of the resolved image reference
///
/// Used to salt the migration job name so every image version gets its own job.
pub fn version_hash(spec: &EffectiveSpec) -> String {
    let digest = Sha256::digest(spec.image_ref().as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(VERSION_HASH_LEN);
    hex
}

/// `path.Join`-style join that always yields an absolute path, or `""` for the root
///
/// Empty and `.` segments are dropped, `..` pops, trailing slashes disappear.
pub fn join_url_path(parts: &[&str]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in parts.iter().flat_map(|p| p.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

impl EffectiveSpec {
    /// `image:tag`, or the image alone when pinned by digest
    pub fn image_ref(&self) -> String {
        if self.image.contains('@') {
            self.image.clone()
        } else {
            format!("{}:{}", self.image, self.tag)
        }
    }

    pub fn version_hash(&self) -> String {
        version_hash(self)
    }

    pub fn component_name(&self, component: Component) -> String {
        let name = format!("{}{}", self.name, component.name_suffix());
        if component == Component::DbUpgrade {
            format!("{name}-for-{}", self.version_hash())
        } else {
            name
        }
    }

    pub fn component_key(&self, component: Component) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.component_name(component))
    }

    /// Base label set shared by every object and pod of the site
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_NAME.to_string(), APP_NAME.to_string()),
            (LABEL_PART_OF.to_string(), self.part_of.clone()),
            (LABEL_INSTANCE.to_string(), self.name.clone()),
        ])
    }

    /// Labels for a dependent object
    pub fn component_labels(&self, component: Component) -> BTreeMap<String, String> {
        let mut labels = self.labels();
        labels.insert(
            LABEL_COMPONENT.to_string(),
            component.logical_name().to_string(),
        );
        labels.insert(LABEL_MANAGED_BY.to_string(), OPERATOR_NAME.to_string());
        if component == Component::DbUpgrade {
            labels.insert(LABEL_UPGRADE_FOR.to_string(), self.version_hash());
        }
        labels
    }

    /// Labels of web pods, also the Deployment and Service selector
    pub fn web_pod_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.labels();
        labels.insert(LABEL_COMPONENT.to_string(), "web".to_string());
        labels
    }

    /// Labels of wp-cli job pods
    pub fn job_pod_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.labels();
        labels.insert(LABEL_COMPONENT.to_string(), "wp-cli".to_string());
        labels
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls_secret_ref.is_some() {
            "https"
        } else {
            "http"
        }
    }

    /// Domain of the canonical route
    pub fn main_domain(&self) -> String {
        self.routes.first().map_or_else(
            || {
                format!(
                    "{}.{}.svc",
                    self.component_name(Component::Service),
                    self.namespace
                )
            },
            |r| r.domain.clone(),
        )
    }

    /// Canonical route path joined with `sub_paths`
    pub fn url_path(&self, sub_paths: &[&str]) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(sub_paths.len() + 1);
        if let Some(route) = self.routes.first() {
            parts.push(&route.path);
        }
        parts.extend_from_slice(sub_paths);
        join_url_path(&parts)
    }

    /// `WP_HOME`, e.g. `https://example.com/blog`; never a trailing slash
    pub fn home_url(&self, sub_paths: &[&str]) -> String {
        format!(
            "{}://{}{}",
            self.scheme(),
            self.main_domain(),
            self.url_path(sub_paths)
        )
    }

    /// `WP_SITEURL`, the WordPress core location below the home URL
    pub fn site_url(&self, sub_paths: &[&str]) -> String {
        let mut parts = vec!["wp"];
        parts.extend_from_slice(sub_paths);
        self.home_url(&parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::resolver::resolve;
    use crate::crd::{RouteSpec, Wordpress, WordpressSpec};
    use kube::api::ObjectMeta;

    fn spec_with(routes: Vec<RouteSpec>, tls: Option<&str>) -> EffectiveSpec {
        let site = Wordpress {
            metadata: ObjectMeta {
                name: Some("blog".to_string()),
                namespace: Some("sites".to_string()),
                ..Default::default()
            },
            spec: WordpressSpec {
                routes,
                tls_secret_ref: tls.map(str::to_string),
                ..Default::default()
            },
            status: None,
        };
        resolve(&site, None).expect("resolves")
    }

    fn route(domain: &str, path: Option<&str>) -> RouteSpec {
        RouteSpec {
            domain: domain.to_string(),
            path: path.map(str::to_string),
        }
    }

    #[test]
    fn test_home_url_bare_domain_has_no_trailing_slash() {
        let spec = spec_with(vec![route("a.example.com", None)], None);
        assert_eq!(spec.home_url(&[]), "http://a.example.com");
    }

    #[test]
    fn test_home_url_strips_trailing_slash_of_path() {
        let spec = spec_with(vec![route("a.example.com", Some("/blog/"))], None);
        assert_eq!(spec.home_url(&[]), "http://a.example.com/blog");
    }

    #[test]
    fn test_home_url_root_path_collapses() {
        let spec = spec_with(vec![route("a.example.com", Some("/"))], None);
        assert_eq!(spec.home_url(&[]), "http://a.example.com");
    }

    #[test]
    fn test_home_url_https_with_tls() {
        let spec = spec_with(vec![route("a.example.com", None)], Some("a-tls"));
        assert_eq!(spec.home_url(&[]), "https://a.example.com");
    }

    #[test]
    fn test_only_first_route_is_canonical() {
        let spec = spec_with(
            vec![route("a.example.com", Some("/one")), route("b.example.com", None)],
            None,
        );
        assert_eq!(spec.home_url(&[]), "http://a.example.com/one");
        assert_eq!(
            spec.site_url(&["wp-cron.php"]),
            "http://a.example.com/one/wp/wp-cron.php"
        );
    }

    #[test]
    fn test_join_url_path() {
        assert_eq!(join_url_path(&["a", "b"]), "/a/b");
        assert_eq!(join_url_path(&["/a/", "/b/"]), "/a/b");
        assert_eq!(join_url_path(&["/", ""]), "");
        assert_eq!(join_url_path(&["/a/./b/../c"]), "/a/c");
    }

    #[test]
    fn test_component_names() {
        let spec = spec_with(vec![route("a.example.com", None)], None);
        assert_eq!(spec.component_name(Component::Secret), "blog-wp");
        assert_eq!(spec.component_name(Component::Deployment), "blog");
        assert_eq!(spec.component_name(Component::Cron), "blog-wp-cron");
        assert_eq!(spec.component_name(Component::CodePvc), "blog-code");
        assert_eq!(spec.component_name(Component::MediaPvc), "blog-media");
        assert_eq!(
            spec.component_name(Component::DbUpgrade),
            format!("blog-upgrade-for-{}", spec.version_hash())
        );
        assert_eq!(
            spec.component_key(Component::Service),
            ObjectKey::new("sites", "blog")
        );
    }

    #[test]
    fn test_version_hash_stability() {
        let a = spec_with(vec![route("a.example.com", None)], None);
        let mut b = spec_with(vec![route("other.example.com", None)], Some("tls"));
        assert_eq!(a.version_hash(), b.version_hash());
        assert_eq!(a.version_hash().len(), VERSION_HASH_LEN);

        b.tag = "6.4".to_string();
        assert_ne!(a.version_hash(), b.version_hash());
        assert_ne!(
            a.component_name(Component::DbUpgrade),
            b.component_name(Component::DbUpgrade)
        );
    }

    #[test]
    fn test_upgrade_labels_carry_version() {
        let spec = spec_with(vec![route("a.example.com", None)], None);
        let labels = spec.component_labels(Component::DbUpgrade);
        assert_eq!(labels[LABEL_UPGRADE_FOR], spec.version_hash());
        assert_eq!(labels[LABEL_COMPONENT], "upgrade");
        assert!(!spec
            .component_labels(Component::Deployment)
            .contains_key(LABEL_UPGRADE_FOR));
    }

    #[test]
    fn test_pod_labels_exclude_managed_by() {
        let spec = spec_with(vec![route("a.example.com", None)], None);
        assert!(!spec.web_pod_labels().contains_key(LABEL_MANAGED_BY));
        assert_eq!(spec.job_pod_labels()[LABEL_COMPONENT], "wp-cli");
    }

    #[test]
    fn test_object_key_display() {
        assert_eq!(ObjectKey::new("ns", "name").to_string(), "ns/name");
    }
}
