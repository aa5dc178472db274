//! CRD schema and manifest parsing

use kube::core::CustomResourceExt;
use wordpress_operator::controller::resolver::resolve;
use wordpress_operator::crd::{Wordpress, WordpressRuntime};

#[test]
fn test_wordpress_crd_is_namespaced_with_status() {
    let crd = Wordpress::crd();
    assert_eq!(crd.spec.group, "wordpress.presslabs.org");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert_eq!(crd.spec.names.kind, "Wordpress");
    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    assert!(version
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());
    let columns: Vec<&str> = version
        .additional_printer_columns
        .iter()
        .flatten()
        .map(|c| c.name.as_str())
        .collect();
    assert!(columns.contains(&"Ready"));
}

#[test]
fn test_runtime_crd_is_cluster_scoped() {
    let crd = WordpressRuntime::crd();
    assert_eq!(crd.spec.scope, "Cluster");
    assert_eq!(
        crd.spec.names.short_names.as_deref(),
        Some(&["wprt".to_string()][..])
    );
}

#[test]
fn test_manifest_pair_resolves() {
    let site: Wordpress = serde_yaml::from_str(
        r"
apiVersion: wordpress.presslabs.org/v1alpha1
kind: Wordpress
metadata:
  name: news
  namespace: media
spec:
  runtime: php81
  routes:
    - domain: news.example.com
      path: /daily
",
    )
    .expect("site manifest");
    let runtime: WordpressRuntime = serde_yaml::from_str(
        r"
apiVersion: wordpress.presslabs.org/v1alpha1
kind: WordpressRuntime
metadata:
  name: php81
spec:
  defaultImage: registry.example.com/wordpress
  defaultTag: php81
  codeVolumeSpec:
    git:
      repository: https://github.com/example/news.git
  ingressAnnotations:
    nginx.ingress.kubernetes.io/proxy-body-size: 32m
",
    )
    .expect("runtime manifest");

    let spec = resolve(&site, Some(&runtime.spec)).expect("resolves");
    assert_eq!(spec.image_ref(), "registry.example.com/wordpress:php81");
    assert_eq!(spec.home_url(&[]), "http://news.example.com/daily");
    assert!(spec.code.is_some());
    assert_eq!(
        spec.ingress_annotations
            .get("nginx.ingress.kubernetes.io/proxy-body-size")
            .map(String::as_str),
        Some("32m")
    );
}

#[test]
fn test_mistyped_field_is_rejected() {
    let result: Result<Wordpress, _> = serde_yaml::from_str(
        r"
apiVersion: wordpress.presslabs.org/v1alpha1
kind: Wordpress
metadata:
  name: broken
  namespace: sites
spec:
  replicas: many
",
    );
    assert!(result.is_err());
}
