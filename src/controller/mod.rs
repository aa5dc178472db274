//! # Controller
//!
//! Core controller modules for the WordPress operator.
//!
//! - `resolver`: merges a site over its runtime defaults into an `EffectiveSpec`
//! - `identity`: object names, labels, URLs and the image version hash
//! - `template`: pod templates, containers, volumes and environment
//! - `merge`: structural merge of desired state into live objects
//! - `syncer`: one syncer per dependent object kind, in apply order
//! - `apply`: the generic fetch, transform, compare and write engine
//! - `status`: condition updater for the site status
//! - `registry`: site to runtime reverse lookup for fan-out
//! - `wp_cron`: HTTP driven wp-cron loops
//! - `reconciler`: reconciliation entry point and context
//! - `backoff`: Fibonacci backoff mechanism for retries

pub mod apply;
pub mod backoff;
pub mod error;
pub mod identity;
pub mod merge;
pub mod reconciler;
pub mod registry;
pub mod resolver;
pub mod status;
pub mod syncer;
pub mod template;
pub mod wp_cron;
