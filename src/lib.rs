//! WordPress Operator Library
//!
//! Reconciles `Wordpress` custom resources into the Deployments, Services,
//! Ingresses, volume claims, jobs and secrets that run a site.
//!
//! ## Quick Start
//!
//! ```rust
//! use wordpress_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod server;
