//! # Custom Resource Definitions
//!
//! CRD types for the WordPress operator.
//!
//! ## Module Structure
//!
//! - `wordpress.rs` - The namespaced `Wordpress` site resource
//! - `volume.rs` - Code and media volume source specifications
//! - `runtime.rs` - The cluster-scoped `WordpressRuntime` defaults resource
//! - `status.rs` - Status types and the condition updater

mod runtime;
mod status;
mod volume;
mod wordpress;

// Re-export all public types
pub use runtime::{WordpressRuntime, WordpressRuntimeSpec};
pub use status::{set_condition, Condition, ConditionStatus, WordpressStatus};
pub use volume::{
    CodeVolumeSpec, GitVolumeSource, MediaVolumeSpec, ObjectStorageVolumeSource,
};
pub use wordpress::{BootstrapSpec, RouteSpec, Wordpress, WordpressSpec};
