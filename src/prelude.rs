//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use wordpress_operator::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Resolution and identity
pub use crate::controller::identity::{Component, ObjectKey};
pub use crate::controller::resolver::{resolve, EffectiveSpec};

// Apply engine and syncers
pub use crate::controller::apply::{
    apply, ApplyOutcome, ClusterClient, EventSink, InMemoryCluster, KubeClusterClient,
    RecordingEventSink, SyncEvent,
};
pub use crate::controller::error::SyncError;
pub use crate::controller::syncer::{site_syncers, SiteSyncer, SyncOptions, Syncer};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    reconcile, reconcile_site, sync_site, BackoffState, Reconciler, ReconcilerError, SiteReport,
};

// Config types
pub use crate::config::{ControllerConfig, CronMode};
