//! # Reconciler
//!
//! Site reconciliation: the shared context, the per-site pass and its error type.
//!
//! - `types`: `Reconciler` context, `ReconcilerError`, `BackoffState`
//! - `reconcile`: `reconcile` entry point plus the cluster-agnostic `reconcile_site`

mod reconcile;
mod types;

pub use reconcile::{reconcile, reconcile_site, sync_site, SiteReport};
pub use types::{BackoffState, Reconciler, ReconcilerError};
