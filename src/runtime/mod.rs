//! # Runtime
//!
//! Operator process plumbing around the reconciler.
//!
//! - `initialization`: rustls, tracing, metrics, probe server, client and context
//! - `watch_loop`: the `kube_runtime::Controller` and its restart loop
//! - `error_policy`: per-site Fibonacci backoff and watch error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
