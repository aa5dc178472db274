//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::apply::KubeClusterClient;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::error::SyncError;
use crate::controller::registry::RuntimeRegistry;
use crate::controller::syncer::SyncOptions;
use crate::controller::wp_cron::WpCronScheduler;
use anyhow::{Context, Result};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] anyhow::Error),
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared context handed to every reconciliation
pub struct Reconciler {
    pub client: Client,
    pub cluster: Arc<KubeClusterClient>,
    pub config: ControllerConfig,
    /// Site -> runtime reverse lookup used by the runtime watch
    pub registry: Arc<RuntimeRegistry>,
    /// Only drives loops in `CronMode::Http`
    pub wp_cron: WpCronScheduler,
    // Backoff state per resource (identified by namespace/name)
    // Owned by the error_policy() layer; reset on success
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("sites", &self.registry.len())
            .field("wp_cron", &self.wp_cron)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        client: Client,
        config: ControllerConfig,
        registry: Arc<RuntimeRegistry>,
    ) -> Result<Self> {
        let wp_cron = WpCronScheduler::new(config.wp_cron_interval(), config.wp_cron_timeout())
            .context("Failed to build wp-cron HTTP client")?;
        Ok(Self {
            cluster: Arc::new(KubeClusterClient::new(client.clone())),
            client,
            config,
            registry,
            wp_cron,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            ingress_class: self.config.ingress_class.clone(),
            cron_mode: self.config.wp_cron_mode,
        }
    }

    /// Forget the error streak of `resource_key` after a successful pass
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}
