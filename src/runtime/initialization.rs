//! # Initialization
//!
//! Operator start-up: rustls provider, tracing, metrics, the probe server,
//! the Kubernetes client and the reconciler context.

use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::controller::registry::RuntimeRegistry;
use crate::observability;
use crate::server::{start_server, ServerState};
use anyhow::{anyhow, Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Install the tracing subscriber; `RUST_LOG` wins over the default filter
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordpress_operator=info".into()),
        )
        .init();
}

/// Initialize the operator runtime
pub async fn initialize(config: ControllerConfig) -> Result<InitializationResult> {
    // Must run before anything touches rustls (kube client, reqwest)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    init_tracing();

    info!("Starting WordPress operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        wp_cron_mode = %config.wp_cron_mode,
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        max_concurrent_reconciliations = config.max_concurrent_reconciliations,
        "Configuration loaded"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let registry = Arc::new(RuntimeRegistry::new());
    let reconciler = Arc::new(Reconciler::new(client, config, registry)?);

    info!("Operator initialized, starting watch loop...");
    Ok(InitializationResult {
        reconciler,
        server_state,
    })
}
