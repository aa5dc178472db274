//! # WordPress Operator
//!
//! Kubernetes operator that turns `Wordpress` custom resources into running
//! sites: a Deployment and Service, an Ingress for every route, a Secret with
//! the WordPress salts, optional code and media volume claims, a wp-cron
//! schedule and a database migration Job per image version.
//!
//! Settings come from the environment (see `ControllerConfig`); the flags
//! below override them.

use anyhow::Result;
use clap::Parser;
use wordpress_operator::config::{ControllerConfig, CronMode};
use wordpress_operator::runtime::initialization::initialize;
use wordpress_operator::runtime::watch_loop::run_watch_loop;

/// WordPress operator
#[derive(Debug, Parser)]
#[command(name = "wordpress-operator", version, about, long_about = None)]
struct Cli {
    /// Port for /metrics, /healthz and /readyz
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Only watch sites in this namespace
    #[arg(long)]
    watch_namespace: Option<String>,

    /// Ingress class annotation applied to every generated Ingress
    #[arg(long)]
    ingress_class: Option<String>,

    /// How wp-cron is driven: `job` or `http`
    #[arg(long)]
    wp_cron_mode: Option<CronMode>,

    /// Maximum number of sites reconciled at once
    #[arg(long)]
    max_concurrent_reconciliations: Option<u16>,
}

impl Cli {
    fn apply(self, mut config: ControllerConfig) -> ControllerConfig {
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(namespace) = self.watch_namespace {
            config.watch_namespace = Some(namespace);
        }
        if let Some(class) = self.ingress_class {
            config.ingress_class = Some(class);
        }
        if let Some(mode) = self.wp_cron_mode {
            config.wp_cron_mode = mode;
        }
        if let Some(concurrency) = self.max_concurrent_reconciliations {
            config.max_concurrent_reconciliations = concurrency;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().apply(ControllerConfig::from_env());
    let init = initialize(config).await?;
    run_watch_loop(init.reconciler, init.server_state).await
}
