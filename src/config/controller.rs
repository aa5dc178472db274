//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How wp-cron is driven for every site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CronMode {
    /// A CronJob runs `wp cron event run --due-now` every minute
    #[default]
    Job,
    /// The operator calls `wp-cron.php` over HTTP on a fixed interval
    Http,
}

impl FromStr for CronMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "job" => Ok(Self::Job),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown wp-cron mode '{other}' (expected job or http)")),
        }
    }
}

impl fmt::Display for CronMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job => f.write_str("job"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciliations: u16,
    /// Requeue interval after a successful reconciliation (seconds)
    pub resync_interval_secs: u64,
    /// Fibonacci backoff lower bound (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff upper bound (minutes)
    pub backoff_max_minutes: u64,
    /// Delay before restarting the watch stream after it ends (seconds)
    pub watch_restart_delay_secs: u64,
    /// Restrict the operator to one namespace; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Ingress class annotation applied to every generated Ingress
    pub ingress_class: Option<String>,
    /// CronJob or HTTP driven wp-cron
    pub wp_cron_mode: CronMode,
    /// Interval between two wp-cron HTTP triggers (seconds)
    pub wp_cron_interval_secs: u64,
    /// Hard per-call timeout for a wp-cron HTTP trigger (seconds)
    pub wp_cron_timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_namespace: None,
            ingress_class: None,
            wp_cron_mode: CronMode::Job,
            wp_cron_interval_secs: DEFAULT_WP_CRON_INTERVAL_SECS,
            wp_cron_timeout_secs: DEFAULT_WP_CRON_TIMEOUT_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            backoff_min_minutes: env_var_or_default(
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_namespace: env_var_opt("WATCH_NAMESPACE"),
            ingress_class: env_var_opt("INGRESS_CLASS"),
            wp_cron_mode: env_var_or_default("WP_CRON_MODE", CronMode::Job),
            wp_cron_interval_secs: env_var_or_default(
                "WP_CRON_INTERVAL_SECS",
                DEFAULT_WP_CRON_INTERVAL_SECS,
            ),
            wp_cron_timeout_secs: env_var_or_default(
                "WP_CRON_TIMEOUT_SECS",
                DEFAULT_WP_CRON_TIMEOUT_SECS,
            ),
        }
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    pub fn wp_cron_interval(&self) -> Duration {
        Duration::from_secs(self.wp_cron_interval_secs)
    }

    pub fn wp_cron_timeout(&self) -> Duration {
        Duration::from_secs(self.wp_cron_timeout_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable, treating empty values as unset
fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
