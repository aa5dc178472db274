//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! Values in the first block can be overridden via environment variables
//! (see [`crate::config::ControllerConfig`]). The remaining values describe the
//! shape of the objects the operator generates and are fixed.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default number of sites reconciled concurrently
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default resync interval for a successfully reconciled site (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Default Fibonacci backoff bounds for failed reconciliations (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default interval between two wp-cron HTTP triggers (seconds)
pub const DEFAULT_WP_CRON_INTERVAL_SECS: u64 = 30;

/// Default hard timeout of a single wp-cron HTTP trigger (seconds)
pub const DEFAULT_WP_CRON_TIMEOUT_SECS: u64 = 30;

/// Field manager / reporter name used for writes and events
pub const OPERATOR_NAME: &str = "wordpress-operator";

// Site defaults

pub const DEFAULT_IMAGE: &str = "quay.io/presslabs/wordpress-runtime";
pub const DEFAULT_TAG: &str = "5.1-r73";
pub const DEFAULT_IMAGE_PULL_POLICY: &str = "IfNotPresent";

/// Where the raw code volume is mounted (git clones land here)
pub const CODE_SRC_MOUNT_PATH: &str = "/var/run/presslabs.org/code/src";
/// Conventional wp-content mount path
pub const DEFAULT_CODE_MOUNT_PATH: &str = "/var/www/html/wp-content";
/// Media is mounted below the content path unless a mount path is given
pub const DEFAULT_MEDIA_SUB_DIR: &str = "uploads";

pub const CODE_VOLUME_NAME: &str = "code";
pub const MEDIA_VOLUME_NAME: &str = "media";

/// Port the runtime image listens on
pub const INTERNAL_HTTP_PORT: i32 = 8080;
pub const HTTP_PORT_NAME: &str = "http";
pub const SERVICE_HTTP_PORT: i32 = 80;

pub const WEB_CONTAINER_NAME: &str = "wordpress";
pub const CLI_CONTAINER_NAME: &str = "wp-cli";
pub const GIT_CONTAINER_NAME: &str = "git";
pub const INSTALL_CONTAINER_NAME: &str = "install-wp";

pub const GIT_CLONE_IMAGE: &str = "docker.io/library/buildpack-deps:stretch-scm";
pub const RCLONE_IMAGE: &str =
    "quay.io/presslabs/rclone@sha256:4436a1e2d471236eafac605b24a66f5f18910b6f9cde505db065506208f73f96";
pub const MEDIA_FTP_PORT: i32 = 2121;
pub const MEDIA_HTTP_PORT: i32 = 8090;

/// uid/gid of www-data in the runtime image
pub const WWW_DATA_USER_ID: i64 = 33;

// Labels

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_UPGRADE_FOR: &str = "wordpress.presslabs.org/upgrade-for";
pub const ANNOTATION_UPGRADE_IMAGE: &str = "wordpress.presslabs.org/upgrade-image";
pub const ANNOTATION_INGRESS_CLASS: &str = "kubernetes.io/ingress.class";
pub const APP_NAME: &str = "wordpress";

// Scheduled task

pub const CRON_SCHEDULE: &str = "* * * * *";
pub const CRON_STARTING_DEADLINE_SECS: i64 = 10;
pub const CRON_SUCCESSFUL_JOBS_HISTORY: i32 = 3;
pub const CRON_FAILED_JOBS_HISTORY: i32 = 1;
pub const CRON_ACTIVE_DEADLINE_SECS: i64 = 10;

/// Migration job deadline (seconds)
pub const UPGRADE_ACTIVE_DEADLINE_SECS: i64 = 10;

/// Length in hex characters of the image version hash
pub const VERSION_HASH_LEN: usize = 10;

// Secret

/// Token names generated once into the site secret
pub const SALT_KEYS: [&str; 8] = [
    "AUTH_KEY",
    "SECURE_AUTH_KEY",
    "LOGGED_IN_KEY",
    "NONCE_KEY",
    "AUTH_SALT",
    "SECURE_AUTH_SALT",
    "LOGGED_IN_SALT",
    "NONCE_SALT",
];
pub const SALT_LENGTH: usize = 64;

// Conditions

pub const CONDITION_READY: &str = "Ready";
pub const REASON_RECONCILE_SUCCEEDED: &str = "ReconcileSucceeded";
pub const CONDITION_WP_CRON: &str = "WPCronTriggering";
pub const REASON_WP_CRON_TRIGGERING: &str = "WPCronTriggering";
pub const REASON_WP_CRON_ERROR: &str = "WPCronTriggerError";
