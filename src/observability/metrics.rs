//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `wordpress_operator_reconciliations_total` - Total number of site reconciliations
//! - `wordpress_operator_reconciliation_errors_total` - Total number of failed reconciliations
//! - `wordpress_operator_reconciliation_duration_seconds` - Duration of reconciliations
//! - `wordpress_operator_apply_total` - Apply outcomes by object kind and outcome
//! - `wordpress_operator_wp_cron_triggers_total` - wp-cron HTTP triggers by result
//! - `wordpress_operator_requeues_total` - Requeues by reason

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "wordpress_operator_reconciliations_total",
        "Total number of site reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "wordpress_operator_reconciliation_errors_total",
        "Total number of failed site reconciliations",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "wordpress_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static APPLY_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "wordpress_operator_apply_total",
            "Apply outcomes of dependent objects",
        ),
        &["kind", "outcome"],
    )
    .expect("Failed to create APPLY_TOTAL metric - this should never happen")
});

static WP_CRON_TRIGGERS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "wordpress_operator_wp_cron_triggers_total",
            "wp-cron HTTP triggers by result",
        ),
        &["result"],
    )
    .expect("Failed to create WP_CRON_TRIGGERS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "wordpress_operator_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(APPLY_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WP_CRON_TRIGGERS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

/// Count one apply outcome (`created`, `updated`, `unchanged` or `failed`)
pub fn increment_apply_total(kind: &str, outcome: &str) {
    APPLY_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn increment_wp_cron_triggers(result: &str) {
    WP_CRON_TRIGGERS_TOTAL.with_label_values(&[result]).inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
