//! # wp-cron HTTP trigger
//!
//! When the operator runs with `WP_CRON_MODE=http`, no CronJob is created.
//! Instead every site gets a background loop that calls `wp-cron.php` through
//! the site's Service on a fixed interval and records the result as the
//! `WPCronTriggering` condition.
//!
//! Loops are started (or refreshed) by each reconciliation and end on their
//! own once the site is gone. The watch loop also aborts them when the
//! controller reports the site as deleted.

use crate::constants::{CONDITION_WP_CRON, REASON_WP_CRON_ERROR, REASON_WP_CRON_TRIGGERING};
use crate::controller::apply::ClusterClient;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::resolver::EffectiveSpec;
use crate::controller::status::{update_condition, ConditionUpdate};
use crate::crd::{ConditionStatus, Wordpress};
use crate::observability::metrics;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum WpCronError {
    #[error("wp-cron request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("wp-cron returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Where and how to call wp-cron for one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WpCronTarget {
    pub site: ObjectKey,
    pub url: String,
    /// Sent as the `Host` header so WordPress routes the call to the right site
    pub host: String,
}

impl WpCronTarget {
    pub fn for_site(spec: &EffectiveSpec) -> Self {
        let url = format!(
            "http://{}.{}.svc{}?doing_wp_cron",
            spec.component_name(Component::Service),
            spec.namespace,
            spec.url_path(&["wp", "wp-cron.php"])
        );
        Self {
            site: ObjectKey::new(spec.namespace.clone(), spec.name.clone()),
            url,
            host: spec.main_domain(),
        }
    }
}

/// Issue a single wp-cron call, bounded by `timeout`
pub async fn trigger(
    http: &reqwest::Client,
    target: &WpCronTarget,
    timeout: Duration,
) -> Result<(), WpCronError> {
    let response = http
        .get(&target.url)
        .header(reqwest::header::HOST, &target.host)
        .timeout(timeout)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(WpCronError::Status(status));
    }
    Ok(())
}

struct RunningLoop {
    target: WpCronTarget,
    handle: JoinHandle<()>,
}

/// Owns one trigger loop per site
pub struct WpCronScheduler {
    http: reqwest::Client,
    interval: Duration,
    timeout: Duration,
    loops: Mutex<HashMap<ObjectKey, RunningLoop>>,
}

impl std::fmt::Debug for WpCronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WpCronScheduler")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("loops", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl WpCronScheduler {
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            interval: interval.max(Duration::from_millis(1)),
            timeout,
            loops: Mutex::new(HashMap::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ObjectKey, RunningLoop>> {
        self.loops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the loop for `target` unless an identical one is already running
    ///
    /// A changed target (new domain or path) replaces the running loop.
    pub fn ensure<C: ClusterClient + 'static>(&self, client: Arc<C>, target: WpCronTarget) {
        let mut loops = self.lock();
        if let Some(running) = loops.get(&target.site) {
            if running.target == target && !running.handle.is_finished() {
                return;
            }
            running.handle.abort();
        }

        info!(site = %target.site, url = %target.url, "Starting wp-cron trigger loop");
        let handle = tokio::spawn(run_loop(
            client,
            self.http.clone(),
            target.clone(),
            self.interval,
            self.timeout,
        ));
        loops.insert(target.site.clone(), RunningLoop { target, handle });
    }

    /// Abort the loop of `site`, if any
    pub fn stop(&self, site: &ObjectKey) {
        if let Some(running) = self.lock().remove(site) {
            debug!(site = %site, "Stopping wp-cron trigger loop");
            running.handle.abort();
        }
    }

    pub fn is_running(&self, site: &ObjectKey) -> bool {
        self.lock()
            .get(site)
            .is_some_and(|running| !running.handle.is_finished())
    }
}

impl Drop for WpCronScheduler {
    fn drop(&mut self) {
        for running in self.lock().values() {
            running.handle.abort();
        }
    }
}

async fn run_loop<C: ClusterClient>(
    client: Arc<C>,
    http: reqwest::Client,
    target: WpCronTarget,
    interval: Duration,
    timeout: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match client.get::<Wordpress>(&target.site).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                info!(site = %target.site, "Site is gone, wp-cron trigger loop exits");
                return;
            }
            Err(e) => {
                warn!(site = %target.site, error = %e, "Failed to read site, skipping wp-cron tick");
                continue;
            }
        }

        let result = trigger(&http, &target, timeout).await;
        let message = match &result {
            Ok(()) => {
                metrics::increment_wp_cron_triggers("success");
                String::new()
            }
            Err(e) => {
                metrics::increment_wp_cron_triggers("error");
                debug!(site = %target.site, error = %e, "wp-cron trigger failed");
                e.to_string()
            }
        };
        let update = ConditionUpdate {
            condition_type: CONDITION_WP_CRON,
            status: if result.is_ok() {
                ConditionStatus::True
            } else {
                ConditionStatus::False
            },
            reason: if result.is_ok() {
                REASON_WP_CRON_TRIGGERING
            } else {
                REASON_WP_CRON_ERROR
            },
            message: &message,
            observed_generation: None,
        };
        if let Err(e) = update_condition(client.as_ref(), &target.site, &update).await {
            warn!(site = %target.site, error = %e, "Failed to record wp-cron condition");
        }
    }
}
