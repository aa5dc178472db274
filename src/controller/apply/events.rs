//! Observability sink for apply outcomes.
//!
//! Delivery is best effort: a failed publish is logged and never changes the
//! result of a reconciliation.

use super::ApplyOutcome;
use crate::constants::OPERATOR_NAME;
use crate::controller::error::SyncError;
use crate::controller::identity::ObjectKey;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

/// One (severity, reason, message) tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub severity: Severity,
    pub reason: String,
    pub message: String,
    /// `None` for failures
    pub outcome: Option<ApplyOutcome>,
}

impl SyncEvent {
    pub fn applied(kind: &str, key: &ObjectKey, outcome: ApplyOutcome) -> Self {
        Self {
            severity: Severity::Normal,
            reason: format!("{kind}{}", outcome.reason_suffix()),
            message: format!("{kind} {key} {}", outcome.as_str()),
            outcome: Some(outcome),
        }
    }

    pub fn failed(kind: &str, key: &ObjectKey, error: &SyncError) -> Self {
        Self {
            severity: Severity::Warning,
            reason: format!("{kind}Failed"),
            message: format!("{kind} {key}: {error}"),
            outcome: None,
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: SyncEvent);
}

/// Publishes Kubernetes Events on the site object
///
/// `Unchanged` outcomes only reach the debug log; a converged site would
/// otherwise emit one Event per object on every resync.
pub struct KubeEventSink {
    recorder: Recorder,
    site: ObjectReference,
}

impl KubeEventSink {
    pub fn new(client: Client, site: ObjectReference) -> Self {
        let reporter = Reporter {
            controller: OPERATOR_NAME.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
            site,
        }
    }
}

impl std::fmt::Debug for KubeEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventSink")
            .field("site", &self.site.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn publish(&self, event: SyncEvent) {
        if event.outcome == Some(ApplyOutcome::Unchanged) {
            debug!(reason = %event.reason, "{}", event.message);
            return;
        }
        let type_ = match event.severity {
            Severity::Normal => EventType::Normal,
            Severity::Warning => EventType::Warning,
        };
        let kube_event = Event {
            type_,
            reason: event.reason.clone(),
            note: Some(event.message.clone()),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&kube_event, &self.site).await {
            warn!(reason = %event.reason, error = %e, "Failed to publish event");
        }
    }
}

/// Keeps every event in memory, for tests
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.reason).collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, event: SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_reasons() {
        let key = ObjectKey::new("sites", "blog");
        let created = SyncEvent::applied("Deployment", &key, ApplyOutcome::Created);
        assert_eq!(created.reason, "DeploymentCreated");
        assert_eq!(created.message, "Deployment sites/blog created");
        assert_eq!(created.severity, Severity::Normal);

        let failed = SyncEvent::failed(
            "PersistentVolumeClaim",
            &key,
            &SyncError::MissingVolumeSource("code"),
        );
        assert_eq!(failed.reason, "PersistentVolumeClaimFailed");
        assert_eq!(failed.severity, Severity::Warning);
        assert!(failed.outcome.is_none());
    }
}
