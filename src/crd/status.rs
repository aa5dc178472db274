//! # Status
//!
//! Status types for the `Wordpress` resource and the condition updater shared by
//! the reconciler (`Ready`) and the wp-cron trigger loop (`WPCronTriggering`).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the Wordpress resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordpressStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generation of the spec last reconciled successfully
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Tri-state condition status
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("True"),
            Self::False => f.write_str("False"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Machine readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last time the condition was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    /// Last time the status flipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Set a condition, returning `true` only if something actually changed
///
/// A missing condition counts as `Unknown` with no reason or message. The condition
/// is rewritten when its status, reason or message differs from the requested one,
/// so a loop that keeps observing the same outcome (the same error included) never
/// produces a write. `lastTransitionTime` only moves when the status flips.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> bool {
    let timestamp = now.to_rfc3339();
    let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) else {
        conditions.push(Condition {
            r#type: condition_type.to_string(),
            status,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            last_update_time: Some(timestamp.clone()),
            last_transition_time: Some(timestamp),
        });
        return true;
    };

    let status_changed = existing.status != status;
    let unchanged = !status_changed
        && existing.reason.as_deref() == Some(reason)
        && existing.message.as_deref() == Some(message);
    if unchanged {
        return false;
    }

    existing.status = status;
    existing.reason = Some(reason.to_string());
    existing.message = Some(message.to_string());
    existing.last_update_time = Some(timestamp.clone());
    if status_changed || existing.last_transition_time.is_none() {
        existing.last_transition_time = Some(timestamp);
    }
    true
}
