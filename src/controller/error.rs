//! # Sync Errors
//!
//! Error taxonomy shared by the resolver, the syncers and the apply engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The site specification cannot be resolved (e.g. no routes)
    #[error("invalid site specification: {0}")]
    Validation(String),

    /// A transform would change a field that is frozen after creation
    #[error("{kind} {name}: {field} is immutable and differs from the desired value")]
    ImmutableField {
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    /// A claim syncer ran without a claim spec to apply
    #[error("{0} persistent volume claim spec is not defined")]
    MissingVolumeSource(&'static str),

    /// The typed merge of existing and desired state failed
    #[error("failed to merge {kind}: {source}")]
    Merge {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Cluster API failure, including optimistic-concurrency conflicts
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl SyncError {
    /// True for version conflicts (HTTP 409) reported by the API server
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Kube(kube::Error::Api(e)) if e.code == 409)
    }

    /// True when the error needs a human to change the spec or the cluster
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ImmutableField { .. } | Self::MissingVolumeSource(_)
        )
    }

    /// Short machine readable reason, used in conditions
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "InvalidSpec",
            Self::ImmutableField { .. } => "ImmutableField",
            Self::MissingVolumeSource(_) => "MissingVolumeSource",
            Self::Merge { .. } => "MergeFailed",
            Self::Kube(_) if self.is_conflict() => "Conflict",
            Self::Kube(_) => "ApiError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> SyncError {
        SyncError::Kube(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "the object has been modified".to_string(),
            reason: "Conflict".to_string(),
            code,
        }))
    }

    #[test]
    fn test_conflict_classification() {
        assert!(api_error(409).is_conflict());
        assert!(!api_error(500).is_conflict());
        assert_eq!(api_error(409).reason(), "Conflict");
        assert_eq!(api_error(500).reason(), "ApiError");
    }

    #[test]
    fn test_immutable_is_permanent() {
        let err = SyncError::ImmutableField {
            kind: "Deployment",
            name: "blog".to_string(),
            field: "spec.selector",
        };
        assert!(err.is_permanent());
        assert!(!api_error(409).is_permanent());
        assert_eq!(
            err.to_string(),
            "Deployment blog: spec.selector is immutable and differs from the desired value"
        );
    }
}
