//! Error types for asg-dns-sd.

use thiserror::Error;

/// Boxed error returned by the external collaborators (registry, record store, naming).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used across the crate.
pub type Result<T, E = ReactorError> = std::result::Result<T, E>;

/// Errors that abort a reconciliation.
///
/// Every variant aborts the whole invocation before anything is submitted to the
/// record store, except `Remote` raised by the final batch submission itself.
#[derive(Debug, Error)]
pub enum ReactorError {
    /// Notification absent, empty, or not decodable as a lifecycle event.
    #[error("malformed lifecycle event: {0}")]
    MalformedEvent(String),

    /// A required group tag is missing.
    #[error("group is missing required tag `{0}`")]
    MissingConfiguration(String),

    /// Group tags are present but inconsistent (name/port count mismatch, bad port).
    #[error("invalid service manifest: {0}")]
    ManifestShape(String),

    /// Group, instances, or existing records could not be resolved.
    #[error("not found: {0}")]
    NotFound(String),

    /// A call to the registry or record store failed.
    #[error("{operation} failed: {source}")]
    Remote {
        /// Name of the remote call that failed.
        operation: &'static str,
        /// Error reported by the collaborator.
        #[source]
        source: BoxError,
    },

    /// Hostname derivation failed for an instance.
    #[error("cannot derive hostname for instance {instance_id}: {source}")]
    Hostname {
        /// Instance whose hostname could not be derived.
        instance_id: String,
        /// Error reported by the naming strategy.
        #[source]
        source: BoxError,
    },

    /// A hostname or zone name does not form a valid DNS name.
    #[error("invalid DNS name: {0}")]
    InvalidName(#[from] hickory_proto::ProtoError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (snapshot or event file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ReactorError {
    /// Wrap a collaborator failure for the named remote call.
    pub fn remote(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Remote {
            operation,
            source: source.into(),
        }
    }

    /// Whether redelivering the same event could succeed.
    ///
    /// Only remote failures are transient; everything else needs an operator fix
    /// or a different event.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "malformed_event",
            Self::MissingConfiguration(_) => "missing_configuration",
            Self::ManifestShape(_) => "manifest_shape",
            Self::NotFound(_) => "not_found",
            Self::Remote { .. } => "remote",
            Self::Hostname { .. } => "hostname",
            Self::InvalidName(_) => "invalid_name",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_remote_is_retryable() {
        assert!(ReactorError::remote("ChangeResourceRecordSets", "throttled").is_retryable());
        assert!(!ReactorError::NotFound("group".into()).is_retryable());
        assert!(!ReactorError::MissingConfiguration("zone".into()).is_retryable());
        assert!(!ReactorError::MalformedEvent("empty".into()).is_retryable());
    }

    #[test]
    fn test_remote_display_names_operation() {
        let err = ReactorError::remote("GetHostedZone", "access denied");
        assert_eq!(err.to_string(), "GetHostedZone failed: access denied");
        assert_eq!(err.kind(), "remote");
    }
}
