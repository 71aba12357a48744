//! Error types for pipeline-notify.
//!
//! All errors are strongly typed using thiserror so callers can pattern match
//! on specific conditions. "No matching subscription" is never an error: it is
//! an empty [`crate::Resolution`].

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors raised while decoding or constructing inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Subscription binds no scope field and can never match")]
    EmptyScope,

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: &'static str,
    },

    #[error("Unknown pipeline type '{value}'")]
    UnknownPipelineType {
        value: String,
    },

    #[error("Invalid {field} id: {raw}")]
    InvalidId {
        field: &'static str,
        raw: i64,
    },

    #[error("{field} id {value} does not fit the persisted column")]
    IdOutOfRange {
        field: &'static str,
        value: u64,
    },

    #[error("Invalid channel configuration: {reason}")]
    InvalidChannelConfig {
        reason: String,
    },
}

/// Top-level error type for pipeline-notify.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The subscription store (or topology collaborator) read failed.
    ///
    /// The underlying error is carried unchanged.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl NotifyError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if retrying the whole resolution may succeed.
    ///
    /// The engine itself never retries; this is a hint for the event producer.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Storage(e) => e.is_retryable(),
        }
    }
}

/// Result type alias for pipeline-notify operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_unknown_pipeline_type() {
        let err = ValidationError::UnknownPipelineType {
            value: "BATCH".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("BATCH"));
        assert!(msg.contains("Unknown pipeline type"));
    }

    #[test]
    fn test_validation_error_invalid_id() {
        let err = ValidationError::InvalidId {
            field: "env",
            raw: -7,
        };
        assert_eq!(err.to_string(), "Invalid env id: -7");
    }

    #[test]
    fn test_notify_error_from_validation() {
        let err: NotifyError = ValidationError::EmptyScope.into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_notify_error_from_storage_keeps_source() {
        let err: NotifyError = StorageError::Timeout { duration_ms: 250 }.into();
        assert!(err.is_storage());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("250ms"));
        assert!(matches!(
            err,
            NotifyError::Storage(StorageError::Timeout { duration_ms: 250 })
        ));
    }

    #[test]
    fn test_notify_error_retryable() {
        let err: NotifyError = StorageError::Cancelled.into();
        assert!(!err.is_retryable());

        let err: NotifyError = StorageError::ConnectionError("reset".to_string()).into();
        assert!(err.is_retryable());
    }
}
