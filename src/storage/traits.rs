//! Abstract storage traits for subscriptions.
//!
//! Backends are free to be remote and eventually consistent; the resolver
//! performs exactly one read per resolution and propagates any failure.

use thiserror::Error;

use crate::event::EventTypeId;
use crate::scope::PipelineType;
use crate::subscription::{Subscription, SubscriptionId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Subscription not found.
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The read did not complete in time.
    #[error("Storage read timed out after {duration_ms}ms")]
    Timeout {
        /// Elapsed time before giving up.
        duration_ms: u64,
    },

    /// The caller canceled the read.
    #[error("Storage read was cancelled")]
    Cancelled,
}

impl StorageError {
    /// Returns true if the same read may succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::Timeout { .. })
    }
}

/// Read interface the resolver consumes.
///
/// Implementations must return every subscription stored under
/// `(pipeline_type, event_type)` and must not filter by any scope field.
pub trait SubscriptionStore: Send + Sync {
    /// List candidate subscriptions for a classified event.
    fn list_subscriptions(
        &self,
        pipeline_type: PipelineType,
        event_type: EventTypeId,
    ) -> Result<Vec<Subscription>, StorageError>;
}

impl<S: SubscriptionStore + ?Sized> SubscriptionStore for std::sync::Arc<S> {
    fn list_subscriptions(
        &self,
        pipeline_type: PipelineType,
        event_type: EventTypeId,
    ) -> Result<Vec<Subscription>, StorageError> {
        (**self).list_subscriptions(pipeline_type, event_type)
    }
}
