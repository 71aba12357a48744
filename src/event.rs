//! Event classification.
//!
//! Normalizes a raw event type into the canonical type subscriptions are
//! stored under, and rejects queries that can never match.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scope::PipelineType;

/// Identifier of a pipeline event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTypeId(u32);

impl EventTypeId {
    /// Pipeline triggered.
    pub const TRIGGER: Self = Self(1);
    /// Build or deployment succeeded.
    pub const SUCCESS: Self = Self(2);
    /// Build or deployment failed.
    pub const FAIL: Self = Self(3);
    /// Deployment blocked while the pipeline is set to auto-trigger.
    pub const BLOCKED_AUTO_TRIGGER: Self = Self(6);

    /// Wraps a raw event type.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw event type.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The zero value: events without a notification concept.
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for EventTypeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The (pipeline type, event type) key candidates are loaded by.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    pub pipeline_type: PipelineType,
    pub event_type: EventTypeId,
}

/// Maps raw event types onto canonical ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventClassifier;

impl EventClassifier {
    /// Creates the classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The event type subscriptions for `raw` are stored under.
    ///
    /// Deployment blocked on an auto-trigger pipeline notifies the
    /// deployment-failed subscribers. Every other type is its own canonical type.
    #[must_use]
    pub const fn canonical(raw: EventTypeId) -> EventTypeId {
        match raw {
            EventTypeId::BLOCKED_AUTO_TRIGGER => EventTypeId::FAIL,
            other => other,
        }
    }

    /// Classifies an event, or returns `None` when no subscription could apply.
    #[must_use]
    pub fn classify(
        &self,
        pipeline_type: Option<PipelineType>,
        raw: EventTypeId,
    ) -> Option<ClassifiedEvent> {
        let pipeline_type = pipeline_type?;
        if raw.is_unset() {
            return None;
        }
        Some(ClassifiedEvent {
            pipeline_type,
            event_type: Self::canonical(raw),
        })
    }
}
