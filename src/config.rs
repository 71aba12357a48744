//! Resolver configuration.
//!
//! Only observability switches live here. Matching semantics, including the
//! event type remap, are fixed in [`crate::event::EventClassifier`].

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::SubscriptionResolver`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Emit a `trace!` record for every shape a candidate satisfies.
    pub trace_shape_hits: bool,
}

impl ResolverConfig {
    /// Enables per-hit shape tracing.
    #[must_use]
    pub fn with_shape_hit_tracing(mut self) -> Self {
        self.trace_shape_hits = true;
        self
    }
}
