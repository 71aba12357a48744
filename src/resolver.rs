//! The matching engine.
//!
//! [`SubscriptionResolver`] turns a [`ResolutionQuery`] into the set of
//! subscriptions that should be notified. One resolution performs at most one
//! store read, evaluates every candidate against every applicable shape pass,
//! and returns the union de-duplicated by subscription id.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, trace, warn, Span};

use crate::config::ResolverConfig;
use crate::error::NotifyResult;
use crate::event::{ClassifiedEvent, EventClassifier};
use crate::query::ResolutionQuery;
use crate::shape::{applicable_passes, EnvBinding, ShapeId, ShapePass};
use crate::storage::SubscriptionStore;
use crate::subscription::{Subscription, SubscriptionId};

/// One (subscription, shape, pass) match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeHit {
    /// The matching subscription.
    pub subscription_id: SubscriptionId,
    /// The shape it satisfied.
    pub shape: ShapeId,
    /// The pass the shape was evaluated in.
    pub binding: EnvBinding,
}

/// Outcome of a resolution: the subscriptions to notify.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    classified: Option<ClassifiedEvent>,
    subscriptions: Vec<Subscription>,
}

impl Resolution {
    fn inapplicable() -> Self {
        Self::default()
    }

    /// Matched subscriptions, each id at most once.
    #[must_use]
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Consumes the resolution.
    #[must_use]
    pub fn into_subscriptions(self) -> Vec<Subscription> {
        self.subscriptions
    }

    /// Matched ids in result order.
    #[must_use]
    pub fn ids(&self) -> Vec<SubscriptionId> {
        self.subscriptions.iter().map(|s| s.id).collect()
    }

    /// Number of distinct subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// True when nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// The classified event, or `None` if the query could never match.
    #[must_use]
    pub fn classified(&self) -> Option<ClassifiedEvent> {
        self.classified
    }
}

/// Resolves queries against a subscription store.
///
/// Holds no mutable state; share it freely across threads.
pub struct SubscriptionResolver {
    store: Arc<dyn SubscriptionStore>,
    classifier: EventClassifier,
    trace_shape_hits: bool,
}

impl std::fmt::Debug for SubscriptionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionResolver")
            .field("classifier", &self.classifier)
            .field("trace_shape_hits", &self.trace_shape_hits)
            .finish_non_exhaustive()
    }
}

impl SubscriptionResolver {
    /// Creates a resolver with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self {
            store,
            classifier: EventClassifier::new(),
            trace_shape_hits: false,
        }
    }

    /// Creates a resolver with the given configuration.
    #[must_use]
    pub fn with_config(store: Arc<dyn SubscriptionStore>, config: &ResolverConfig) -> Self {
        Self {
            store,
            classifier: EventClassifier::new(),
            trace_shape_hits: config.trace_shape_hits,
        }
    }

    /// The classifier used to normalize event types.
    #[must_use]
    pub fn classifier(&self) -> &EventClassifier {
        &self.classifier
    }

    /// Resolves the subscriptions to notify for `query`.
    ///
    /// An inapplicable query (no pipeline type, event type zero) yields an
    /// empty resolution without touching the store.
    ///
    /// # Errors
    /// `NotifyError::Storage` when the candidate read fails. No partial
    /// result is returned.
    pub fn resolve(&self, query: &ResolutionQuery) -> NotifyResult<Resolution> {
        let span = resolve_span(query, "resolve");
        let _guard = span.enter();

        let Some((event, candidates)) = self.load_candidates(query)? else {
            return Ok(Resolution::inapplicable());
        };

        let passes = applicable_passes(query);
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for sub in candidates {
            let hits: Vec<ShapeHit> = shape_hits(&sub, &event, query, &passes).collect();
            if self.trace_shape_hits {
                trace_hits(&hits);
            }
            if !hits.is_empty() && seen.insert(sub.id) {
                matched.push(sub);
            }
        }

        debug!(matched = matched.len(), "resolved subscriptions");
        Ok(Resolution {
            classified: Some(event),
            subscriptions: matched,
        })
    }

    /// Lists every shape hit for `query`, grouped by candidate.
    ///
    /// A subscription hit by several shapes or passes appears once per hit.
    ///
    /// # Errors
    /// Same as [`SubscriptionResolver::resolve`].
    pub fn explain(&self, query: &ResolutionQuery) -> NotifyResult<Vec<ShapeHit>> {
        let span = resolve_span(query, "explain");
        let _guard = span.enter();

        let Some((event, candidates)) = self.load_candidates(query)? else {
            return Ok(Vec::new());
        };
        let passes = applicable_passes(query);
        Ok(candidates
            .iter()
            .flat_map(|sub| shape_hits(sub, &event, query, &passes))
            .collect())
    }

    fn load_candidates(
        &self,
        query: &ResolutionQuery,
    ) -> NotifyResult<Option<(ClassifiedEvent, Vec<Subscription>)>> {
        let Some(event) = self.classifier.classify(query.pipeline_type, query.event_type) else {
            debug!("query is inapplicable; skipping store read");
            return Ok(None);
        };

        let candidates = self
            .store
            .list_subscriptions(event.pipeline_type, event.event_type)
            .map_err(|e| {
                warn!(error = %e, "subscription store read failed");
                e
            })?;
        debug!(
            candidates = candidates.len(),
            classified_event_type = %event.event_type,
            "loaded candidates"
        );
        Ok(Some((event, candidates)))
    }
}

fn resolve_span(query: &ResolutionQuery, mode: &'static str) -> Span {
    debug_span!(
        "resolve_subscriptions",
        mode,
        pipeline_type = ?query.pipeline_type,
        event_type = %query.event_type
    )
}

fn trace_hits(hits: &[ShapeHit]) {
    for hit in hits {
        trace!(
            subscription_id = %hit.subscription_id,
            shape = %hit.shape,
            binding = ?hit.binding,
            "shape hit"
        );
    }
}

fn shape_hits<'a>(
    sub: &'a Subscription,
    event: &'a ClassifiedEvent,
    query: &'a ResolutionQuery,
    passes: &'a [ShapePass],
) -> impl Iterator<Item = ShapeHit> + 'a {
    passes.iter().flat_map(move |pass| {
        pass.shapes
            .iter()
            .filter(move |shape| shape.matches(sub, event, query, pass.binding))
            .map(move |shape| ShapeHit {
                subscription_id: sub.id,
                shape: shape.id,
                binding: pass.binding,
            })
    })
}
