//! # pipeline-notify - Subscription resolution for pipeline events
//!
//! Given one CI/CD pipeline event, decide which stored notification
//! subscriptions apply to it. A subscription targets a scope by binding some of
//! five coordinates (team, app, env, pipeline, cluster); the rest are unbound.
//! Each supported combination is a numbered *shape*, and matching is the union
//! of all shapes evaluated against the event's concrete coordinates.
//!
//! ## Core Concepts
//!
//! - **Subscription**: a stored setting with a scope, a pipeline type and an event type
//! - **Shape**: a predicate template saying which fields must equal the event and which must be unbound
//! - **Sentinel env**: a dynamic "all prod" / "all non-prod" environment group
//! - **Fan-out**: a CI event also reaching subscriptions on its downstream CD environments
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pipeline_notify::{
//!     AppId, EnvId, EventTypeId, InMemorySubscriptionStore, PipelineType, ResolutionQuery,
//!     Subscription, SubscriptionId, SubscriptionResolver, TeamId,
//! };
//!
//! let store = Arc::new(InMemorySubscriptionStore::new());
//! store.insert(
//!     Subscription::builder()
//!         .id(SubscriptionId::new(1))
//!         .app(AppId::new(10))
//!         .pipeline_type(PipelineType::Cd)
//!         .event_type(EventTypeId::FAIL)
//!         .build()?,
//! )?;
//!
//! let resolver = SubscriptionResolver::new(store);
//! let query = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
//!     .team(TeamId::new(5))
//!     .app(AppId::new(10))
//!     .env(EnvId::new(20))
//!     .build();
//! let resolution = resolver.resolve(&query)?;
//! assert_eq!(resolution.ids(), vec![SubscriptionId::new(1)]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Scope model and inputs
pub mod config;
pub mod error;
pub mod event;
pub mod query;
pub mod scope;
pub mod subscription;

// Matching
pub mod fanout;
pub mod resolver;
pub mod shape;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use config::ResolverConfig;
pub use error::{NotifyError, NotifyResult, ValidationError};
pub use event::{ClassifiedEvent, EventClassifier, EventTypeId};
pub use fanout::{DownstreamEnvironments, FanoutExpander};
pub use query::{FanoutEnvs, ResolutionQuery, ResolutionQueryBuilder};
pub use resolver::{Resolution, ShapeHit, SubscriptionResolver};
pub use scope::{
    AppId, ClusterId, EnvId, EnvScope, EnvSentinel, PipelineId, PipelineType, ScopeFields, TeamId,
};
pub use shape::{EnvBinding, Shape, ShapeId};
pub use storage::{InMemorySubscriptionStore, StorageError, SubscriptionRow, SubscriptionStore};
pub use subscription::{ChannelEntry, RuleId, Subscription, SubscriptionBuilder, SubscriptionId, ViewId};
