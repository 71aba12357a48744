//! Subscription shapes as data.
//!
//! A [`Shape`] is a predicate template over the five scope fields. Each field
//! rule says whether the subscription's field must equal the query's, must be
//! unbound, or is left unconstrained. A shape holds one or more clauses and is
//! satisfied when any clause is.
//!
//! The shape tables are evaluated in passes. The base pass always runs. The
//! dynamic-env shapes run once per additional [`EnvBinding`]: against the prod /
//! non-prod sentinel when the query knows the env's prod flag, and against
//! membership in the fan-out set when the query carries downstream envs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::ClassifiedEvent;
use crate::query::ResolutionQuery;
use crate::scope::{EnvScope, EnvSentinel, ScopeFields};
use crate::subscription::Subscription;

/// Stable shape number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub u8);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape-{}", self.0)
    }
}

/// Constraint on a team / app / pipeline / cluster field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Not constrained.
    Any,
    /// Must be unbound in the subscription.
    Unbound,
    /// Must be bound and equal to the query coordinate.
    Query,
}

/// Constraint on the env field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvRule {
    /// Not constrained.
    Any,
    /// Must be unbound in the subscription.
    Unbound,
    /// Must be bound to the query's concrete env.
    Query,
    /// Bound according to the pass's [`EnvBinding`].
    Dynamic,
}

/// How [`EnvRule::Dynamic`] is interpreted in one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "sentinel", rename_all = "snake_case")]
pub enum EnvBinding {
    /// Base pass; dynamic env rules never hold.
    Direct,
    /// Env must be the given sentinel group.
    Sentinel(EnvSentinel),
    /// Env must be a concrete env contained in the query's fan-out set.
    Fanout,
}

/// One conjunction of field rules.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clause {
    pub team: FieldRule,
    pub app: FieldRule,
    pub env: EnvRule,
    pub pipeline: FieldRule,
    pub cluster: FieldRule,
}

const ANY: Clause = Clause {
    team: FieldRule::Any,
    app: FieldRule::Any,
    env: EnvRule::Any,
    pipeline: FieldRule::Any,
    cluster: FieldRule::Any,
};

/// A named targeting style: satisfied when any of its clauses holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Shape number.
    pub id: ShapeId,
    /// What an author picked to get this shape.
    pub description: &'static str,
    /// Disjunction of clauses.
    pub clauses: &'static [Clause],
}

use EnvRule as E;
use FieldRule::{Any, Query as Q, Unbound as U};

/// Shapes evaluated for every query.
pub const BASE_SHAPES: &[Shape] = &[
    Shape {
        id: ShapeId(1),
        description: "one application",
        clauses: &[Clause { team: U, app: Q, env: E::Unbound, pipeline: U, cluster: U }],
    },
    Shape {
        id: ShapeId(2),
        description: "one environment",
        clauses: &[Clause { team: U, app: U, env: E::Query, pipeline: U, cluster: U }],
    },
    Shape {
        id: ShapeId(3),
        description: "one team",
        clauses: &[Clause { team: Q, app: U, env: E::Unbound, pipeline: U, cluster: U }],
    },
    Shape {
        id: ShapeId(4),
        description: "one pipeline",
        clauses: &[Clause { team: U, app: U, env: E::Unbound, pipeline: Q, cluster: U }],
    },
    Shape {
        id: ShapeId(5),
        description: "one environment of a team",
        clauses: &[Clause { team: Q, app: U, env: E::Query, pipeline: U, cluster: U }],
    },
    Shape {
        id: ShapeId(6),
        description: "one environment of an application",
        clauses: &[Clause { team: U, app: Q, env: E::Query, pipeline: U, cluster: U }],
    },
    // Kept as authored: either branch alone satisfies the shape and neither
    // branch constrains the remaining fields.
    Shape {
        id: ShapeId(7),
        description: "application, environment and team, or the pipeline",
        clauses: &[
            Clause { team: Q, app: Q, env: E::Query, ..ANY },
            Clause { pipeline: Q, ..ANY },
        ],
    },
    Shape {
        id: ShapeId(8),
        description: "all environments of a cluster",
        clauses: &[Clause { team: U, app: U, env: E::Unbound, cluster: Q, ..ANY }],
    },
    Shape {
        id: ShapeId(9),
        description: "all environments of a cluster in an application",
        clauses: &[Clause { app: Q, env: E::Unbound, cluster: Q, ..ANY }],
    },
    Shape {
        id: ShapeId(10),
        description: "all environments of a cluster in a team",
        clauses: &[Clause { team: Q, app: U, env: E::Unbound, cluster: Q, ..ANY }],
    },
];

/// Shapes whose env is a dynamic group, evaluated once per sentinel or fan-out pass.
pub const DYNAMIC_ENV_SHAPES: &[Shape] = &[
    Shape {
        id: ShapeId(11),
        description: "environment group of a team",
        clauses: &[Clause { team: Q, app: U, env: E::Dynamic, pipeline: U, cluster: U }],
    },
    Shape {
        id: ShapeId(12),
        description: "environment group of an application",
        clauses: &[Clause { team: U, app: Q, env: E::Dynamic, pipeline: U, cluster: U }],
    },
    Shape {
        id: ShapeId(13),
        description: "environment group across all clusters",
        clauses: &[Clause { team: U, app: U, env: E::Dynamic, pipeline: U, cluster: Any }],
    },
    Shape {
        id: ShapeId(14),
        description: "environment group of a cluster",
        clauses: &[Clause { team: U, app: U, env: E::Dynamic, cluster: Q, ..ANY }],
    },
    Shape {
        id: ShapeId(15),
        description: "environment group of a cluster in an application",
        clauses: &[Clause { team: U, app: Q, env: E::Dynamic, cluster: Q, ..ANY }],
    },
    Shape {
        id: ShapeId(16),
        description: "environment group of a cluster in a team",
        clauses: &[Clause { team: Q, app: U, env: E::Dynamic, cluster: Q, ..ANY }],
    },
];

/// Shapes evaluated only in the fan-out pass.
pub const FANOUT_ONLY_SHAPES: &[Shape] = &[Shape {
    id: ShapeId(17),
    description: "downstream environment of an application's CI pipeline in a team",
    clauses: &[Clause { team: Q, app: Q, env: E::Dynamic, pipeline: Q, ..ANY }],
}];

impl Clause {
    /// Evaluates the clause against a subscription scope.
    #[must_use]
    pub fn matches(&self, scope: &ScopeFields, query: &ResolutionQuery, binding: EnvBinding) -> bool {
        field_holds(self.team, scope.team, query.team)
            && field_holds(self.app, scope.app, query.app)
            && field_holds(self.pipeline, scope.pipeline, query.pipeline)
            && field_holds(self.cluster, scope.cluster, query.cluster)
            && env_holds(self.env, scope.env, query, binding)
    }
}

impl Shape {
    /// Full shape-match: pipeline type, classified event type, then the clauses.
    #[must_use]
    pub fn matches(
        &self,
        sub: &Subscription,
        event: &ClassifiedEvent,
        query: &ResolutionQuery,
        binding: EnvBinding,
    ) -> bool {
        sub.pipeline_type == event.pipeline_type
            && sub.event_type == event.event_type
            && self
                .clauses
                .iter()
                .any(|c| c.matches(&sub.scope, query, binding))
    }
}

fn field_holds<T: PartialEq>(rule: FieldRule, bound: Option<T>, query: Option<T>) -> bool {
    match rule {
        FieldRule::Any => true,
        FieldRule::Unbound => bound.is_none(),
        FieldRule::Query => match (bound, query) {
            (Some(b), Some(q)) => b == q,
            _ => false,
        },
    }
}

fn env_holds(
    rule: EnvRule,
    bound: Option<EnvScope>,
    query: &ResolutionQuery,
    binding: EnvBinding,
) -> bool {
    match rule {
        EnvRule::Any => true,
        EnvRule::Unbound => bound.is_none(),
        EnvRule::Query => match (bound, query.env) {
            (Some(EnvScope::Env(b)), Some(q)) => b == q,
            _ => false,
        },
        EnvRule::Dynamic => match (binding, bound) {
            (EnvBinding::Sentinel(s), Some(EnvScope::Sentinel(b))) => b == s,
            (EnvBinding::Fanout, Some(EnvScope::Env(b))) => query.fanout_envs.contains(b),
            _ => false,
        },
    }
}

/// One evaluation pass: a shape table under an env binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapePass {
    /// Interpretation of dynamic env rules.
    pub binding: EnvBinding,
    /// Shapes evaluated in this pass.
    pub shapes: &'static [Shape],
}

/// The passes that apply to `query`, base pass first.
#[must_use]
pub fn applicable_passes(query: &ResolutionQuery) -> Vec<ShapePass> {
    let mut passes = vec![ShapePass {
        binding: EnvBinding::Direct,
        shapes: BASE_SHAPES,
    }];
    if let Some(is_prod) = query.is_prod_env {
        passes.push(ShapePass {
            binding: EnvBinding::Sentinel(EnvSentinel::for_prod_flag(is_prod)),
            shapes: DYNAMIC_ENV_SHAPES,
        });
    }
    if !query.fanout_envs.is_empty() {
        passes.push(ShapePass {
            binding: EnvBinding::Fanout,
            shapes: DYNAMIC_ENV_SHAPES,
        });
        passes.push(ShapePass {
            binding: EnvBinding::Fanout,
            shapes: FANOUT_ONLY_SHAPES,
        });
    }
    passes
}

/// Looks up a shape by number across all tables.
#[must_use]
pub fn shape(id: ShapeId) -> Option<&'static Shape> {
    BASE_SHAPES
        .iter()
        .chain(DYNAMIC_ENV_SHAPES)
        .chain(FANOUT_ONLY_SHAPES)
        .find(|s| s.id == id)
}
