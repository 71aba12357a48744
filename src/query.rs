//! Resolution queries: the concrete coordinates of one triggering event.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::event::EventTypeId;
use crate::scope::{AppId, ClusterId, EnvId, PipelineId, PipelineType, TeamId};

/// Ordered, duplicate-free set of downstream environment ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EnvId>", into = "Vec<EnvId>")]
pub struct FanoutEnvs {
    ordered: Vec<EnvId>,
    members: HashSet<EnvId>,
}

impl FanoutEnvs {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `env` unless already present. Returns true if it was added.
    pub fn insert(&mut self, env: EnvId) -> bool {
        if !self.members.insert(env) {
            return false;
        }
        self.ordered.push(env);
        true
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, env: EnvId) -> bool {
        self.members.contains(&env)
    }

    /// Number of distinct envs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// True when there are no downstream envs; the fan-out pass is skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Ids in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = EnvId> + '_ {
        self.ordered.iter().copied()
    }

    /// Ids in first-insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[EnvId] {
        &self.ordered
    }
}

impl FromIterator<EnvId> for FanoutEnvs {
    fn from_iter<I: IntoIterator<Item = EnvId>>(iter: I) -> Self {
        let mut set = Self::new();
        for env in iter {
            set.insert(env);
        }
        set
    }
}

impl From<Vec<EnvId>> for FanoutEnvs {
    fn from(envs: Vec<EnvId>) -> Self {
        envs.into_iter().collect()
    }
}

impl From<FanoutEnvs> for Vec<EnvId> {
    fn from(envs: FanoutEnvs) -> Self {
        envs.ordered
    }
}

/// Concrete coordinates of a firing pipeline execution.
///
/// Coordinates are optional only because some events lack context (a CI
/// build has no environment of its own). An absent coordinate never equals a
/// bound subscription field.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionQuery {
    pub pipeline_type: Option<PipelineType>,
    pub event_type: EventTypeId,
    pub team: Option<TeamId>,
    pub app: Option<AppId>,
    pub env: Option<EnvId>,
    pub pipeline: Option<PipelineId>,
    pub cluster: Option<ClusterId>,
    /// Whether `env` is currently flagged production; `None` without env context.
    pub is_prod_env: Option<bool>,
    /// Downstream CD environments of a CI pipeline.
    #[serde(default)]
    pub fanout_envs: FanoutEnvs,
}

impl ResolutionQuery {
    /// Creates a builder for a query of the given pipeline type and raw event type.
    #[must_use]
    pub fn builder(pipeline_type: PipelineType, event_type: EventTypeId) -> ResolutionQueryBuilder {
        ResolutionQueryBuilder::new(Some(pipeline_type), event_type)
    }

    /// True for events raised by a CI pipeline.
    #[must_use]
    pub fn is_ci(&self) -> bool {
        self.pipeline_type == Some(PipelineType::Ci)
    }
}

/// Builder for [`ResolutionQuery`].
///
/// # Example
/// ```rust,ignore
/// let query = ResolutionQuery::builder(PipelineType::Cd, EventTypeId::FAIL)
///     .app(AppId::new(10))
///     .env(EnvId::new(20))
///     .team(TeamId::new(5))
///     .is_prod_env(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ResolutionQueryBuilder {
    query: ResolutionQuery,
}

impl ResolutionQueryBuilder {
    /// Creates a builder; `pipeline_type` may be absent for malformed events.
    #[must_use]
    pub fn new(pipeline_type: Option<PipelineType>, event_type: EventTypeId) -> Self {
        Self {
            query: ResolutionQuery {
                pipeline_type,
                event_type,
                team: None,
                app: None,
                env: None,
                pipeline: None,
                cluster: None,
                is_prod_env: None,
                fanout_envs: FanoutEnvs::new(),
            },
        }
    }

    /// Sets the owning team.
    #[must_use]
    pub fn team(mut self, team: TeamId) -> Self {
        self.query.team = Some(team);
        self
    }

    /// Sets the application.
    #[must_use]
    pub fn app(mut self, app: AppId) -> Self {
        self.query.app = Some(app);
        self
    }

    /// Sets the concrete environment the event fired in.
    #[must_use]
    pub fn env(mut self, env: EnvId) -> Self {
        self.query.env = Some(env);
        self
    }

    /// Sets the pipeline.
    #[must_use]
    pub fn pipeline(mut self, pipeline: PipelineId) -> Self {
        self.query.pipeline = Some(pipeline);
        self
    }

    /// Sets the cluster hosting the environment.
    #[must_use]
    pub fn cluster(mut self, cluster: ClusterId) -> Self {
        self.query.cluster = Some(cluster);
        self
    }

    /// Records whether the env is production. Enables the sentinel pass.
    #[must_use]
    pub fn is_prod_env(mut self, is_prod: bool) -> Self {
        self.query.is_prod_env = Some(is_prod);
        self
    }

    /// Sets the precomputed downstream environments (CI events).
    #[must_use]
    pub fn fanout_envs(mut self, envs: impl IntoIterator<Item = EnvId>) -> Self {
        self.query.fanout_envs = envs.into_iter().collect();
        self
    }

    /// Builds the query. Never fails; absent coordinates stay `None`.
    #[must_use]
    pub fn build(self) -> ResolutionQuery {
        self.query
    }
}
