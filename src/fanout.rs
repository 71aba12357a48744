//! Fan-out expansion for CI events.
//!
//! A CI build feeds one or more CD pipelines, each deploying to an
//! environment. Subscriptions authored against those downstream environments
//! should hear about the build, so a CI query carries the set of downstream
//! env ids and the resolver runs an extra pass against it.

use tracing::debug;

use crate::error::NotifyResult;
use crate::query::{FanoutEnvs, ResolutionQuery};
use crate::scope::{EnvId, PipelineId};
use crate::storage::StorageError;

/// Pipeline topology collaborator.
pub trait DownstreamEnvironments: Send + Sync {
    /// Environments deployed by CD pipelines downstream of `ci_pipeline`.
    fn downstream_env_ids(&self, ci_pipeline: PipelineId) -> Result<Vec<EnvId>, StorageError>;
}

impl<D: DownstreamEnvironments + ?Sized> DownstreamEnvironments for std::sync::Arc<D> {
    fn downstream_env_ids(&self, ci_pipeline: PipelineId) -> Result<Vec<EnvId>, StorageError> {
        (**self).downstream_env_ids(ci_pipeline)
    }
}

/// Fills in [`ResolutionQuery::fanout_envs`] from the topology.
#[derive(Debug, Clone)]
pub struct FanoutExpander<D> {
    topology: D,
}

impl<D: DownstreamEnvironments> FanoutExpander<D> {
    /// Wraps a topology collaborator.
    pub fn new(topology: D) -> Self {
        Self { topology }
    }

    /// Returns `query` with its fan-out set computed.
    ///
    /// CI queries with a pipeline id get the downstream envs in topology
    /// order, duplicates dropped. Every other query comes back with an empty
    /// fan-out set.
    ///
    /// # Errors
    /// `NotifyError::Storage` when the topology read fails.
    pub fn expand(&self, query: &ResolutionQuery) -> NotifyResult<ResolutionQuery> {
        let mut expanded = query.clone();
        expanded.fanout_envs = match (query.is_ci(), query.pipeline) {
            (true, Some(pipeline)) => {
                let envs: FanoutEnvs = self.topology.downstream_env_ids(pipeline)?.into();
                debug!(ci_pipeline = %pipeline, downstream_envs = envs.len(), "expanded CI fan-out");
                envs
            }
            _ => FanoutEnvs::new(),
        };
        Ok(expanded)
    }
}
