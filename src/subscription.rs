//! Stored notification settings.
//!
//! A [`Subscription`] names a scope, the pipeline type and event type it fires
//! on, and an opaque channel configuration handed to the dispatcher untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::EventTypeId;
use crate::scope::{AppId, ClusterId, EnvScope, PipelineId, PipelineType, ScopeFields, TeamId};

/// Unique identifier of a stored subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriptionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Link to a shared notification-recipient rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

/// UI grouping several subscriptions authored together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(pub u64);

/// A stored notification setting.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    #[serde(default)]
    pub scope: ScopeFields,
    pub pipeline_type: PipelineType,
    pub event_type: EventTypeId,
    /// Destination channel configuration; never interpreted by matching.
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub rule_id: RuleId,
    #[serde(default)]
    pub view_id: ViewId,
}

impl Subscription {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> SubscriptionBuilder {
        SubscriptionBuilder::default()
    }

    /// Decodes the channel configuration as a list of [`ChannelEntry`].
    ///
    /// A null configuration has no entries.
    ///
    /// # Errors
    /// `InvalidChannelConfig` when the configuration is not a list of entries.
    pub fn channel_entries(&self) -> Result<Vec<ChannelEntry>, ValidationError> {
        if self.config.is_null() {
            return Ok(Vec::new());
        }
        if !self.config.is_array() {
            return Err(ValidationError::InvalidChannelConfig {
                reason: format!("subscription {}: expected an array of channel entries", self.id),
            });
        }
        serde_json::from_value(self.config.clone()).map_err(|e| {
            ValidationError::InvalidChannelConfig {
                reason: format!("subscription {}: {e}", self.id),
            }
        })
    }

    /// True if any channel entry points at `config_id` of destination `dest`.
    #[must_use]
    pub fn references_channel(&self, config_id: u64, dest: &str) -> bool {
        self.channel_entries()
            .map(|entries| {
                entries
                    .iter()
                    .any(|e| e.config_id == config_id && e.dest == dest)
            })
            .unwrap_or(false)
    }
}

/// One destination inside a subscription's channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Destination kind (`slack`, `ses`, `smtp`, `webhook`, ...).
    pub dest: String,
    #[serde(default)]
    pub rule: String,
    /// Id of the channel configuration within its destination kind.
    #[serde(rename = "configId", default)]
    pub config_id: u64,
    #[serde(default)]
    pub recipient: String,
}

/// Builder for [`Subscription`].
#[derive(Debug, Clone, Default)]
pub struct SubscriptionBuilder {
    id: Option<SubscriptionId>,
    scope: ScopeFields,
    pipeline_type: Option<PipelineType>,
    event_type: Option<EventTypeId>,
    config: serde_json::Value,
    rule_id: RuleId,
    view_id: ViewId,
}

impl SubscriptionBuilder {
    /// Sets the subscription id. Required.
    #[must_use]
    pub fn id(mut self, id: SubscriptionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Binds the team coordinate.
    #[must_use]
    pub fn team(mut self, team: TeamId) -> Self {
        self.scope.team = Some(team);
        self
    }

    /// Binds the application coordinate.
    #[must_use]
    pub fn app(mut self, app: AppId) -> Self {
        self.scope.app = Some(app);
        self
    }

    /// Binds the env coordinate to a concrete env or a sentinel group.
    #[must_use]
    pub fn env(mut self, env: impl Into<EnvScope>) -> Self {
        self.scope.env = Some(env.into());
        self
    }

    /// Binds the pipeline coordinate.
    #[must_use]
    pub fn pipeline(mut self, pipeline: PipelineId) -> Self {
        self.scope.pipeline = Some(pipeline);
        self
    }

    /// Binds the cluster coordinate.
    #[must_use]
    pub fn cluster(mut self, cluster: ClusterId) -> Self {
        self.scope.cluster = Some(cluster);
        self
    }

    /// Replaces the whole scope.
    #[must_use]
    pub fn scope(mut self, scope: ScopeFields) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the pipeline type. Required.
    #[must_use]
    pub fn pipeline_type(mut self, pipeline_type: PipelineType) -> Self {
        self.pipeline_type = Some(pipeline_type);
        self
    }

    /// Sets the event type. Required.
    #[must_use]
    pub fn event_type(mut self, event_type: EventTypeId) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Sets the opaque channel configuration.
    #[must_use]
    pub fn config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Links a shared recipient rule.
    #[must_use]
    pub fn rule_id(mut self, rule_id: RuleId) -> Self {
        self.rule_id = rule_id;
        self
    }

    /// Groups the subscription under an authoring view.
    #[must_use]
    pub fn view_id(mut self, view_id: ViewId) -> Self {
        self.view_id = view_id;
        self
    }

    /// Builds the subscription.
    ///
    /// # Errors
    /// `MissingField` when the id, pipeline type or event type is not set.
    pub fn build(self) -> Result<Subscription, ValidationError> {
        Ok(Subscription {
            id: self.id.ok_or(ValidationError::MissingField { field: "id" })?,
            scope: self.scope,
            pipeline_type: self
                .pipeline_type
                .ok_or(ValidationError::MissingField { field: "pipeline_type" })?,
            event_type: self
                .event_type
                .ok_or(ValidationError::MissingField { field: "event_type" })?,
            config: self.config,
            rule_id: self.rule_id,
            view_id: self.view_id,
        })
    }
}
