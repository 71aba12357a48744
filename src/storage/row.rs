//! Raw persisted subscription rows.
//!
//! Relational backends keep scope columns as nullable signed integers, with the
//! env sentinels stored as reserved negatives, and the channel configuration as
//! JSON text. [`SubscriptionRow`] mirrors that layout so adapters can decode
//! rows into [`Subscription`] without knowing the typed model.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::EventTypeId;
use crate::scope::{AppId, ClusterId, EnvId, EnvScope, PipelineId, PipelineType, ScopeFields, TeamId};
use crate::subscription::{RuleId, Subscription, SubscriptionId, ViewId};

/// A subscription as stored in a relational table.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriptionRow {
    pub id: i64,
    pub team_id: Option<i64>,
    pub app_id: Option<i64>,
    /// Concrete env id, or `-2` (all prod) / `-1` (all non-prod).
    pub env_id: Option<i64>,
    pub pipeline_id: Option<i64>,
    pub cluster_id: Option<i64>,
    pub pipeline_type: String,
    pub event_type_id: i64,
    /// JSON text; empty means no configuration.
    pub config: String,
    pub notification_rule_id: i64,
    pub view_id: i64,
}

fn decode_id(field: &'static str, raw: i64) -> Result<u64, ValidationError> {
    u64::try_from(raw).map_err(|_| ValidationError::InvalidId { field, raw })
}

fn decode_opt<T: From<u64>>(field: &'static str, raw: Option<i64>) -> Result<Option<T>, ValidationError> {
    raw.map(|r| decode_id(field, r).map(T::from)).transpose()
}

fn encode_id(field: &'static str, value: u64) -> Result<i64, ValidationError> {
    i64::try_from(value).map_err(|_| ValidationError::IdOutOfRange { field, value })
}

fn encode_opt(field: &'static str, value: Option<u64>) -> Result<Option<i64>, ValidationError> {
    value.map(|v| encode_id(field, v)).transpose()
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = ValidationError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let id = SubscriptionId::new(decode_id("id", row.id)?);

        let pipeline_type = PipelineType::parse_optional(&row.pipeline_type)?
            .ok_or(ValidationError::MissingField { field: "pipeline_type" })?;

        let event_type = u32::try_from(row.event_type_id).map_err(|_| ValidationError::InvalidId {
            field: "event_type",
            raw: row.event_type_id,
        })?;

        let scope = ScopeFields {
            team: decode_opt::<TeamId>("team", row.team_id)?,
            app: decode_opt::<AppId>("app", row.app_id)?,
            env: row.env_id.map(EnvScope::from_raw).transpose()?,
            pipeline: decode_opt::<PipelineId>("pipeline", row.pipeline_id)?,
            cluster: decode_opt::<ClusterId>("cluster", row.cluster_id)?,
        };

        let config = if row.config.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&row.config).map_err(|e| ValidationError::InvalidChannelConfig {
                reason: format!("subscription {id}: {e}"),
            })?
        };

        Ok(Subscription {
            id,
            scope,
            pipeline_type,
            event_type: EventTypeId::new(event_type),
            config,
            rule_id: RuleId(decode_id("notification_rule", row.notification_rule_id)?),
            view_id: ViewId(decode_id("view", row.view_id)?),
        })
    }
}

impl TryFrom<&Subscription> for SubscriptionRow {
    type Error = ValidationError;

    fn try_from(sub: &Subscription) -> Result<Self, Self::Error> {
        // Only a concrete id can fall outside the signed column.
        let env_id = sub
            .scope
            .env
            .map(|env| {
                env.to_raw().ok_or_else(|| ValidationError::IdOutOfRange {
                    field: "env",
                    value: env.concrete().map_or(0, EnvId::get),
                })
            })
            .transpose()?;
        let config = if sub.config.is_null() {
            String::new()
        } else {
            sub.config.to_string()
        };

        Ok(Self {
            id: encode_id("id", sub.id.get())?,
            team_id: encode_opt("team", sub.scope.team.map(TeamId::get))?,
            app_id: encode_opt("app", sub.scope.app.map(AppId::get))?,
            env_id,
            pipeline_id: encode_opt("pipeline", sub.scope.pipeline.map(PipelineId::get))?,
            cluster_id: encode_opt("cluster", sub.scope.cluster.map(ClusterId::get))?,
            pipeline_type: sub.pipeline_type.as_str().to_string(),
            event_type_id: i64::from(sub.event_type.get()),
            config,
            notification_rule_id: encode_id("notification_rule", sub.rule_id.0)?,
            view_id: encode_id("view", sub.view_id.0)?,
        })
    }
}
