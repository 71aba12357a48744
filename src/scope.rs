//! Scope model: the attribute space subscriptions and events are compared over.
//!
//! A scope coordinate is either bound to a concrete id or unbound (`None`).
//! The environment coordinate of a subscription may additionally hold an
//! [`EnvSentinel`], a dynamic group that follows environments as they are
//! flagged production or non-production.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! scope_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
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

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

scope_id!(
    /// Identifier of a team (project).
    TeamId
);
scope_id!(
    /// Identifier of an application.
    AppId
);
scope_id!(
    /// Identifier of a concrete environment. Never a sentinel.
    EnvId
);
scope_id!(
    /// Identifier of a CI or CD pipeline.
    PipelineId
);
scope_id!(
    /// Identifier of a cluster.
    ClusterId
);

/// Execution kind a subscription targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineType {
    /// CI build pipeline.
    #[serde(rename = "CI")]
    Ci,
    /// CD deploy pipeline.
    #[serde(rename = "CD")]
    Cd,
    /// Webhook-triggered pipeline.
    #[serde(rename = "WEBHOOK")]
    Webhook,
}

impl PipelineType {
    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ci => "CI",
            Self::Cd => "CD",
            Self::Webhook => "WEBHOOK",
        }
    }

    /// Parses a possibly empty pipeline type string.
    ///
    /// An empty (or whitespace) string is "no pipeline type" and yields
    /// `Ok(None)`; queries without a pipeline type never match anything.
    ///
    /// # Errors
    /// `UnknownPipelineType` for any other unrecognised name.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, ValidationError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value.parse().map(Some)
    }
}

impl FromStr for PipelineType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CI" => Ok(Self::Ci),
            "CD" => Ok(Self::Cd),
            "WEBHOOK" => Ok(Self::Webhook),
            other => Err(ValidationError::UnknownPipelineType {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PipelineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dynamic environment groups a subscription can target instead of one env.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvSentinel {
    /// All existing and future production environments.
    AllProd,
    /// All existing and future non-production environments.
    AllNonProd,
}

impl EnvSentinel {
    /// Raw storage encoding of [`EnvSentinel::AllProd`].
    pub const ALL_PROD_RAW: i64 = -2;
    /// Raw storage encoding of [`EnvSentinel::AllNonProd`].
    pub const ALL_NON_PROD_RAW: i64 = -1;

    /// The group an environment with the given prod flag belongs to.
    #[must_use]
    pub const fn for_prod_flag(is_prod: bool) -> Self {
        if is_prod {
            Self::AllProd
        } else {
            Self::AllNonProd
        }
    }

    /// Raw integer used by persisted rows.
    #[must_use]
    pub const fn to_raw(self) -> i64 {
        match self {
            Self::AllProd => Self::ALL_PROD_RAW,
            Self::AllNonProd => Self::ALL_NON_PROD_RAW,
        }
    }

    /// Decodes a raw reserved integer.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            Self::ALL_PROD_RAW => Some(Self::AllProd),
            Self::ALL_NON_PROD_RAW => Some(Self::AllNonProd),
            _ => None,
        }
    }
}

/// Environment coordinate of a subscription: a concrete env or a dynamic group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvScope {
    /// One concrete environment.
    Env(EnvId),
    /// A dynamic prod / non-prod group.
    Sentinel(EnvSentinel),
}

impl EnvScope {
    /// The concrete env id, or `None` for a sentinel group.
    #[must_use]
    pub const fn concrete(self) -> Option<EnvId> {
        match self {
            Self::Env(id) => Some(id),
            Self::Sentinel(_) => None,
        }
    }

    /// Encodes to the raw persisted integer.
    ///
    /// Returns `None` if a concrete id does not fit the signed column.
    #[must_use]
    pub fn to_raw(self) -> Option<i64> {
        match self {
            Self::Env(id) => i64::try_from(id.get()).ok(),
            Self::Sentinel(s) => Some(s.to_raw()),
        }
    }

    /// Decodes a raw persisted integer; reserved negatives become sentinels.
    ///
    /// # Errors
    /// `InvalidId` for a negative value that is not a reserved sentinel.
    pub fn from_raw(raw: i64) -> Result<Self, ValidationError> {
        if let Some(sentinel) = EnvSentinel::from_raw(raw) {
            return Ok(Self::Sentinel(sentinel));
        }
        u64::try_from(raw)
            .map(|id| Self::Env(EnvId::new(id)))
            .map_err(|_| ValidationError::InvalidId { field: "env", raw })
    }
}

impl From<EnvId> for EnvScope {
    fn from(id: EnvId) -> Self {
        Self::Env(id)
    }
}

impl From<EnvSentinel> for EnvScope {
    fn from(sentinel: EnvSentinel) -> Self {
        Self::Sentinel(sentinel)
    }
}

/// The bound/unbound scope coordinates of a subscription.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScopeFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterId>,
}

impl ScopeFields {
    /// True when no coordinate is bound.
    #[must_use]
    pub const fn is_unbound(&self) -> bool {
        self.team.is_none()
            && self.app.is_none()
            && self.env.is_none()
            && self.pipeline.is_none()
            && self.cluster.is_none()
    }

    /// Number of bound coordinates.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        [
            self.team.is_some(),
            self.app.is_some(),
            self.env.is_some(),
            self.pipeline.is_some(),
            self.cluster.is_some(),
        ]
        .into_iter()
        .filter(|b| *b)
        .count()
    }
}
