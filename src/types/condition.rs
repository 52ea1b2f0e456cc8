//! Policy conditions.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// What happens when a condition's rule matches.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConditionAction {
    #[default]
    Allow,
    Deny,
    Audit,
}

/// A free-text boolean rule over request attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct Condition {
    pub rule: String,
    #[serde(default)]
    pub action: ConditionAction,
}

impl Condition {
    pub fn new(rule: impl Into<String>, action: ConditionAction) -> Self {
        Condition {
            rule: rule.into(),
            action,
        }
    }
}
