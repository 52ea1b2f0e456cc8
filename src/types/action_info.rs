//! Policy actions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One action of a policy. An excluded action is removed from the policy's grant.
#[derive(
    Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "camelCase")]
pub struct ActionInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub action_uri: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclude: bool,
}

impl ActionInfo {
    pub fn new(name: impl Into<String>, action_uri: impl Into<String>) -> Self {
        ActionInfo {
            name: name.into(),
            action_uri: action_uri.into(),
            exclude: false,
        }
    }

    /// The same action, marked as excluded.
    pub fn excluded(mut self) -> Self {
        self.exclude = true;
        self
    }

    /// The identifier mappers key on: the action URI, or the name when no URI is set.
    pub fn identifier(&self) -> &str {
        if self.action_uri.is_empty() {
            &self.name
        } else {
            &self.action_uri
        }
    }
}
