//! The canonical IDQL policy.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::action_info::ActionInfo;
use super::condition::Condition;
use super::meta::Meta;
use super::object::Object;
use super::subject::Subject;

/// One IDQL policy: who (`subject`) may do what (`actions`) to which resource (`object`),
/// optionally only when `condition` holds. A policy without a condition applies
/// unconditionally.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct PolicyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
    #[serde(default)]
    pub subject: Subject,
    #[serde(default)]
    pub actions: Vec<ActionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Object>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl PolicyInfo {
    /// A policy needs at least actions or an object to grant anything.
    pub fn is_actionable(&self) -> bool {
        !self.actions.is_empty() || self.object.is_some()
    }

    pub fn included_actions(&self) -> impl Iterator<Item = &ActionInfo> {
        self.actions.iter().filter(|a| !a.exclude)
    }

    pub fn excluded_actions(&self) -> impl Iterator<Item = &ActionInfo> {
        self.actions.iter().filter(|a| a.exclude)
    }

    /// True when the policy has actions and every one of them is excluded, i.e. it only denies.
    pub fn is_wholly_excluded(&self) -> bool {
        !self.actions.is_empty() && self.actions.iter().all(|a| a.exclude)
    }

    /// The resource id of the object, empty when there is no object.
    pub fn resource_id(&self) -> &str {
        self.object.as_ref().map(Object::resource_id).unwrap_or_default()
    }

    /// A human label: the policy id, or `#<index>` if the policy has none.
    pub fn label(&self, index: usize) -> String {
        match &self.id {
            Some(id) => format!("'{id}'"),
            None => format!("#{index}"),
        }
    }
}
