//! Role bindings and per-resource binding assignments.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A role granted to a set of principals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl Binding {
    pub fn new(role: impl Into<String>) -> Self {
        Binding {
            role: role.into(),
            members: Vec::new(),
        }
    }

    /// Add a member unless it is already present. Members keep first-insertion order.
    pub fn add_member(&mut self, member: &str) {
        if !self.members.iter().any(|m| m == member) {
            self.members.push(member.to_string());
        }
    }
}

/// The bindings of one resource. Roles are unique within an assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct BindAssignment {
    /// Empty when the assignment was synthesized around a lone binding.
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl BindAssignment {
    pub fn new(resource_id: impl Into<String>) -> Self {
        BindAssignment {
            resource_id: resource_id.into(),
            bindings: Vec::new(),
        }
    }

    /// The binding for `role`, appended if the role is not bound yet.
    pub fn binding_mut(&mut self, role: &str) -> &mut Binding {
        let index = match self.bindings.iter().position(|b| b.role == role) {
            Some(index) => index,
            None => {
                self.bindings.push(Binding::new(role));
                self.bindings.len() - 1
            }
        };
        &mut self.bindings[index]
    }

    pub fn binding(&self, role: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.role == role)
    }
}
