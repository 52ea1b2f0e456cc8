//! Ordered collections of policies.

use serde::{Deserialize, Serialize};

use super::policy_info::PolicyInfo;

/// An ordered sequence of policies. Order survives parsing and serialization but is not
/// significant when comparing sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PolicySet(Vec<PolicyInfo>);

impl PolicySet {
    pub fn new(policies: Vec<PolicyInfo>) -> Self {
        PolicySet(policies)
    }

    pub fn policies(&self) -> &[PolicyInfo] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolicyInfo> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<PolicyInfo> {
        self.0
    }
}

impl From<Vec<PolicyInfo>> for PolicySet {
    fn from(policies: Vec<PolicyInfo>) -> Self {
        PolicySet(policies)
    }
}

impl FromIterator<PolicyInfo> for PolicySet {
    fn from_iter<I: IntoIterator<Item = PolicyInfo>>(iter: I) -> Self {
        PolicySet(iter.into_iter().collect())
    }
}

impl IntoIterator for PolicySet {
    type Item = PolicyInfo;
    type IntoIter = std::vec::IntoIter<PolicyInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PolicySet {
    type Item = &'a PolicyInfo;
    type IntoIter = std::slice::Iter<'a, PolicyInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
