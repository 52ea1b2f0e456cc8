//! Policy subjects.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The principals a policy applies to.
///
/// Members are provider-style principal strings such as `user:alice@example.com`,
/// `group:admins@example.com`, `domain:example.com` or the wildcards `any` and
/// `anyAuthenticated`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub subject_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

impl Subject {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Subject {
            members: members.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// A copy with members sorted and deduplicated.
    pub fn normalized(&self) -> Subject {
        Subject {
            subject_type: self.subject_type.clone(),
            provider_id: self.provider_id.clone(),
            members: self.members.iter().cloned().sorted().dedup().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_normalized_ignores_order_and_duplicates() {
        let a = Subject::new(["user:bob", "user:alice", "user:bob"]);
        let b = Subject::new(["user:alice", "user:bob"]);
        assert_ne!(a, b);
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn test_subject_serialization_uses_type_key() {
        let subject = Subject {
            subject_type: Some("user".to_string()),
            provider_id: Some("google".to_string()),
            members: vec!["user:alice".to_string()],
        };
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "user", "providerId": "google", "members": ["user:alice"]})
        );
        let back: Subject = serde_json::from_value(json).unwrap();
        assert_eq!(back, subject);
    }
}
