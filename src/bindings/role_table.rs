//! The action ↔ role lookup table used by the binding mapper.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MapperError;

/// Action URI prefix that carries a GCP role name verbatim, as in
/// `gcp:roles/iap.httpsResourceAccessor`.
pub const GCP_ACTION_PREFIX: &str = "gcp:";

/// One row of a [`RoleTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMapping {
    pub action: String,
    pub role: String,
}

/// A static, read-only table translating action URIs to roles and back.
///
/// An action maps to exactly one role; a role may be granted by several actions. With a
/// pass-through prefix, action URIs of the form `<prefix><role>` that have no table entry
/// map to `<role>`, and roles without an entry map back to `<prefix><role>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleTable {
    #[serde(default)]
    mappings: Vec<RoleMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    passthrough_prefix: Option<String>,
}

impl RoleTable {
    /// Build a table from `(action, role)` pairs.
    ///
    /// Fails with `MappingAmbiguity` if an action is mapped to two different roles.
    pub fn new<I, A, R>(pairs: I) -> Result<Self, MapperError>
    where
        I: IntoIterator<Item = (A, R)>,
        A: Into<String>,
        R: Into<String>,
    {
        let table = RoleTable {
            mappings: pairs
                .into_iter()
                .map(|(action, role)| RoleMapping {
                    action: action.into(),
                    role: role.into(),
                })
                .collect(),
            passthrough_prefix: None,
        };
        table.validate()?;
        Ok(table)
    }

    /// The table used for GCP IAP: no fixed rows, `gcp:` pass-through.
    pub fn gcp() -> Self {
        RoleTable {
            mappings: Vec::new(),
            passthrough_prefix: Some(GCP_ACTION_PREFIX.to_string()),
        }
    }

    pub fn with_passthrough_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.passthrough_prefix = Some(prefix.into());
        self
    }

    /// Load a table from its JSON form:
    /// `{"mappings": [{"action": "...", "role": "..."}], "passthroughPrefix": "gcp:"}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, MapperError> {
        let table: RoleTable = serde_json::from_slice(bytes)
            .map_err(|e| MapperError::ParseError(format!("role table: {e}")))?;
        table.validate()?;
        Ok(table)
    }

    pub fn mappings(&self) -> &[RoleMapping] {
        &self.mappings
    }

    pub fn role_for_action(&self, action: &str) -> Option<String> {
        if let Some(mapping) = self.mappings.iter().find(|m| m.action == action) {
            return Some(mapping.role.clone());
        }
        let prefix = self.passthrough_prefix.as_deref()?;
        action
            .strip_prefix(prefix)
            .filter(|role| !role.is_empty())
            .map(str::to_string)
    }

    /// Every action that grants `role`, in table order.
    pub fn actions_for_role(&self, role: &str) -> Result<Vec<String>, MapperError> {
        let actions: Vec<String> = self
            .mappings
            .iter()
            .filter(|m| m.role == role)
            .map(|m| m.action.clone())
            .collect();
        if !actions.is_empty() {
            return Ok(actions);
        }
        match &self.passthrough_prefix {
            Some(prefix) => Ok(vec![format!("{prefix}{role}")]),
            None => Err(MapperError::UnknownRole(role.to_string())),
        }
    }

    fn validate(&self) -> Result<(), MapperError> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for mapping in &self.mappings {
            if mapping.action.is_empty() || mapping.role.is_empty() {
                return Err(MapperError::InvalidFormat(format!(
                    "role table row with empty action or role: {mapping:?}"
                )));
            }
            match seen.insert(&mapping.action, &mapping.role) {
                Some(previous) if previous != mapping.role => {
                    return Err(MapperError::MappingAmbiguity(format!(
                        "action '{}' maps to both '{}' and '{}'",
                        mapping.action, previous, mapping.role
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn photo_table() -> RoleTable {
        RoleTable::new([
            ("http:GET", "roles/viewer"),
            ("http:HEAD", "roles/viewer"),
            ("http:PUT", "roles/editor"),
        ])
        .unwrap()
    }

    #[parameterized(
        get = { "http:GET", Some("roles/viewer") },
        head = { "http:HEAD", Some("roles/viewer") },
        put = { "http:PUT", Some("roles/editor") },
        unknown = { "http:DELETE", None },
        no_passthrough = { "gcp:roles/owner", None },
    )]
    fn test_role_for_action(action: &str, expected: Option<&str>) {
        assert_eq!(photo_table().role_for_action(action).as_deref(), expected);
    }

    #[test]
    fn test_actions_for_role_in_table_order() {
        assert_eq!(
            photo_table().actions_for_role("roles/viewer").unwrap(),
            vec!["http:GET", "http:HEAD"]
        );
    }

    #[test]
    fn test_unknown_role() {
        assert_eq!(
            photo_table().actions_for_role("roles/owner"),
            Err(MapperError::UnknownRole("roles/owner".to_string()))
        );
    }

    #[test]
    fn test_passthrough() {
        let table = photo_table().with_passthrough_prefix(GCP_ACTION_PREFIX);
        assert_eq!(
            table.role_for_action("gcp:roles/owner").as_deref(),
            Some("roles/owner")
        );
        assert_eq!(table.role_for_action("gcp:"), None);
        assert_eq!(
            table.actions_for_role("roles/owner").unwrap(),
            vec!["gcp:roles/owner"]
        );
        // Table rows still take precedence.
        assert_eq!(
            table.actions_for_role("roles/editor").unwrap(),
            vec!["http:PUT"]
        );
    }

    #[test]
    fn test_conflicting_rows_are_ambiguous() {
        let result = RoleTable::new([("http:GET", "roles/viewer"), ("http:GET", "roles/editor")]);
        assert!(matches!(result, Err(MapperError::MappingAmbiguity(_))));
    }

    #[test]
    fn test_repeated_identical_rows_are_accepted() {
        let repeated = [("http:GET", "roles/viewer"), ("http:GET", "roles/viewer")];
        assert!(RoleTable::new(repeated).is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = br#"{
            "mappings": [{"action": "http:GET", "role": "roles/viewer"}],
            "passthroughPrefix": "gcp:"
        }"#;
        let table = RoleTable::from_json(json).unwrap();
        assert_eq!(table.mappings().len(), 1);
        assert_eq!(table.role_for_action("gcp:roles/x").as_deref(), Some("roles/x"));
    }

    #[test]
    fn test_from_json_rejects_conflicts() {
        let json = br#"{"mappings": [
            {"action": "http:GET", "role": "roles/viewer"},
            {"action": "http:GET", "role": "roles/owner"}
        ]}"#;
        assert!(matches!(
            RoleTable::from_json(json),
            Err(MapperError::MappingAmbiguity(_))
        ));
    }
}
