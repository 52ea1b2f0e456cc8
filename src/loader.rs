use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::MapperError;
use crate::types::{PolicyInfo, PolicySet};

/// Parse IDQL policy JSON into a `PolicySet`.
///
/// The input is either a JSON array of policies or a single policy object, which is
/// wrapped into a one-element set. Every policy must name at least actions or an object.
///
/// Example:
/// ```rust
/// use idql_mapper::parse_policies;
/// let json = br#"{
///     "subject": {"members": ["user:alice@example.com"]},
///     "actions": [{"name": "view", "actionUri": "gcp:roles/viewer"}],
///     "object": {"assetId": "backend-1"}
/// }"#;
/// let set = parse_policies(json).unwrap();
/// assert_eq!(set.len(), 1);
/// ```
pub fn parse_policies(bytes: &[u8]) -> Result<PolicySet, MapperError> {
    let document: Value = serde_json::from_slice(bytes)?;

    let items = match document {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => {
            return Err(MapperError::ParseError(format!(
                "expected a policy object or an array of policies, found {}",
                json_kind(&other)
            )));
        }
    };

    let policies = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_policy(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(event = "Load", phase = "Parsed", policies = policies.len());
    Ok(PolicySet::new(policies))
}

/// Read a file and parse it with [`parse_policies`].
pub fn parse_policy_file(path: impl AsRef<Path>) -> Result<PolicySet, MapperError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(event = "Load", phase = "Read", path = %path.display(), bytes = bytes.len());
    parse_policies(&bytes)
}

/// Render a policy set as pretty-printed JSON, in set order.
pub fn serialize_policies(policies: &PolicySet) -> Result<String, MapperError> {
    Ok(serde_json::to_string_pretty(policies)?)
}

fn parse_policy(index: usize, item: Value) -> Result<PolicyInfo, MapperError> {
    if !item.is_object() {
        return Err(MapperError::ParseError(format!(
            "policy #{index}: expected an object, found {}",
            json_kind(&item)
        )));
    }

    let policy: PolicyInfo = serde_json::from_value(item)
        .map_err(|e| MapperError::ParseError(format!("policy #{index}: {e}")))?;

    if !policy.is_actionable() {
        return Err(MapperError::ParseError(format!(
            "policy #{index}: a policy needs actions or an object"
        )));
    }
    Ok(policy)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionInfo, ConditionAction, Object};
    use yare::parameterized;

    const TWO_POLICIES: &str = r#"[
        {
            "id": "viewers",
            "meta": {"version": "0.7", "applicationId": "photoapp"},
            "subject": {"members": ["user:alice@example.com", "group:staff@example.com"]},
            "actions": [{"name": "view", "actionUri": "gcp:roles/iap.httpsResourceAccessor"}],
            "object": {"assetId": "backend-1", "pathSpec": "/photos"}
        },
        {
            "subject": {"members": ["user:bob@example.com"]},
            "actions": [{"name": "edit", "actionUri": "http:PUT", "exclude": true}],
            "object": {"assetId": "backend-1"},
            "condition": {"rule": "req.ip sw 10.", "action": "deny"}
        }
    ]"#;

    #[test]
    fn test_parse_policy_array() {
        let set = parse_policies(TWO_POLICIES.as_bytes()).unwrap();
        assert_eq!(set.len(), 2);

        let first = &set.policies()[0];
        assert_eq!(first.id.as_deref(), Some("viewers"));
        assert_eq!(first.meta.application_id.as_deref(), Some("photoapp"));
        assert_eq!(first.subject.members.len(), 2);
        assert_eq!(
            first.object,
            Some(Object {
                asset_id: Some("backend-1".into()),
                path_spec: Some("/photos".into())
            })
        );

        let second = &set.policies()[1];
        assert_eq!(second.actions, vec![ActionInfo::new("edit", "http:PUT").excluded()]);
        assert_eq!(
            second.condition.as_ref().map(|c| c.action),
            Some(ConditionAction::Deny)
        );
    }

    #[test]
    fn test_parse_single_policy_is_wrapped() {
        let json = r#"{"actions": [{"name": "view"}]}"#;
        let set = parse_policies(json.as_bytes()).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.policies()[0].object.is_none());
    }

    #[test]
    fn test_serialize_then_parse_is_identity() {
        let set = parse_policies(TWO_POLICIES.as_bytes()).unwrap();
        let text = serialize_policies(&set).unwrap();
        let again = parse_policies(text.as_bytes()).unwrap();
        assert_eq!(set, again);
    }

    #[parameterized(
        not_json = { "{ this is not json" },
        a_string = { r#""policy""# },
        a_number = { "42" },
        array_of_numbers = { "[1, 2]" },
        missing_actions_and_object = { r#"{"subject": {"members": ["user:alice"]}}"# },
        bad_condition_action = {
            r#"{"actions": [{"name": "x"}], "condition": {"rule": "r", "action": "maybe"}}"#
        },
    )]
    fn test_parse_rejects(input: &str) {
        let result = parse_policies(input.as_bytes());
        assert!(
            matches!(result, Err(MapperError::ParseError(_))),
            "expected ParseError, got {result:?}"
        );
    }

    #[test]
    fn test_parse_policy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policies.json");
        fs::write(&path, TWO_POLICIES).unwrap();
        assert_eq!(parse_policy_file(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_policy_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = parse_policy_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(MapperError::IoError(_))));
    }
}
