//! Cedar policy text, handled by the `cedar-policy` parser and pretty-printer.

use cedar_policy::{ParseErrors, Policy, PolicySet};
use tracing::debug;

use super::policy::CedarPolicy;
use crate::error::MapperError;

/// Compile Cedar policy text into a `PolicySet`.
///
/// Any Cedar parse errors are mapped into `MapperError::ParseError`.
///
/// Example:
/// ```rust
/// use idql_mapper::cedar::compile_policy;
/// let policy_text = r#"
///     permit (principal, action, resource);
///     forbid  (principal == User::"evil", action, resource);
/// "#;
/// let set = compile_policy(policy_text).unwrap();
/// assert_eq!(set.num_of_policies(), 2);
/// ```
pub fn compile_policy(text: &str) -> Result<PolicySet, MapperError> {
    text.parse()
        .map_err(|e: ParseErrors| MapperError::ParseError(e.to_string()))
}

/// Parse Cedar text into policy trees, in the order the policies appear.
pub fn parse_cedar_text(text: &str) -> Result<Vec<CedarPolicy>, MapperError> {
    let set = compile_policy(text)?;
    let mut policies: Vec<&Policy> = set.policies().collect();
    policies.sort_by_key(|p| source_position(p));
    let parsed = policies
        .into_iter()
        .map(|policy| {
            let json = policy
                .to_json()
                .map_err(|e| MapperError::ParseError(e.to_string()))?;
            CedarPolicy::from_json(&json)
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(event = "Parse", format = "cedar-text", policies = parsed.len());
    Ok(parsed)
}

/// Parsed policies are named `policy0`, `policy1`, ... in source order.
fn source_position(policy: &Policy) -> (usize, String) {
    let id = policy.id().to_string();
    let position = id
        .strip_prefix("policy")
        .and_then(|n| n.parse().ok())
        .unwrap_or(usize::MAX);
    (position, id)
}

/// Render policy trees as Cedar text, one policy per paragraph.
pub fn to_cedar_text(policies: &[CedarPolicy]) -> Result<String, MapperError> {
    let rendered = policies
        .iter()
        .map(|policy| {
            Policy::from_json(None, policy.to_json())
                .map(|p| p.to_string())
                .map_err(|e| MapperError::InvalidFormat(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join("\n\n"))
}
