//! Reading binding files that hold a lone binding, one assignment, or a list of assignments.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::MapperError;
use crate::loader::json_kind;

use super::binding::{BindAssignment, Binding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingShape {
    Binding,
    Assignment,
    AssignmentList,
}

fn sniff(document: &Value) -> Option<BindingShape> {
    match document {
        Value::Array(_) => Some(BindingShape::AssignmentList),
        Value::Object(obj) if obj.contains_key("resourceId") => Some(BindingShape::Assignment),
        Value::Object(obj) if obj.contains_key("role") => Some(BindingShape::Binding),
        _ => None,
    }
}

/// Parse binding JSON in any of its three shapes.
///
/// A lone `{role, members}` binding is wrapped into an assignment with an empty
/// `resourceId`; a `{resourceId, bindings}` assignment becomes a one-element list; an
/// array of assignments is returned as-is. An object is only taken for an assignment
/// when it carries `resourceId`.
pub fn parse_bindings(bytes: &[u8]) -> Result<Vec<BindAssignment>, MapperError> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| MapperError::ParseError(format!("binding input is not JSON: {e}")))?;

    let shape = sniff(&document).ok_or_else(|| {
        MapperError::ParseError(format!(
            "expected a binding, a bind assignment or an array of bind assignments, found {}",
            describe(&document)
        ))
    })?;
    debug!(event = "BindParse", phase = "Sniffed", shape = ?shape);

    match shape {
        BindingShape::Binding => {
            let binding: Binding = decode(document, "binding")?;
            Ok(vec![BindAssignment {
                resource_id: String::new(),
                bindings: vec![binding],
            }])
        }
        BindingShape::Assignment => Ok(vec![decode(document, "bind assignment")?]),
        BindingShape::AssignmentList => {
            let items: Vec<Value> = decode(document, "bind assignment list")?;
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match sniff(&item) {
                    Some(BindingShape::Assignment) => {
                        decode(item, &format!("bind assignment #{index}"))
                    }
                    _ => Err(MapperError::ParseError(format!(
                        "element #{index} is not a bind assignment, found {}",
                        describe(&item)
                    ))),
                })
                .collect()
        }
    }
}

/// Read a file and parse it with [`parse_bindings`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<BindAssignment>, MapperError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(event = "BindParse", phase = "Read", path = %path.display(), bytes = bytes.len());
    parse_bindings(&bytes)
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, MapperError> {
    serde_json::from_value(value)
        .map_err(|e| MapperError::ParseError(format!("invalid {what}: {e}")))
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(obj) => {
            let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
            format!("an object with keys [{}]", keys.join(", "))
        }
        other => json_kind(other).to_string(),
    }
}
