//! Entity references (`Type::"id"`).

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde_json::{Value, json};

use crate::error::MapperError;

/// A reference to one Cedar entity. The type may carry a namespace (`PhotoApp::User`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityUid {
    entity_type: String,
    id: String,
}

impl EntityUid {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        EntityUid {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Build with an optional namespace prefixed to the type.
    pub fn qualified(namespace: Option<&str>, entity_type: &str, id: impl Into<String>) -> Self {
        EntityUid::new(qualify(namespace, entity_type), id)
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parse the literal form `Ns::Type::"id"`. Returns `None` if `s` is not in that form.
    pub fn parse_literal(s: &str) -> Option<Self> {
        let (entity_type, quoted) = s.split_once("::\"")?;
        let id = quoted.strip_suffix('"')?;
        if entity_type.is_empty() || id.contains('"') {
            return None;
        }
        Some(EntityUid::new(entity_type, id))
    }

    pub fn to_json(&self) -> Value {
        json!({"type": self.entity_type, "id": self.id})
    }

    /// Accepts `{"type", "id"}` and the literal escape `{"__entity": {"type", "id"}}`.
    pub fn from_json(value: &Value) -> Result<Self, MapperError> {
        let value = value.get("__entity").unwrap_or(value);
        let field = |name: &str| {
            value.get(name).and_then(Value::as_str).ok_or_else(|| {
                MapperError::UnsupportedNodeType(format!(
                    "entity reference without '{name}': {value}"
                ))
            })
        };
        Ok(EntityUid::new(field("type")?, field("id")?))
    }
}

impl Display for EntityUid {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, r#"{}::"{}""#, self.entity_type, self.id.escape_debug())
    }
}

pub(crate) fn qualify(namespace: Option<&str>, entity_type: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}::{entity_type}"),
        _ => entity_type.to_string(),
    }
}
