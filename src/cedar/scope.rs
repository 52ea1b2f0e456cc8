//! Principal, action and resource scope constraints.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

use super::entity::EntityUid;
use crate::error::MapperError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Unconstrained
    All,
    /// `== Type::"id"`
    Eq(EntityUid),
    /// `in Type::"id"`
    In(EntityUid),
    /// `in [A::"a", A::"b"]`, only meaningful for actions
    InSet(Vec<EntityUid>),
    /// `is Type`
    Is(String),
    /// `is Type in Other::"id"`
    IsIn(String, EntityUid),
}

impl Scope {
    pub fn to_json(&self) -> Value {
        match self {
            Scope::All => json!({"op": "All"}),
            Scope::Eq(uid) => json!({"op": "==", "entity": uid.to_json()}),
            Scope::In(uid) => json!({"op": "in", "entity": uid.to_json()}),
            Scope::InSet(uids) => json!({
                "op": "in",
                "entities": uids.iter().map(EntityUid::to_json).collect::<Vec<_>>(),
            }),
            Scope::Is(entity_type) => json!({"op": "is", "entity_type": entity_type}),
            Scope::IsIn(entity_type, uid) => json!({
                "op": "is",
                "entity_type": entity_type,
                "in": {"entity": uid.to_json()},
            }),
        }
    }

    pub fn from_json(value: &Value) -> Result<Scope, MapperError> {
        let op = value
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MapperError::UnsupportedNodeType(format!("scope without 'op': {value}"))
            })?;
        let entity = |v: &Value| v.get("entity").map(EntityUid::from_json).transpose();
        match op {
            "All" => Ok(Scope::All),
            "==" => entity(value)?.map(Scope::Eq).ok_or_else(|| missing(op, "entity")),
            "in" => match (entity(value)?, value.get("entities")) {
                (Some(uid), None) => Ok(Scope::In(uid)),
                (None, Some(Value::Array(items))) => Ok(Scope::InSet(
                    items
                        .iter()
                        .map(EntityUid::from_json)
                        .collect::<Result<_, _>>()?,
                )),
                _ => Err(missing(op, "entity or entities")),
            },
            "is" => {
                let entity_type = value
                    .get("entity_type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing(op, "entity_type"))?
                    .to_string();
                match value.get("in") {
                    Some(container) => {
                        let uid = entity(container)?.ok_or_else(|| missing("is ... in", "entity"))?;
                        Ok(Scope::IsIn(entity_type, uid))
                    }
                    None => Ok(Scope::Is(entity_type)),
                }
            }
            other => Err(MapperError::UnsupportedNodeType(format!("scope op '{other}'"))),
        }
    }
}

fn missing(op: &str, what: &str) -> MapperError {
    MapperError::UnsupportedNodeType(format!("scope '{op}' is missing {what}"))
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Scope::from_json(&value).map_err(serde::de::Error::custom)
    }
}
