//! Whole Cedar policies in their JSON form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};
use tracing::debug;

use super::node::Node;
use super::scope::Scope;
use crate::error::MapperError;
use crate::loader::json_kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Effect {
    Permit,
    Forbid,
}

impl Effect {
    pub fn from_permit(permit: bool) -> Self {
        if permit { Effect::Permit } else { Effect::Forbid }
    }

    pub fn is_permit(self) -> bool {
        self == Effect::Permit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConditionKind {
    When,
    Unless,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CedarCondition {
    pub kind: ConditionKind,
    pub body: Node,
}

impl CedarCondition {
    pub fn when(body: Node) -> Self {
        CedarCondition {
            kind: ConditionKind::When,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CedarPolicy {
    pub effect: Effect,
    /// Key/value pairs in source order; keys are unique.
    pub annotations: Vec<(String, String)>,
    pub principal: Scope,
    pub action: Scope,
    pub resource: Scope,
    pub conditions: Vec<CedarCondition>,
}

impl CedarPolicy {
    pub fn new(effect: Effect, principal: Scope, action: Scope, resource: Scope) -> Self {
        CedarPolicy {
            effect,
            annotations: Vec::new(),
            principal,
            action,
            resource,
            conditions: Vec::new(),
        }
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an annotation, replacing an existing value for the same key.
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.annotations.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.annotations.push((key, value)),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("effect".into(), Value::String(self.effect.to_string()));
        if !self.annotations.is_empty() {
            map.insert(
                "annotations".into(),
                Value::Object(
                    self.annotations
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
            );
        }
        map.insert("principal".into(), self.principal.to_json());
        map.insert("action".into(), self.action.to_json());
        map.insert("resource".into(), self.resource.to_json());
        map.insert(
            "conditions".into(),
            Value::Array(
                self.conditions
                    .iter()
                    .map(|c| {
                        serde_json::json!({"kind": c.kind.to_string(), "body": c.body.to_json()})
                    })
                    .collect(),
            ),
        );
        Value::Object(map)
    }

    pub fn from_json(value: &Value) -> Result<CedarPolicy, MapperError> {
        let obj = value.as_object().ok_or_else(|| {
            MapperError::ParseError(format!("policy must be an object, got {}", json_kind(value)))
        })?;
        let effect = obj
            .get("effect")
            .and_then(Value::as_str)
            .ok_or_else(|| MapperError::ParseError("policy has no effect".to_string()))?;
        let effect = effect
            .parse::<Effect>()
            .map_err(|_| MapperError::ParseError(format!("unknown effect '{effect}'")))?;

        let annotations = match obj.get("annotations") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    Value::Null => Ok((k.clone(), String::new())),
                    other => Err(MapperError::ParseError(format!(
                        "annotation '{k}' must be a string, got {}",
                        json_kind(other)
                    ))),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(MapperError::ParseError(format!(
                    "annotations must be an object, got {}",
                    json_kind(other)
                )));
            }
        };

        let scope = |name: &str| match obj.get(name) {
            Some(v) => Scope::from_json(v),
            None => Err(MapperError::ParseError(format!("policy has no {name} scope"))),
        };

        let conditions = match obj.get("conditions") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(condition_from_json)
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(MapperError::ParseError(format!(
                    "conditions must be an array, got {}",
                    json_kind(other)
                )));
            }
        };

        Ok(CedarPolicy {
            effect,
            annotations,
            principal: scope("principal")?,
            action: scope("action")?,
            resource: scope("resource")?,
            conditions,
        })
    }
}

fn condition_from_json(value: &Value) -> Result<CedarCondition, MapperError> {
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .and_then(|k| k.parse::<ConditionKind>().ok())
        .ok_or_else(|| MapperError::UnsupportedNodeType(format!("condition kind in {value}")))?;
    let body = value
        .get("body")
        .ok_or_else(|| MapperError::ParseError("condition has no body".to_string()))?;
    Ok(CedarCondition {
        kind,
        body: Node::from_json(body)?,
    })
}

impl Serialize for CedarPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CedarPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        CedarPolicy::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Parse Cedar JSON policies.
///
/// Accepts a single policy, an array of policies, or a policy-set document with a
/// `staticPolicies` map (taken in key order).
pub fn parse_cedar_json(bytes: &[u8]) -> Result<Vec<CedarPolicy>, MapperError> {
    let document: Value = serde_json::from_slice(bytes)?;
    let policies = match &document {
        Value::Array(items) => items
            .iter()
            .map(CedarPolicy::from_json)
            .collect::<Result<Vec<_>, _>>()?,
        Value::Object(obj) => match obj.get("staticPolicies") {
            Some(Value::Object(set)) => set
                .values()
                .map(CedarPolicy::from_json)
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(MapperError::ParseError(format!(
                    "staticPolicies must be an object, got {}",
                    json_kind(other)
                )));
            }
            None => vec![CedarPolicy::from_json(&document)?],
        },
        other => {
            return Err(MapperError::ParseError(format!(
                "expected a policy or a list of policies, got {}",
                json_kind(other)
            )));
        }
    };
    debug!(event = "Parse", format = "cedar-json", policies = policies.len());
    Ok(policies)
}
