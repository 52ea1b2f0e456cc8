//! JSON policy-tree codec for expression nodes.
//!
//! Every node is an object with exactly one key naming its kind or operator. Nodes with
//! zero or several keys, and operators outside the closed sets, are rejected with
//! [`MapperError::UnsupportedNodeType`]. `decimal`/`ip` literals are written as calls to
//! their constructor and read back as typed literals, so a second pass is a no-op.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

use super::entity::EntityUid;
use super::node::{BinaryOp, ExtensionFn, Literal, Node, PatternElem, StrOp, Var};
use crate::error::MapperError;

fn unsupported(message: impl Into<String>) -> MapperError {
    MapperError::UnsupportedNodeType(message.into())
}

fn tagged(key: &str, body: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), body);
    Value::Object(map)
}

/// The single `(key, body)` entry of a node object.
pub(crate) fn single_entry<'a>(
    value: &'a Value,
    what: &str,
) -> Result<(&'a str, &'a Value), MapperError> {
    let obj = value
        .as_object()
        .ok_or_else(|| unsupported(format!("{what} must be an object, got {value}")))?;
    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some((key, body)), None) => Ok((key.as_str(), body)),
        (None, _) => Err(unsupported(format!("{what} has no operator key"))),
        (Some(_), Some(_)) => Err(unsupported(format!(
            "{what} has more than one operator key: {}",
            obj.keys().cloned().collect::<Vec<_>>().join(", ")
        ))),
    }
}

fn field<'a>(body: &'a Value, op: &str, name: &str) -> Result<&'a Value, MapperError> {
    body.get(name)
        .ok_or_else(|| unsupported(format!("'{op}' node is missing '{name}'")))
}

fn child(body: &Value, op: &str, name: &str) -> Result<Box<Node>, MapperError> {
    Ok(Box::new(Node::from_json(field(body, op, name)?)?))
}

fn string_field(body: &Value, op: &str, name: &str) -> Result<String, MapperError> {
    field(body, op, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| unsupported(format!("'{op}' node field '{name}' must be a string")))
}

fn nodes(items: &Value, op: &str) -> Result<Vec<Node>, MapperError> {
    items
        .as_array()
        .ok_or_else(|| unsupported(format!("'{op}' node must hold an array")))?
        .iter()
        .map(Node::from_json)
        .collect()
}

impl Literal {
    pub fn to_json(&self) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Long(n) => Value::from(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Entity(uid) => json!({"__entity": uid.to_json()}),
            Literal::Set(items) => Value::Array(items.iter().map(Literal::to_json).collect()),
            Literal::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Literal::Decimal(s) => json!({"__extn": {"fn": "decimal", "arg": s}}),
            Literal::Ip(s) => json!({"__extn": {"fn": "ip", "arg": s}}),
        }
    }

    pub fn from_json(value: &Value) -> Result<Literal, MapperError> {
        match value {
            Value::Bool(b) => Ok(Literal::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Literal::Long)
                .ok_or_else(|| unsupported(format!("non-integer literal {n}"))),
            Value::String(s) => Ok(Literal::String(s.clone())),
            Value::Array(items) => Ok(Literal::Set(
                items
                    .iter()
                    .map(Literal::from_json)
                    .collect::<Result<_, _>>()?,
            )),
            Value::Object(obj) => {
                if let Some(entity) = obj.get("__entity") {
                    return EntityUid::from_json(entity).map(Literal::Entity);
                }
                if let Some(extension) = obj.get("__extn") {
                    return extension_literal(extension);
                }
                Ok(Literal::Record(
                    obj.iter()
                        .map(|(k, v)| Ok((k.clone(), Literal::from_json(v)?)))
                        .collect::<Result<BTreeMap<_, _>, MapperError>>()?,
                ))
            }
            Value::Null => Err(unsupported("null is not a literal")),
        }
    }
}

fn extension_literal(value: &Value) -> Result<Literal, MapperError> {
    let function = value.get("fn").and_then(Value::as_str);
    let arg = value.get("arg").and_then(Value::as_str);
    match (function, arg) {
        (Some("decimal"), Some(arg)) => Ok(Literal::Decimal(arg.to_string())),
        (Some("ip"), Some(arg)) => Ok(Literal::Ip(arg.to_string())),
        _ => Err(unsupported(format!("extension literal {value}"))),
    }
}

impl PatternElem {
    pub fn to_json(&self) -> Value {
        match self {
            PatternElem::Literal(s) => json!({"Literal": s}),
            PatternElem::Wildcard => Value::String("Wildcard".to_string()),
        }
    }

    pub fn from_json(value: &Value) -> Result<PatternElem, MapperError> {
        match value {
            Value::String(s) if s == "Wildcard" => Ok(PatternElem::Wildcard),
            Value::Object(_) => match single_entry(value, "pattern element")? {
                ("Literal", Value::String(s)) => Ok(PatternElem::Literal(s.clone())),
                _ => Err(unsupported(format!("pattern element {value}"))),
            },
            _ => Err(unsupported(format!("pattern element {value}"))),
        }
    }
}

/// Older trees write patterns as a glob string; `\*` is a literal star.
fn glob_pattern(glob: &str) -> Vec<PatternElem> {
    let mut out = Vec::new();
    let mut literal = String::new();
    let mut chars = glob.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => literal.push(escaped),
                None => literal.push('\\'),
            },
            '*' => {
                if !literal.is_empty() {
                    out.push(PatternElem::Literal(std::mem::take(&mut literal)));
                }
                out.push(PatternElem::Wildcard);
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        out.push(PatternElem::Literal(literal));
    }
    out
}

impl Node {
    pub fn to_json(&self) -> Value {
        match self {
            Node::Value(Literal::Decimal(s)) => constructor_call(ExtensionFn::Decimal, s),
            Node::Value(Literal::Ip(s)) => constructor_call(ExtensionFn::Ip, s),
            Node::Value(literal) => tagged("Value", literal.to_json()),
            Node::Var(var) => tagged("Var", Value::String(var.to_string())),
            Node::Not(arg) => tagged("!", json!({"arg": arg.to_json()})),
            Node::Negate(arg) => tagged("neg", json!({"arg": arg.to_json()})),
            Node::Binary { op, left, right } => tagged(
                op.as_ref(),
                json!({"left": left.to_json(), "right": right.to_json()}),
            ),
            Node::StrOp { op, left, attr } => {
                tagged(op.as_ref(), json!({"left": left.to_json(), "attr": attr}))
            }
            Node::Is { left, entity_type } => tagged(
                "is",
                json!({"left": left.to_json(), "entity_type": entity_type}),
            ),
            Node::IsIn {
                left,
                entity_type,
                entity,
            } => tagged(
                "is",
                json!({"left": left.to_json(), "entity_type": entity_type, "in": entity.to_json()}),
            ),
            Node::Like { left, pattern } => tagged(
                "like",
                json!({
                    "left": left.to_json(),
                    "pattern": pattern.iter().map(PatternElem::to_json).collect::<Vec<_>>(),
                }),
            ),
            Node::IfThenElse {
                cond,
                then,
                otherwise,
            } => tagged(
                "if-then-else",
                json!({"if": cond.to_json(), "then": then.to_json(), "else": otherwise.to_json()}),
            ),
            Node::Set(items) => {
                tagged("Set", Value::Array(items.iter().map(Node::to_json).collect()))
            }
            Node::Record(fields) => tagged(
                "Record",
                Value::Object(fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
            ),
            Node::ExtensionCall { function, args } => tagged(
                function.as_ref(),
                Value::Array(args.iter().map(Node::to_json).collect()),
            ),
        }
    }

    pub fn from_json(value: &Value) -> Result<Node, MapperError> {
        let (key, body) = single_entry(value, "expression node")?;
        match key {
            "Value" => Ok(Node::Value(Literal::from_json(body)?)),
            "Var" => body
                .as_str()
                .and_then(|s| Var::from_str(s).ok())
                .map(Node::Var)
                .ok_or_else(|| unsupported(format!("variable {body}"))),
            "!" => Ok(Node::Not(child(body, key, "arg")?)),
            "neg" => Ok(Node::Negate(child(body, key, "arg")?)),
            "is" => {
                let left = child(body, key, "left")?;
                let entity_type = string_field(body, key, "entity_type")?;
                match body.get("in") {
                    Some(entity) => Ok(Node::IsIn {
                        left,
                        entity_type,
                        entity: Box::new(Node::from_json(entity)?),
                    }),
                    None => Ok(Node::Is { left, entity_type }),
                }
            }
            "like" => {
                let left = child(body, key, "left")?;
                let pattern = match field(body, key, "pattern")? {
                    Value::String(glob) => glob_pattern(glob),
                    Value::Array(items) => items
                        .iter()
                        .map(PatternElem::from_json)
                        .collect::<Result<_, _>>()?,
                    other => return Err(unsupported(format!("like pattern {other}"))),
                };
                Ok(Node::Like { left, pattern })
            }
            "if-then-else" => Ok(Node::IfThenElse {
                cond: child(body, key, "if")?,
                then: child(body, key, "then")?,
                otherwise: child(body, key, "else")?,
            }),
            "Set" => Ok(Node::Set(nodes(body, key)?)),
            "Record" => {
                let fields = body
                    .as_object()
                    .ok_or_else(|| unsupported("'Record' node must hold an object"))?;
                Ok(Node::Record(
                    fields
                        .iter()
                        .map(|(k, v)| Ok((k.clone(), Node::from_json(v)?)))
                        .collect::<Result<BTreeMap<_, _>, MapperError>>()?,
                ))
            }
            other => {
                if let Ok(op) = BinaryOp::from_str(other) {
                    Ok(Node::Binary {
                        op,
                        left: child(body, other, "left")?,
                        right: child(body, other, "right")?,
                    })
                } else if let Ok(op) = StrOp::from_str(other) {
                    Ok(Node::StrOp {
                        op,
                        left: child(body, other, "left")?,
                        attr: string_field(body, other, "attr")?,
                    })
                } else if let Ok(function) = ExtensionFn::from_str(other) {
                    extension_call(function, nodes(body, other)?)
                } else {
                    Err(unsupported(format!("operator '{other}'")))
                }
            }
        }
    }
}

fn constructor_call(function: ExtensionFn, arg: &str) -> Value {
    tagged(function.as_ref(), json!([{"Value": arg}]))
}

fn extension_call(function: ExtensionFn, args: Vec<Node>) -> Result<Node, MapperError> {
    if let [Node::Value(Literal::String(arg))] = args.as_slice() {
        match function {
            ExtensionFn::Decimal => return Ok(Node::Value(Literal::Decimal(arg.clone()))),
            ExtensionFn::Ip => return Ok(Node::Value(Literal::Ip(arg.clone()))),
            _ => {}
        }
    }
    Ok(Node::ExtensionCall { function, args })
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Node::from_json(&value).map_err(serde::de::Error::custom)
    }
}
