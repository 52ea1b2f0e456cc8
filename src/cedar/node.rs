//! Expression trees for policy conditions.
//!
//! Operator sets are closed enums; the wire spelling of each operator is its strum
//! name, so the JSON codec in [`super::json`] is a lookup and never a string match
//! spread across the crate.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

use super::entity::EntityUid;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[_a-zA-Z][_a-zA-Z0-9]*$").expect("identifier pattern"));

pub(crate) fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, StrumDisplay, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Var {
    Principal,
    Action,
    Resource,
    Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, StrumDisplay, EnumIter)]
pub enum BinaryOp {
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanOrEqual,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanOrEqual,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "contains")]
    Contains,
    #[strum(serialize = "containsAll")]
    ContainsAll,
    #[strum(serialize = "containsAny")]
    ContainsAny,
    #[strum(serialize = "getTag")]
    GetTag,
    #[strum(serialize = "hasTag")]
    HasTag,
}

impl BinaryOp {
    /// Operators written as a method call on the left operand.
    pub fn is_method(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::ContainsAll | Self::ContainsAny | Self::GetTag | Self::HasTag
        )
    }
}

/// Operators taking an expression and an attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, StrumDisplay, EnumIter)]
pub enum StrOp {
    #[strum(serialize = ".")]
    Access,
    #[strum(serialize = "has")]
    Has,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, StrumDisplay, EnumIter)]
pub enum ExtensionFn {
    #[strum(serialize = "decimal")]
    Decimal,
    #[strum(serialize = "ip")]
    Ip,
    #[strum(serialize = "datetime")]
    Datetime,
    #[strum(serialize = "duration")]
    Duration,
    #[strum(serialize = "lessThan")]
    LessThan,
    #[strum(serialize = "lessThanOrEqual")]
    LessThanOrEqual,
    #[strum(serialize = "greaterThan")]
    GreaterThan,
    #[strum(serialize = "greaterThanOrEqual")]
    GreaterThanOrEqual,
    #[strum(serialize = "isIpv4")]
    IsIpv4,
    #[strum(serialize = "isIpv6")]
    IsIpv6,
    #[strum(serialize = "isLoopback")]
    IsLoopback,
    #[strum(serialize = "isMulticast")]
    IsMulticast,
    #[strum(serialize = "isInRange")]
    IsInRange,
    #[strum(serialize = "offset")]
    Offset,
    #[strum(serialize = "durationSince")]
    DurationSince,
    #[strum(serialize = "toDate")]
    ToDate,
    #[strum(serialize = "toTime")]
    ToTime,
    #[strum(serialize = "toDays")]
    ToDays,
    #[strum(serialize = "toHours")]
    ToHours,
    #[strum(serialize = "toMinutes")]
    ToMinutes,
    #[strum(serialize = "toSeconds")]
    ToSeconds,
    #[strum(serialize = "toMilliseconds")]
    ToMilliseconds,
}

impl ExtensionFn {
    /// Constructors are written as free functions, everything else as methods.
    pub fn is_constructor(&self) -> bool {
        matches!(
            self,
            Self::Decimal | Self::Ip | Self::Datetime | Self::Duration
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Long(i64),
    String(String),
    Entity(EntityUid),
    Set(Vec<Literal>),
    Record(BTreeMap<String, Literal>),
    Decimal(String),
    Ip(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternElem {
    Literal(String),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Value(Literal),
    Var(Var),
    Not(Box<Node>),
    Negate(Box<Node>),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    StrOp {
        op: StrOp,
        left: Box<Node>,
        attr: String,
    },
    Is {
        left: Box<Node>,
        entity_type: String,
    },
    IsIn {
        left: Box<Node>,
        entity_type: String,
        entity: Box<Node>,
    },
    Like {
        left: Box<Node>,
        pattern: Vec<PatternElem>,
    },
    IfThenElse {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    Set(Vec<Node>),
    Record(BTreeMap<String, Node>),
    ExtensionCall {
        function: ExtensionFn,
        args: Vec<Node>,
    },
}

impl Node {
    pub fn var(var: Var) -> Self {
        Node::Var(var)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Node::Value(Literal::String(s.into()))
    }

    pub fn long(n: i64) -> Self {
        Node::Value(Literal::Long(n))
    }

    pub fn entity(uid: EntityUid) -> Self {
        Node::Value(Literal::Entity(uid))
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn access(left: Node, attr: impl Into<String>) -> Self {
        Node::StrOp {
            op: StrOp::Access,
            left: Box::new(left),
            attr: attr.into(),
        }
    }

    pub fn has(left: Node, attr: impl Into<String>) -> Self {
        Node::StrOp {
            op: StrOp::Has,
            left: Box::new(left),
            attr: attr.into(),
        }
    }

    pub fn not(arg: Node) -> Self {
        Node::Not(Box::new(arg))
    }

    pub fn call(function: ExtensionFn, args: Vec<Node>) -> Self {
        Node::ExtensionCall { function, args }
    }

    /// Nodes that need parentheses when they are an operand of another node.
    fn is_compound(&self) -> bool {
        match self {
            Node::Binary { op, .. } => !op.is_method(),
            Node::StrOp { op, .. } => *op == StrOp::Has,
            Node::Not(_)
            | Node::Negate(_)
            | Node::Is { .. }
            | Node::IsIn { .. }
            | Node::Like { .. }
            | Node::IfThenElse { .. } => true,
            _ => false,
        }
    }
}

struct Operand<'a>(&'a Node);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.0.is_compound() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.escape_debug())
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Long(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "{}", quoted(s)),
            Literal::Entity(uid) => write!(f, "{uid}"),
            Literal::Set(items) => write!(f, "[{}]", items.iter().join(", ")),
            Literal::Record(fields) => write!(
                f,
                "{{{}}}",
                fields
                    .iter()
                    .map(|(k, v)| format!("{}: {v}", quoted(k)))
                    .join(", ")
            ),
            Literal::Decimal(s) => write!(f, "decimal({})", quoted(s)),
            Literal::Ip(s) => write!(f, "ip({})", quoted(s)),
        }
    }
}

impl Display for Node {
    /// Renders the node as Cedar condition text.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Node::Value(literal) => write!(f, "{literal}"),
            Node::Var(var) => write!(f, "{var}"),
            Node::Not(arg) => write!(f, "!{}", Operand(arg)),
            Node::Negate(arg) => write!(f, "-{}", Operand(arg)),
            Node::Binary { op, left, right } if op.is_method() => {
                write!(f, "{}.{op}({right})", Operand(left))
            }
            Node::Binary { op, left, right } => {
                write!(f, "{} {op} {}", Operand(left), Operand(right))
            }
            Node::StrOp { op: StrOp::Access, left, attr } if is_identifier(attr) => {
                write!(f, "{}.{attr}", Operand(left))
            }
            Node::StrOp { op: StrOp::Access, left, attr } => {
                write!(f, "{}[{}]", Operand(left), quoted(attr))
            }
            Node::StrOp { op: StrOp::Has, left, attr } if is_identifier(attr) => {
                write!(f, "{} has {attr}", Operand(left))
            }
            Node::StrOp { op: StrOp::Has, left, attr } => {
                write!(f, "{} has {}", Operand(left), quoted(attr))
            }
            Node::Is { left, entity_type } => write!(f, "{} is {entity_type}", Operand(left)),
            Node::IsIn {
                left,
                entity_type,
                entity,
            } => write!(f, "{} is {entity_type} in {}", Operand(left), Operand(entity)),
            Node::Like { left, pattern } => {
                let text: String = pattern
                    .iter()
                    .map(|elem| match elem {
                        PatternElem::Wildcard => "*".to_string(),
                        PatternElem::Literal(s) => s
                            .escape_debug()
                            .to_string()
                            .replace('*', r"\*"),
                    })
                    .collect();
                write!(f, "{} like \"{text}\"", Operand(left))
            }
            Node::IfThenElse {
                cond,
                then,
                otherwise,
            } => write!(f, "if {cond} then {then} else {otherwise}"),
            Node::Set(items) => write!(f, "[{}]", items.iter().join(", ")),
            Node::Record(fields) => write!(
                f,
                "{{{}}}",
                fields
                    .iter()
                    .map(|(k, v)| format!("{}: {v}", quoted(k)))
                    .join(", ")
            ),
            Node::ExtensionCall { function, args }
                if function.is_constructor() || args.is_empty() =>
            {
                write!(f, "{function}({})", args.iter().join(", "))
            }
            Node::ExtensionCall { function, args } => write!(
                f,
                "{}.{function}({})",
                Operand(&args[0]),
                args[1..].iter().join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;
    use yare::parameterized;

    #[test]
    fn test_operator_names_round_trip() {
        for op in BinaryOp::iter() {
            assert_eq!(BinaryOp::from_str(op.as_ref()).unwrap(), op);
        }
        for function in ExtensionFn::iter() {
            assert_eq!(ExtensionFn::from_str(function.as_ref()).unwrap(), function);
        }
        for var in Var::iter() {
            assert_eq!(Var::from_str(&var.to_string()).unwrap(), var);
        }
        assert_eq!(StrOp::from_str(".").unwrap(), StrOp::Access);
        assert!(BinaryOp::from_str("=~").is_err());
    }

    fn owner_check() -> Node {
        Node::binary(
            BinaryOp::Equals,
            Node::access(Node::var(Var::Resource), "owner"),
            Node::var(Var::Principal),
        )
    }

    #[parameterized(
        equality = { owner_check(), "resource.owner == principal" },
        not = { Node::not(owner_check()), "!(resource.owner == principal)" },
        has = { Node::has(Node::var(Var::Context), "mfa"), "context has mfa" },
        odd_attr = {
            Node::access(Node::var(Var::Context), "x-forwarded"),
            r#"context["x-forwarded"]"#
        },
        method = {
            Node::binary(
                BinaryOp::Contains,
                Node::access(Node::var(Var::Principal), "roles"),
                Node::string("admin"),
            ),
            r#"principal.roles.contains("admin")"#
        },
        and = {
            Node::binary(
                BinaryOp::And,
                owner_check(),
                Node::binary(BinaryOp::LessThan, Node::long(1), Node::long(2)),
            ),
            "(resource.owner == principal) && (1 < 2)"
        },
        ip_method = {
            Node::call(ExtensionFn::IsInRange, vec![
                Node::access(Node::var(Var::Context), "ip"),
                Node::Value(Literal::Ip("10.0.0.0/8".into())),
            ]),
            r#"context.ip.isInRange(ip("10.0.0.0/8"))"#
        },
        like = {
            Node::Like {
                left: Box::new(Node::access(Node::var(Var::Resource), "name")),
                pattern: vec![
                    PatternElem::Literal("img-".into()),
                    PatternElem::Wildcard,
                    PatternElem::Literal("*".into()),
                ],
            },
            r#"resource.name like "img-*\*""#
        },
        entity = {
            Node::binary(
                BinaryOp::In,
                Node::var(Var::Principal),
                Node::entity(EntityUid::new("Group", "admins")),
            ),
            r#"principal in Group::"admins""#
        },
    )]
    fn test_display(node: Node, expected: &str) {
        assert_eq!(node.to_string(), expected);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("owner"));
        assert!(is_identifier("_private1"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("x-forwarded"));
        assert!(!is_identifier(""));
    }
}
