//! Cedar policies: expression trees, scopes, the JSON policy format, Cedar text, and the
//! mapping between IDQL policies and Cedar.

mod entity;
mod entity_type;
mod json;
mod mapper;
mod node;
mod policy;
mod scope;
mod text;

pub use entity::EntityUid;
pub use entity_type::CedarType;
pub use mapper::{CedarMapper, CedarMapperConfig};
pub use node::{BinaryOp, ExtensionFn, Literal, Node, PatternElem, StrOp, Var};
pub use policy::{CedarCondition, CedarPolicy, ConditionKind, Effect, parse_cedar_json};
pub use scope::Scope;
pub use text::{compile_policy, parse_cedar_text, to_cedar_text};
