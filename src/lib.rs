// src/lib.rs
pub use error::MapperError;
pub use loader::{parse_policies, parse_policy_file, serialize_policies};
pub use reconcile::{DifKind, PolicyDif, PolicyField, reconcile_policies};
pub use types::{
    ActionInfo, Condition, ConditionAction, Meta, Object, PolicyInfo, PolicySet, Subject,
};

pub mod bindings;
pub mod cedar;
mod error;
mod loader;
mod reconcile;
pub mod types;

#[cfg(test)]
mod tests;
