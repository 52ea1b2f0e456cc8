//! Role-binding authorization model (GCP IAM style).
//!
//! A [`Binding`] grants one role to a set of members; a [`BindAssignment`] scopes a list
//! of bindings to one resource. [`GcpBindMapper`] translates between these and IDQL.

mod binding;
mod mapper;
mod parse;
mod role_table;

pub use binding::{BindAssignment, Binding};
pub use mapper::GcpBindMapper;
pub use parse::{parse_bindings, parse_file};
pub use role_table::{GCP_ACTION_PREFIX, RoleMapping, RoleTable};
