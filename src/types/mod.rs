//! The canonical IDQL policy model.
//!
//! Wire form of one policy:
//!
//! ```json
//! {
//!   "id": "photo-viewers",
//!   "meta": {"version": "0.7", "applicationId": "photoapp"},
//!   "subject": {"type": "user", "members": ["user:alice@example.com"]},
//!   "actions": [{"name": "view", "actionUri": "gcp:roles/iap.httpsResourceAccessor"}],
//!   "object": {"assetId": "backend-1", "pathSpec": "/photos"},
//!   "condition": {"rule": "req.ip sw 10.", "action": "allow"}
//! }
//! ```

mod action_info;
mod condition;
mod meta;
mod object;
mod policy_info;
mod policy_set;
mod subject;

pub use action_info::ActionInfo;
pub use condition::{Condition, ConditionAction};
pub use meta::Meta;
pub use object::Object;
pub use policy_info::PolicyInfo;
pub use policy_set::PolicySet;
pub use subject::Subject;
