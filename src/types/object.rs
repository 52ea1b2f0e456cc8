//! Protected resources.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The resource a policy protects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_spec: Option<String>,
}

impl Object {
    pub fn with_asset(asset_id: impl Into<String>) -> Self {
        Object {
            asset_id: Some(asset_id.into()),
            path_spec: None,
        }
    }

    /// The provider resource id, empty when the object names no asset.
    pub fn resource_id(&self) -> &str {
        self.asset_id.as_deref().unwrap_or_default()
    }
}
