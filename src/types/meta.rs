//! Policy metadata.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Descriptive metadata carried alongside a policy. None of it affects the grant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Last modification timestamp, kept verbatim (usually RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The policy application point (PAP) this policy was retrieved from or is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl Meta {
    pub fn is_empty(&self) -> bool {
        self == &Meta::default()
    }

    /// The populated fields as `(wire name, value)` pairs, in declaration order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("version", &self.version),
            ("date", &self.date),
            ("description", &self.description),
            ("applicationId", &self.application_id),
            ("providerType", &self.provider_type),
            ("etag", &self.etag),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    /// Set a field by its wire name. Returns `false` if the name is not a meta field.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        let slot = match name {
            "version" => &mut self.version,
            "date" => &mut self.date,
            "description" => &mut self.description,
            "applicationId" => &mut self.application_id,
            "providerType" => &mut self.provider_type,
            "etag" => &mut self.etag,
            _ => return false,
        };
        *slot = Some(value.into());
        true
    }
}
