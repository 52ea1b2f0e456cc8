//! Cedar entity type names used when mapping IDQL subjects and actions.
//!
//! IDQL members are written `prefix:id` (`user:alice@example.com`); each prefix has a
//! fixed Cedar entity type, optionally placed in a namespace by the mapper.

use std::fmt::{Display, Formatter, Result as FmtResult};

use strum_macros::EnumIter;

/// The entity types the IDQL mapper produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CedarType {
    /// A single user (`user:` members)
    User,
    /// A group of users (`group:` members)
    Group,
    /// Every user of a domain (`domain:` members)
    Domain,
    /// A workload identity (`serviceAccount:` members)
    ServiceAccount,
    /// An action entity
    Action,
}

impl AsRef<str> for CedarType {
    fn as_ref(&self) -> &str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Domain => "Domain",
            Self::ServiceAccount => "ServiceAccount",
            Self::Action => "Action",
        }
    }
}

impl std::str::FromStr for CedarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Self::User),
            "Group" => Ok(Self::Group),
            "Domain" => Ok(Self::Domain),
            "ServiceAccount" => Ok(Self::ServiceAccount),
            "Action" => Ok(Self::Action),
            _ => Err(format!("Unknown Cedar type: {}", s)),
        }
    }
}

impl Display for CedarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_ref())
    }
}

impl CedarType {
    /// The IDQL member prefix for principal types, `None` for actions.
    pub fn member_prefix(&self) -> Option<&'static str> {
        match self {
            Self::User => Some("user"),
            Self::Group => Some("group"),
            Self::Domain => Some("domain"),
            Self::ServiceAccount => Some("serviceAccount"),
            Self::Action => None,
        }
    }

    pub fn from_member_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "user" => Some(Self::User),
            "group" => Some(Self::Group),
            "domain" => Some(Self::Domain),
            "serviceAccount" => Some(Self::ServiceAccount),
            _ => None,
        }
    }

    /// Container types are matched with `principal in`, the rest with `principal ==`.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Group | Self::Domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_cedar_type_as_ref() {
        assert_eq!(CedarType::User.as_ref(), "User");
        assert_eq!(CedarType::Group.as_ref(), "Group");
        assert_eq!(CedarType::Domain.as_ref(), "Domain");
        assert_eq!(CedarType::ServiceAccount.as_ref(), "ServiceAccount");
        assert_eq!(CedarType::Action.as_ref(), "Action");
    }

    #[test]
    fn test_cedar_type_from_str_round_trips() {
        for ty in CedarType::iter() {
            assert_eq!(CedarType::from_str(ty.as_ref()).unwrap(), ty);
            assert_eq!(ty.to_string(), ty.as_ref());
        }
        assert!(CedarType::from_str("Unknown").is_err());
    }

    #[test]
    fn test_member_prefixes() {
        for ty in CedarType::iter() {
            match ty.member_prefix() {
                Some(prefix) => assert_eq!(CedarType::from_member_prefix(prefix), Some(ty)),
                None => assert_eq!(ty, CedarType::Action),
            }
        }
        assert_eq!(CedarType::from_member_prefix("net"), None);
    }
}
