//! Directory record types

use serde::{Deserialize, Serialize};

/// A user entry after attribute mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Distinguished name of the entry
    pub dn: String,

    /// First value of the configured username attribute
    pub username: String,

    /// givenName
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,

    /// sn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,

    /// mail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// DNs of groups the user belongs to
    #[serde(default)]
    pub groups: Vec<String>,
}

/// A group entry after attribute mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub dn: String,
    pub name: String,

    /// Member DNs, empty for POSIX groups
    #[serde(default)]
    pub members: Vec<String>,

    /// memberUid values, empty unless the entry is a posixGroup
    #[serde(default)]
    pub posix_members: Vec<String>,
}

impl GroupRecord {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.posix_members.is_empty()
    }
}

/// Search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// The base object only
    Base,
    /// Immediate children of the base
    OneLevel,
    /// The base and everything below it
    #[default]
    Subtree,
}

impl std::str::FromStr for SearchScope {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "base" => Ok(SearchScope::Base),
            "one" | "onelevel" | "one_level" => Ok(SearchScope::OneLevel),
            "sub" | "subtree" => Ok(SearchScope::Subtree),
            other => Err(crate::Error::InvalidConfig(format!(
                "Unknown search scope: {}",
                other
            ))),
        }
    }
}

/// Root DSE information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub naming_contexts: Vec<String>,
    pub supported_ldap_version: Vec<String>,
}
