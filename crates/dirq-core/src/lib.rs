//! Dirq Core Library
//!
//! Configuration, error and record types shared by the directory query
//! adapter and its command-line front end.

pub mod config;
pub mod error;
pub mod types;

pub use config::{DirectoryConfig, DirectorySettings, GroupSchema, LoggingConfig, UserSchema};
pub use error::{Error, Result};
pub use types::{GroupRecord, SearchScope, ServerInfo, UserRecord};

/// Dirq version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Object class value marking a POSIX group entry
pub const POSIX_GROUP_CLASS: &str = "posixGroup";

/// Attribute carrying POSIX member identifiers
pub const POSIX_MEMBER_ATTR: &str = "memberUid";

/// Membership attribute used by Active Directory and OpenLDAP's memberof overlay
pub const MEMBER_OF_ATTR: &str = "memberOf";

/// Membership attribute used by Sun/Oracle and 389 Directory Server
pub const IS_MEMBER_OF_ATTR: &str = "isMemberOf";
