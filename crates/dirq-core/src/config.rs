//! Configuration for Dirq
//!
//! Example config:
//! ```toml
//! [logging]
//! level = "info"
//!
//! [ldap]
//! url = "ldaps://ldap.example.com:636"
//! bind_dn = "cn=reader,dc=example,dc=com"
//! bind_password_env = "DIRQ_BIND_PASSWORD"
//! base_dn = "dc=example,dc=com"
//!
//! [ldap.users]
//! user_filter = "objectClass=person"
//! user_name_attr = "uid"
//!
//! [ldap.servers.legacy]
//! url = "ldap://old.example.com"
//! base_dn = "dc=old,dc=example,dc=com"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

const REDACTED: &str = "***";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySettings {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ldap: LdapSection,
}

/// The `[ldap]` section: a default server plus optional named servers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapSection {
    #[serde(flatten)]
    pub default: DirectoryConfig,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub servers: BTreeMap<String, DirectoryConfig>,
}

impl DirectorySettings {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to read config: {}", e)))?;

        debug!("Loaded configuration from {}", path);
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Override the default server section from `DIRQ_*` environment variables
    pub fn apply_env(&mut self) {
        let config = &mut self.ldap.default;

        if let Ok(url) = std::env::var("DIRQ_LDAP_URL") {
            config.url = Some(url);
        }
        if let Ok(dn) = std::env::var("DIRQ_BIND_DN") {
            config.bind_dn = Some(dn);
        }
        if let Ok(password) = std::env::var("DIRQ_BIND_PASSWORD") {
            config.bind_password = Some(password);
        }
        if let Ok(base) = std::env::var("DIRQ_BASE_DN") {
            config.base_dn = base;
        }
        if let Ok(cert) = std::env::var("DIRQ_LDAP_CERT") {
            config.ldap_cert = Some(PathBuf::from(cert));
        }
        if let Ok(domain) = std::env::var("DIRQ_NT_DOMAIN") {
            config.nt_domain = Some(domain);
        }
        if let Ok(filter) = std::env::var("DIRQ_USER_FILTER") {
            config.users.user_filter = filter;
        }
        if let Ok(attr) = std::env::var("DIRQ_USER_NAME_ATTR") {
            config.users.user_name_attr = attr;
        }
        if let Ok(filter) = std::env::var("DIRQ_GROUP_FILTER") {
            config.groups.group_filter = filter;
        }
        if let Ok(attr) = std::env::var("DIRQ_GROUP_NAME_ATTR") {
            config.groups.group_name_attr = attr;
        }
        if let Ok(attr) = std::env::var("DIRQ_GROUP_MEMBER_ATTR") {
            config.groups.group_member_attr = attr;
        }
        if let Ok(v) = std::env::var("DIRQ_FOLLOW_REFERRALS") {
            config.follow_referrals = env_flag(&v);
        }
        if let Ok(v) = std::env::var("DIRQ_FORCE_USERNAME_LOWERCASE") {
            config.force_username_lowercase = env_flag(&v);
        }
        if let Ok(level) = std::env::var("DIRQ_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Pick a server configuration.
    ///
    /// A name only selects from `[ldap.servers]` when that table is non-empty;
    /// otherwise the default section is used.
    pub fn server(&self, name: Option<&str>) -> crate::Result<&DirectoryConfig> {
        match name {
            Some(name) if !self.ldap.servers.is_empty() => {
                self.ldap.servers.get(name).ok_or_else(|| {
                    crate::Error::InvalidConfig(format!("Unknown LDAP server: {}", name))
                })
            }
            _ => Ok(&self.ldap.default),
        }
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.ldap.servers.keys().map(|k| k.as_str()).collect()
    }
}

/// `true` (any case) or `1`
fn env_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Connection and schema settings for one directory server
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// LDAP server URL (ldap:// or ldaps://)
    #[serde(default)]
    pub url: Option<String>,

    /// Bind DN; anonymous bind when unset
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Inline bind password
    #[serde(default)]
    pub bind_password: Option<String>,

    /// File containing the bind password
    #[serde(default)]
    pub bind_password_file: Option<PathBuf>,

    /// Environment variable containing the bind password
    #[serde(default)]
    pub bind_password_env: Option<String>,

    /// CA certificate (PEM) used to verify the server
    #[serde(default)]
    pub ldap_cert: Option<PathBuf>,

    /// Use STARTTLS on ldap:// URLs
    #[serde(default)]
    pub start_tls: bool,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Root of every search
    #[serde(default)]
    pub base_dn: String,

    #[serde(default)]
    pub follow_referrals: bool,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_debug_level")]
    pub debug_level: u32,

    /// Log each outgoing search request when non-zero
    #[serde(default)]
    pub trace_level: u32,

    /// Connection and operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Bind with `bind_dn` as-is. When false the bind identity is
    /// `bind_dn@nt_domain`.
    #[serde(default = "default_true")]
    pub search_bind_authentication: bool,

    #[serde(default)]
    pub nt_domain: Option<String>,

    #[serde(default)]
    pub force_username_lowercase: bool,

    #[serde(default)]
    pub users: UserSchema,

    #[serde(default)]
    pub groups: GroupSchema,
}

fn default_debug_level() -> u32 {
    255
}

fn default_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: None,
            bind_dn: None,
            bind_password: None,
            bind_password_file: None,
            bind_password_env: None,
            ldap_cert: None,
            start_tls: false,
            skip_tls_verify: false,
            base_dn: String::new(),
            follow_referrals: false,
            debug: false,
            debug_level: default_debug_level(),
            trace_level: 0,
            timeout_secs: default_timeout(),
            search_bind_authentication: true,
            nt_domain: None,
            force_username_lowercase: false,
            users: UserSchema::default(),
            groups: GroupSchema::default(),
        }
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| REDACTED))
            .field("bind_password_file", &self.bind_password_file)
            .field("bind_password_env", &self.bind_password_env)
            .field("ldap_cert", &self.ldap_cert)
            .field("start_tls", &self.start_tls)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("base_dn", &self.base_dn)
            .field("follow_referrals", &self.follow_referrals)
            .field("debug", &self.debug)
            .field("debug_level", &self.debug_level)
            .field("trace_level", &self.trace_level)
            .field("timeout_secs", &self.timeout_secs)
            .field("search_bind_authentication", &self.search_bind_authentication)
            .field("nt_domain", &self.nt_domain)
            .field("force_username_lowercase", &self.force_username_lowercase)
            .field("users", &self.users)
            .field("groups", &self.groups)
            .finish()
    }
}

impl DirectoryConfig {
    /// Resolve the bind password: inline value, then file, then env var
    pub fn bind_password(&self) -> crate::Result<Option<String>> {
        if let Some(ref password) = self.bind_password {
            return Ok(Some(password.clone()));
        }

        if let Some(ref path) = self.bind_password_file {
            let content = std::fs::read_to_string(path).map_err(|e| {
                crate::Error::InvalidConfig(format!(
                    "Failed to read bind password file {:?}: {}",
                    path, e
                ))
            })?;
            return Ok(Some(content.trim_end_matches(['\r', '\n']).to_string()));
        }

        if let Some(ref env_var) = self.bind_password_env {
            return std::env::var(env_var).map(Some).map_err(|_| {
                crate::Error::InvalidConfig(format!(
                    "Bind password environment variable {} is not set",
                    env_var
                ))
            });
        }

        Ok(None)
    }

    /// Identity used for the simple bind, after NT domain qualification
    pub fn bind_identity(&self) -> Option<String> {
        let bind_dn = self.bind_dn.as_deref()?;

        if self.search_bind_authentication {
            Some(bind_dn.to_string())
        } else {
            Some(bind_username(bind_dn, self.nt_domain.as_deref()))
        }
    }

    /// Apply the lowercasing policy to a username or group name
    pub fn normalize_username(&self, username: &str) -> String {
        if self.force_username_lowercase {
            username.to_lowercase()
        } else {
            username.to_string()
        }
    }

    /// Copy with the inline password masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.bind_password.is_some() {
            config.bind_password = Some(REDACTED.to_string());
        }
        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| crate::Error::InvalidConfig("No LDAP URL was specified".into()))?;

        let parsed = url::Url::parse(url)
            .map_err(|e| crate::Error::InvalidConfig(format!("Invalid LDAP URL {}: {}", url, e)))?;
        if parsed.scheme() != "ldap" && parsed.scheme() != "ldaps" {
            return Err(crate::Error::InvalidConfig(
                "LDAP URL must start with ldap:// or ldaps://".into(),
            ));
        }

        if let Some(ref cert) = self.ldap_cert {
            if self.skip_tls_verify {
                return Err(crate::Error::InvalidConfig(
                    "ldap_cert and skip_tls_verify cannot both be set".into(),
                ));
            }
            if !cert.exists() {
                return Err(crate::Error::InvalidConfig(format!(
                    "Certificate file not found: {:?}",
                    cert
                )));
            }
        }

        if self.users.user_name_attr.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "users.user_name_attr must not be empty".into(),
            ));
        }

        if self.groups.group_name_attr.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "groups.group_name_attr must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Qualify a username with an NT domain when one is configured
pub fn bind_username(username: &str, nt_domain: Option<&str>) -> String {
    match nt_domain {
        Some(domain) if !domain.is_empty() => format!("{}@{}", username, domain),
        _ => username.to_string(),
    }
}

/// User entry attribute names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSchema {
    #[serde(default = "default_entity_filter")]
    pub user_filter: String,

    #[serde(default = "default_user_name_attr")]
    pub user_name_attr: String,
}

impl Default for UserSchema {
    fn default() -> Self {
        Self {
            user_filter: default_entity_filter(),
            user_name_attr: default_user_name_attr(),
        }
    }
}

/// Group entry attribute names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSchema {
    #[serde(default = "default_entity_filter")]
    pub group_filter: String,

    #[serde(default = "default_group_name_attr")]
    pub group_name_attr: String,

    #[serde(default = "default_group_member_attr")]
    pub group_member_attr: String,
}

impl Default for GroupSchema {
    fn default() -> Self {
        Self {
            group_filter: default_entity_filter(),
            group_name_attr: default_group_name_attr(),
            group_member_attr: default_group_member_attr(),
        }
    }
}

fn default_entity_filter() -> String {
    "objectclass=*".to_string()
}

fn default_user_name_attr() -> String {
    "sAMAccountName".to_string()
}

fn default_group_name_attr() -> String {
    "cn".to_string()
}

fn default_group_member_attr() -> String {
    "member".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DirectoryConfig::default();
        assert_eq!(config.users.user_filter, "objectclass=*");
        assert_eq!(config.users.user_name_attr, "sAMAccountName");
        assert_eq!(config.groups.group_name_attr, "cn");
        assert_eq!(config.groups.group_member_attr, "member");
        assert!(config.search_bind_authentication);
        assert_eq!(config.debug_level, 255);
    }

    #[test]
    fn test_parse_toml_with_named_servers() {
        let settings = DirectorySettings::from_toml(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [ldap]
            url = "ldap://localhost:389"
            base_dn = "dc=example,dc=com"

            [ldap.users]
            user_filter = "(objectClass=person)"
            user_name_attr = "uid"

            [ldap.servers.legacy]
            url = "ldap://old.example.com"
            base_dn = "dc=old,dc=example,dc=com"
            force_username_lowercase = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.logging.level, "debug");
        let default = settings.server(None).unwrap();
        assert_eq!(default.base_dn, "dc=example,dc=com");
        assert_eq!(default.users.user_name_attr, "uid");
        assert_eq!(default.groups.group_name_attr, "cn");

        let legacy = settings.server(Some("legacy")).unwrap();
        assert_eq!(legacy.base_dn, "dc=old,dc=example,dc=com");
        assert!(legacy.force_username_lowercase);
        assert_eq!(legacy.users.user_name_attr, "sAMAccountName");

        assert!(settings.server(Some("missing")).is_err());
        assert_eq!(settings.server_names(), vec!["legacy"]);
    }

    #[test]
    fn test_env_flag_values() {
        assert!(env_flag("true"));
        assert!(env_flag("TRUE"));
        assert!(env_flag("True"));
        assert!(env_flag("1"));
        assert!(!env_flag("false"));
        assert!(!env_flag("0"));
        assert!(!env_flag("yes"));
        assert!(!env_flag(""));
    }

    #[test]
    fn test_server_name_ignored_without_server_table() {
        let settings = DirectorySettings::default();
        assert!(settings.server(Some("anything")).is_ok());
    }

    #[test]
    fn test_bind_identity() {
        let mut config = DirectoryConfig {
            bind_dn: Some("reader".to_string()),
            nt_domain: Some("CORP".to_string()),
            ..Default::default()
        };
        assert_eq!(config.bind_identity().as_deref(), Some("reader"));

        config.search_bind_authentication = false;
        assert_eq!(config.bind_identity().as_deref(), Some("reader@CORP"));

        config.bind_dn = None;
        assert_eq!(config.bind_identity(), None);

        assert_eq!(bind_username("bob", None), "bob");
        assert_eq!(bind_username("bob", Some("")), "bob");
    }

    #[test]
    fn test_normalize_username() {
        let mut config = DirectoryConfig::default();
        assert_eq!(config.normalize_username("Alice"), "Alice");
        config.force_username_lowercase = true;
        assert_eq!(config.normalize_username("Alice"), "alice");
    }

    #[test]
    fn test_bind_password_sources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from-file").unwrap();

        let config = DirectoryConfig {
            bind_password_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(config.bind_password().unwrap().as_deref(), Some("from-file"));

        let config = DirectoryConfig {
            bind_password: Some("inline".to_string()),
            bind_password_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(config.bind_password().unwrap().as_deref(), Some("inline"));

        let config = DirectoryConfig {
            bind_password_env: Some("DIRQ_TEST_SURELY_UNSET_PASSWORD".to_string()),
            ..Default::default()
        };
        assert!(config.bind_password().is_err());

        assert_eq!(DirectoryConfig::default().bind_password().unwrap(), None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DirectoryConfig {
            bind_password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains(REDACTED));
        assert_eq!(config.redacted().bind_password.as_deref(), Some(REDACTED));
    }

    #[test]
    fn test_validation() {
        let mut config = DirectoryConfig::default();
        assert!(config.validate().is_err());

        config.url = Some("http://ldap.example.com".to_string());
        assert!(config.validate().is_err());

        config.url = Some("ldaps://ldap.example.com:636".to_string());
        assert!(config.validate().is_ok());

        config.ldap_cert = Some(PathBuf::from("/nonexistent/ca.pem"));
        assert!(config.validate().is_err());

        let cert = tempfile::NamedTempFile::new().unwrap();
        config.ldap_cert = Some(cert.path().to_path_buf());
        assert!(config.validate().is_ok());

        config.skip_tls_verify = true;
        assert!(config.validate().is_err());
    }
}
