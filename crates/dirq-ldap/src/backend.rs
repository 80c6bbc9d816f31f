//! Directory protocol backend
//!
//! [`DirectoryBackend`] is the seam between query construction and the wire.
//! [`Ldap3Backend`] drives a real server through `ldap3`.

use crate::attrs::AttributeMap;
use crate::tls;
use async_trait::async_trait;
use dirq_core::{DirectoryConfig, Error, Result, SearchScope};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchResult};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// One search request as sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    pub filter: String,
    pub attrs: Vec<String>,
}

/// A returned entry. Referral references carry no DN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub dn: Option<String>,
    pub attrs: AttributeMap,
}

impl RawEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: Some(dn.into()),
            attrs: AttributeMap::new(),
        }
    }

    pub fn referral() -> Self {
        Self::default()
    }

    pub fn with_attr(mut self, name: &str, values: &[&str]) -> Self {
        self.attrs
            .insert(name, values.iter().map(|v| v.to_string()));
        self
    }

    pub fn is_referral(&self) -> bool {
        self.dn.is_none()
    }
}

/// Tagged result of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<T> {
    /// The server reported success
    Success(Vec<T>),
    /// The search completed with a non-success result code
    Failure { code: u32, message: String },
}

impl<T> SearchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success(_))
    }

    pub fn map<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> SearchOutcome<U> {
        match self {
            SearchOutcome::Success(entries) => SearchOutcome::Success(f(entries)),
            SearchOutcome::Failure { code, message } => SearchOutcome::Failure { code, message },
        }
    }

    /// Entries on success, or an empty list on any other outcome.
    ///
    /// Partial results, referral-only results and server-side errors are all
    /// reported as "no matches" here.
    pub fn entries_or_empty(self) -> Vec<T> {
        match self {
            SearchOutcome::Success(entries) => entries,
            SearchOutcome::Failure { code, message } => {
                warn!(code, %message, "LDAP search did not succeed, returning no entries");
                Vec::new()
            }
        }
    }

    /// Entries on success, [`Error::Search`] otherwise
    pub fn into_result(self) -> Result<Vec<T>> {
        match self {
            SearchOutcome::Success(entries) => Ok(entries),
            SearchOutcome::Failure { code, message } => Err(Error::Search(format!(
                "result code {}: {}",
                code, message
            ))),
        }
    }
}

#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome<RawEntry>>;

    async fn unbind(&self) -> Result<()>;
}

fn to_ldap3_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

/// Per-connection transport settings: timeout, STARTTLS, verification and
/// the CA trust store from `ldap_cert`
pub fn connection_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new()
        .set_conn_timeout(Duration::from_secs(config.timeout_secs))
        .set_starttls(config.start_tls)
        .set_no_tls_verify(config.skip_tls_verify);

    if let Some(ref cert) = config.ldap_cert {
        settings = settings.set_config(tls::client_config(cert)?);
    }

    Ok(settings)
}

/// `ldap3` session bound to one server
pub struct Ldap3Backend {
    ldap: Ldap,
    timeout: Duration,
    follow_referrals: bool,
}

impl Ldap3Backend {
    /// Open a session and perform the single simple bind.
    ///
    /// Binds as [`DirectoryConfig::bind_identity`] when one is configured,
    /// anonymously otherwise.
    pub async fn connect(config: &DirectoryConfig) -> Result<Self> {
        config.validate()?;

        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::InvalidConfig("No LDAP URL was specified".into()))?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let settings = connection_settings(config)?;

        if config.debug {
            debug!(
                debug_level = config.debug_level,
                trace_level = config.trace_level,
                "LDAP protocol tracing enabled"
            );
        }

        debug!("Connecting to LDAP server: {}", url);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, url)
            .await
            .map_err(|e| Error::Connect(e.to_string()))?;

        ldap3::drive!(conn);

        match config.bind_identity() {
            Some(bind_dn) => {
                let password = config.bind_password()?.unwrap_or_default();
                let bound = ldap
                    .with_timeout(timeout)
                    .simple_bind(&bind_dn, &password)
                    .await
                    .and_then(|res| res.success());

                if let Err(e) = bound {
                    error!(error = %e, "Failed to bind to LDAP server as user {}", bind_dn);
                    return Err(Error::Bind { bind_dn });
                }
                info!("Bound to {} as {}", url, bind_dn);
            }
            None => {
                let bound = ldap
                    .with_timeout(timeout)
                    .simple_bind("", "")
                    .await
                    .and_then(|res| res.success());

                if let Err(e) = bound {
                    error!(error = %e, "Failed to bind to LDAP server anonymously");
                    return Err(Error::AnonymousBind);
                }
                info!("Bound to {} anonymously", url);
            }
        }

        Ok(Self {
            ldap,
            timeout,
            follow_referrals: config.follow_referrals,
        })
    }
}

#[async_trait]
impl DirectoryBackend for Ldap3Backend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome<RawEntry>> {
        let mut ldap = self.ldap.clone();

        let SearchResult(results, res) = ldap
            .with_timeout(self.timeout)
            .search(
                &request.base,
                to_ldap3_scope(request.scope),
                &request.filter,
                request.attrs.clone(),
            )
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        if res.rc != 0 {
            return Ok(SearchOutcome::Failure {
                code: res.rc,
                message: res.text,
            });
        }

        let mut entries = Vec::with_capacity(results.len());
        for result in results {
            if result.is_ref() {
                let refs = ldap3::parse_refs(result.0);
                if self.follow_referrals {
                    debug!(?refs, "Dropping referral, referrals are not chased");
                }
                entries.push(RawEntry::referral());
                continue;
            }
            if result.is_intermediate() {
                continue;
            }

            let entry = SearchEntry::construct(result);
            entries.push(RawEntry {
                dn: Some(entry.dn),
                attrs: AttributeMap::from(entry.attrs),
            });
        }

        Ok(SearchOutcome::Success(entries))
    }

    async fn unbind(&self) -> Result<()> {
        let mut ldap = self.ldap.clone();
        ldap.unbind()
            .await
            .map_err(|e| Error::Connect(format!("Unbind failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_yields_empty_entries() {
        // entries_or_empty reports any non-success outcome as "no matches"
        let outcome: SearchOutcome<RawEntry> = SearchOutcome::Failure {
            code: 10,
            message: "referral".to_string(),
        };
        assert!(!outcome.is_success());
        assert!(outcome.entries_or_empty().is_empty());
    }

    #[test]
    fn test_failure_into_result_is_error() {
        let outcome: SearchOutcome<RawEntry> = SearchOutcome::Failure {
            code: 32,
            message: "no such object".to_string(),
        };
        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, Error::Search(msg) if msg.contains("32")));
    }

    #[test]
    fn test_map_preserves_failure() {
        let outcome: SearchOutcome<u32> = SearchOutcome::Failure {
            code: 4,
            message: "size limit".to_string(),
        };
        let mapped = outcome.map(|v| v.into_iter().map(|n| n * 2).collect::<Vec<_>>());
        assert_eq!(
            mapped,
            SearchOutcome::Failure {
                code: 4,
                message: "size limit".to_string()
            }
        );

        let ok = SearchOutcome::Success(vec![1u32, 2])
            .map(|v| v.into_iter().map(|n| n * 2).collect::<Vec<u32>>());
        assert_eq!(ok, SearchOutcome::Success(vec![2u32, 4]));
    }

    #[test]
    fn test_raw_entry_builder() {
        let entry = RawEntry::new("uid=alice,dc=example,dc=com").with_attr("UID", &["alice"]);
        assert!(!entry.is_referral());
        assert_eq!(entry.attrs.first("uid"), Some("alice"));
        assert!(RawEntry::referral().is_referral());
    }

    #[test]
    fn test_connection_settings_with_ca_certificate() {
        let config = DirectoryConfig {
            url: Some("ldaps://ldap.example.com:636".to_string()),
            ldap_cert: Some(tls::test_ca_path()),
            start_tls: true,
            ..Default::default()
        };
        assert!(connection_settings(&config).is_ok());
    }

    #[test]
    fn test_connection_settings_with_unreadable_certificate() {
        let config = DirectoryConfig {
            url: Some("ldaps://ldap.example.com:636".to_string()),
            ldap_cert: Some("/nonexistent/ca.pem".into()),
            ..Default::default()
        };
        let err = connection_settings(&config).err().unwrap();
        assert!(matches!(err, Error::Tls(_)));
    }

    #[tokio::test]
    async fn test_connect_without_url_fails() {
        let config = DirectoryConfig::default();
        let err = Ldap3Backend::connect(&config).await.err().unwrap();
        assert!(matches!(err, Error::InvalidConfig(msg) if msg.contains("No LDAP URL")));
    }
}
