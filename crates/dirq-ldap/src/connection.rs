//! LDAP connection and search helpers
//!
//! An [`LdapConnection`] holds one bound session together with the
//! configuration it was created from, and runs the user and group searches
//! used for authentication and user sync.

use crate::backend::{DirectoryBackend, Ldap3Backend, RawEntry, SearchOutcome, SearchRequest};
use crate::filter::{and_filter, member_of_filter, resolve_search_scope, sanitize_pattern, wrap_filter};
use crate::transform::{transform_group_results, transform_user_results};
use dirq_core::{
    DirectoryConfig, GroupRecord, Result, SearchScope, ServerInfo, UserRecord, IS_MEMBER_OF_ATTR,
    MEMBER_OF_ATTR, POSIX_MEMBER_ATTR,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Optional overrides for a user search. Unset or empty fields fall back to
/// the `[ldap.users]` configuration.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Attribute matched against the pattern
    pub search_attr: Option<String>,
    /// Attribute mapped to `username`, defaults to `search_attr`
    pub user_name_attr: Option<String>,
    pub user_filter: Option<String>,
    /// Treat the pattern as a full DN and search beneath it
    pub find_by_dn: bool,
    pub scope: SearchScope,
}

impl UserQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_attr(mut self, attr: impl Into<String>) -> Self {
        self.search_attr = Some(attr.into());
        self
    }

    pub fn user_name_attr(mut self, attr: impl Into<String>) -> Self {
        self.user_name_attr = Some(attr.into());
        self
    }

    pub fn user_filter(mut self, filter: impl Into<String>) -> Self {
        self.user_filter = Some(filter.into());
        self
    }

    pub fn by_dn(mut self) -> Self {
        self.find_by_dn = true;
        self
    }

    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Optional overrides for a group search, falling back to `[ldap.groups]`
#[derive(Debug, Clone, Default)]
pub struct GroupQuery {
    pub search_attr: Option<String>,
    pub group_name_attr: Option<String>,
    pub group_member_attr: Option<String>,
    pub group_filter: Option<String>,
    pub find_by_dn: bool,
    pub scope: SearchScope,
}

impl GroupQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_attr(mut self, attr: impl Into<String>) -> Self {
        self.search_attr = Some(attr.into());
        self
    }

    pub fn group_name_attr(mut self, attr: impl Into<String>) -> Self {
        self.group_name_attr = Some(attr.into());
        self
    }

    pub fn group_member_attr(mut self, attr: impl Into<String>) -> Self {
        self.group_member_attr = Some(attr.into());
        self
    }

    pub fn group_filter(mut self, filter: impl Into<String>) -> Self {
        self.group_filter = Some(filter.into());
        self
    }

    pub fn by_dn(mut self) -> Self {
        self.find_by_dn = true;
        self
    }

    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn user_attr_list(user_name_attr: &str) -> Vec<String> {
    [
        "objectClass",
        IS_MEMBER_OF_ATTR,
        MEMBER_OF_ATTR,
        "givenName",
        "sn",
        "mail",
        "dn",
        user_name_attr,
    ]
    .iter()
    .map(|a| a.to_string())
    .collect()
}

/// A bound directory session
pub struct LdapConnection {
    config: Arc<DirectoryConfig>,
    backend: Box<dyn DirectoryBackend>,
}

impl LdapConnection {
    /// Connect and bind using `config`
    pub async fn connect(config: Arc<DirectoryConfig>) -> Result<Self> {
        let backend = Ldap3Backend::connect(&config).await?;
        Ok(Self::with_backend(config, backend))
    }

    /// Wrap an already bound backend
    pub fn with_backend(config: Arc<DirectoryConfig>, backend: impl DirectoryBackend + 'static) -> Self {
        Self {
            config,
            backend: Box::new(backend),
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn base_dn(&self) -> &str {
        &self.config.base_dn
    }

    /// Resolve the search base and name fragment against the configured base DN
    pub fn search_params(
        &self,
        identifier: &str,
        attribute: &str,
        find_by_dn: bool,
    ) -> Result<(String, String)> {
        resolve_search_scope(self.base_dn(), identifier, attribute, find_by_dn)
    }

    async fn run_search(&self, request: SearchRequest) -> Result<SearchOutcome<RawEntry>> {
        if self.config.debug || self.config.trace_level > 0 {
            info!(
                base = %request.base,
                scope = ?request.scope,
                filter = %request.filter,
                attrs = ?request.attrs,
                "LDAP search"
            );
        } else {
            debug!(base = %request.base, filter = %request.filter, "LDAP search");
        }

        self.backend.search(&request).await
    }

    /// Search for users, keeping the server's outcome tag
    pub async fn search_users(
        &self,
        username_pattern: &str,
        query: &UserQuery,
    ) -> Result<SearchOutcome<UserRecord>> {
        let users = &self.config.users;

        let search_attr = non_empty(&query.search_attr).unwrap_or(&users.user_name_attr);
        let user_name_attr = non_empty(&query.user_name_attr).unwrap_or(search_attr);
        let user_filter = wrap_filter(non_empty(&query.user_filter).unwrap_or(&users.user_filter));

        let sanitized = sanitize_pattern(username_pattern);
        let (search_dn, name_filter) =
            self.search_params(&sanitized, search_attr, query.find_by_dn)?;

        let request = SearchRequest {
            base: search_dn,
            scope: query.scope,
            filter: and_filter(&user_filter, &name_filter),
            attrs: user_attr_list(user_name_attr),
        };

        let outcome = self.run_search(request).await?;
        Ok(outcome.map(|entries| transform_user_results(entries, user_name_attr)))
    }

    /// Find users by username pattern or DN.
    ///
    /// A search that does not complete successfully yields an empty list.
    pub async fn find_users(&self, username_pattern: &str, query: &UserQuery) -> Result<Vec<UserRecord>> {
        Ok(self
            .search_users(username_pattern, query)
            .await?
            .entries_or_empty())
    }

    /// Search for groups, keeping the server's outcome tag
    pub async fn search_groups(
        &self,
        groupname_pattern: &str,
        query: &GroupQuery,
    ) -> Result<SearchOutcome<GroupRecord>> {
        let groups = &self.config.groups;

        let search_attr = non_empty(&query.search_attr).unwrap_or(&groups.group_name_attr);
        let group_name_attr = non_empty(&query.group_name_attr).unwrap_or(search_attr);
        let group_member_attr =
            non_empty(&query.group_member_attr).unwrap_or(&groups.group_member_attr);
        let group_filter =
            wrap_filter(non_empty(&query.group_filter).unwrap_or(&groups.group_filter));

        let sanitized = sanitize_pattern(groupname_pattern);
        let (search_dn, name_filter) =
            self.search_params(&sanitized, search_attr, query.find_by_dn)?;

        let request = SearchRequest {
            base: search_dn,
            scope: query.scope,
            filter: and_filter(&group_filter, &name_filter),
            attrs: vec![
                "objectClass".to_string(),
                "dn".to_string(),
                POSIX_MEMBER_ATTR.to_string(),
                group_member_attr.to_string(),
                group_name_attr.to_string(),
            ],
        };

        let config = &self.config;
        let outcome = self.run_search(request).await?;
        Ok(outcome.map(|entries| {
            transform_group_results(entries, group_name_attr, group_member_attr, |name| {
                config.normalize_username(name)
            })
        }))
    }

    /// Find groups by name pattern or DN; non-success yields an empty list
    pub async fn find_groups(&self, groupname_pattern: &str, query: &GroupQuery) -> Result<Vec<GroupRecord>> {
        Ok(self
            .search_groups(groupname_pattern, query)
            .await?
            .entries_or_empty())
    }

    /// Raw entries listing `dn` in `isMemberOf` or `memberOf`, searched under
    /// the configured base DN
    pub async fn find_members_of_group(
        &self,
        dn: &str,
        search_attr: &str,
        ldap_filter: &str,
        scope: SearchScope,
    ) -> Result<SearchOutcome<RawEntry>> {
        let ldap_filter = if ldap_filter.is_empty() {
            String::new()
        } else {
            wrap_filter(ldap_filter)
        };

        let group_dn = sanitize_pattern(dn);
        let (search_dn, _) = self.search_params(&group_dn, search_attr, false)?;

        let request = SearchRequest {
            base: search_dn,
            scope,
            filter: member_of_filter(&ldap_filter, &group_dn),
            attrs: user_attr_list(search_attr),
        };

        self.run_search(request).await
    }

    /// Users that are members of the group `dn`
    pub async fn find_users_of_group(&self, dn: &str) -> Result<Vec<UserRecord>> {
        let users = &self.config.users;
        let entries = self
            .find_members_of_group(dn, &users.user_name_attr, &users.user_filter, SearchScope::Subtree)
            .await?
            .entries_or_empty();

        Ok(transform_user_results(entries, &users.user_name_attr))
    }

    /// Groups nested in the group `dn`
    pub async fn find_groups_of_group(&self, dn: &str) -> Result<Vec<GroupRecord>> {
        let groups = &self.config.groups;
        let entries = self
            .find_members_of_group(
                dn,
                &groups.group_name_attr,
                &groups.group_filter,
                SearchScope::Subtree,
            )
            .await?
            .entries_or_empty();

        Ok(transform_group_results(
            entries,
            &groups.group_name_attr,
            &groups.group_member_attr,
            |name| self.config.normalize_username(name),
        ))
    }

    /// Query the root DSE
    pub async fn server_info(&self) -> Result<ServerInfo> {
        let request = SearchRequest {
            base: String::new(),
            scope: SearchScope::Base,
            filter: "(objectClass=*)".to_string(),
            attrs: vec![
                "vendorName".to_string(),
                "vendorVersion".to_string(),
                "namingContexts".to_string(),
                "supportedLDAPVersion".to_string(),
            ],
        };

        let entries = self.run_search(request).await?.into_result()?;

        let info = match entries.into_iter().find(|e| !e.is_referral()) {
            Some(entry) => ServerInfo {
                vendor: entry.attrs.first("vendorName").map(str::to_string),
                version: entry.attrs.first("vendorVersion").map(str::to_string),
                naming_contexts: entry
                    .attrs
                    .get("namingContexts")
                    .map(|v| v.to_vec())
                    .unwrap_or_default(),
                supported_ldap_version: entry
                    .attrs
                    .get("supportedLDAPVersion")
                    .map(|v| v.to_vec())
                    .unwrap_or_default(),
            },
            None => ServerInfo {
                supported_ldap_version: vec!["3".to_string()],
                ..Default::default()
            },
        };

        Ok(info)
    }

    pub async fn unbind(&self) -> Result<()> {
        self.backend.unbind().await
    }
}
