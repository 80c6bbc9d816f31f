//! Lazily connected, shared directory handle
//!
//! A [`Directory`] owns at most one bound [`LdapConnection`]. The first
//! caller connects while holding the cache lock, so concurrent first use
//! results in a single bind.

use crate::backend::{RawEntry, SearchOutcome};
use crate::connection::{GroupQuery, LdapConnection, UserQuery};
use dirq_core::{
    DirectoryConfig, DirectorySettings, Error, GroupRecord, Result, SearchScope, ServerInfo,
    UserRecord,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub type ConnectFuture = Pin<Box<dyn Future<Output = Result<LdapConnection>> + Send>>;

/// Produces a bound connection for a configuration
pub type Connector = Arc<dyn Fn(Arc<DirectoryConfig>) -> ConnectFuture + Send + Sync>;

pub struct Directory {
    config: Arc<DirectoryConfig>,
    connector: Connector,
    cached: Mutex<Option<Arc<LdapConnection>>>,
}

impl Directory {
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        Self::with_connector(
            config,
            Arc::new(|config: Arc<DirectoryConfig>| {
                Box::pin(LdapConnection::connect(config)) as ConnectFuture
            }),
        )
    }

    pub fn with_connector(config: Arc<DirectoryConfig>, connector: Connector) -> Self {
        Self {
            config,
            connector,
            cached: Mutex::new(None),
        }
    }

    /// Build a handle for the named server, or the default one
    pub fn from_settings(settings: &DirectorySettings, server: Option<&str>) -> Result<Self> {
        let config = settings.server(server)?.clone();
        Ok(Self::new(Arc::new(config)))
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// The cached connection, connecting first if there is none
    pub async fn connection(&self) -> Result<Arc<LdapConnection>> {
        let mut cached = self.cached.lock().await;

        if let Some(ref conn) = *cached {
            return Ok(conn.clone());
        }

        debug!("No cached LDAP connection, connecting");
        let conn = Arc::new((self.connector)(self.config.clone()).await?);
        *cached = Some(conn.clone());
        Ok(conn)
    }

    pub async fn is_connected(&self) -> bool {
        self.cached.lock().await.is_some()
    }

    /// Drop the cached connection; the next call reconnects
    pub async fn invalidate(&self) {
        let previous = self.cached.lock().await.take();

        if let Some(conn) = previous {
            if let Err(e) = conn.unbind().await {
                warn!(error = %e, "Failed to unbind stale LDAP connection");
            }
        }
    }

    /// Drop `used` from the cache after a transport failure. A connection
    /// that has already been replaced is left alone.
    async fn check<T>(&self, used: &Arc<LdapConnection>, result: Result<T>) -> Result<T> {
        if let Err(Error::Search(ref message)) = result {
            let stale = {
                let mut cached = self.cached.lock().await;
                let is_current = cached
                    .as_ref()
                    .map_or(false, |conn| Arc::ptr_eq(conn, used));
                if is_current {
                    cached.take()
                } else {
                    None
                }
            };

            if let Some(conn) = stale {
                warn!(%message, "LDAP search failed, dropping cached connection");
                if let Err(e) = conn.unbind().await {
                    warn!(error = %e, "Failed to unbind stale LDAP connection");
                }
            } else {
                debug!(%message, "LDAP search failed on a connection that is no longer cached");
            }
        }
        result
    }

    pub async fn search_users(
        &self,
        username_pattern: &str,
        query: &UserQuery,
    ) -> Result<SearchOutcome<UserRecord>> {
        let conn = self.connection().await?;
        let result = conn.search_users(username_pattern, query).await;
        self.check(&conn, result).await
    }

    pub async fn find_users(&self, username_pattern: &str, query: &UserQuery) -> Result<Vec<UserRecord>> {
        let conn = self.connection().await?;
        let result = conn.find_users(username_pattern, query).await;
        self.check(&conn, result).await
    }

    pub async fn search_groups(
        &self,
        groupname_pattern: &str,
        query: &GroupQuery,
    ) -> Result<SearchOutcome<GroupRecord>> {
        let conn = self.connection().await?;
        let result = conn.search_groups(groupname_pattern, query).await;
        self.check(&conn, result).await
    }

    pub async fn find_groups(&self, groupname_pattern: &str, query: &GroupQuery) -> Result<Vec<GroupRecord>> {
        let conn = self.connection().await?;
        let result = conn.find_groups(groupname_pattern, query).await;
        self.check(&conn, result).await
    }

    pub async fn find_members_of_group(
        &self,
        dn: &str,
        search_attr: &str,
        ldap_filter: &str,
        scope: SearchScope,
    ) -> Result<SearchOutcome<RawEntry>> {
        let conn = self.connection().await?;
        let result = conn
            .find_members_of_group(dn, search_attr, ldap_filter, scope)
            .await;
        self.check(&conn, result).await
    }

    pub async fn find_users_of_group(&self, dn: &str) -> Result<Vec<UserRecord>> {
        let conn = self.connection().await?;
        let result = conn.find_users_of_group(dn).await;
        self.check(&conn, result).await
    }

    pub async fn find_groups_of_group(&self, dn: &str) -> Result<Vec<GroupRecord>> {
        let conn = self.connection().await?;
        let result = conn.find_groups_of_group(dn).await;
        self.check(&conn, result).await
    }

    pub async fn server_info(&self) -> Result<ServerInfo> {
        let conn = self.connection().await?;
        let result = conn.server_info().await;
        self.check(&conn, result).await
    }
}
