//! Dirq LDAP adapter
//!
//! User and group lookups against an LDAP directory:
//! - Injection-safe filter construction with glob wildcards
//! - Search by attribute pattern or by distinguished name
//! - Group membership resolution via `member`, `memberUid`, `memberOf`
//!   and `isMemberOf`
//! - A lazily bound, shared connection per configured server

pub mod attrs;
pub mod backend;
pub mod connection;
pub mod directory;
pub mod filter;
pub mod tls;
pub mod transform;

pub use attrs::AttributeMap;
pub use backend::{DirectoryBackend, Ldap3Backend, RawEntry, SearchOutcome, SearchRequest};
pub use connection::{GroupQuery, LdapConnection, UserQuery};
pub use directory::{ConnectFuture, Connector, Directory};
pub use filter::{resolve_search_scope, sanitize_pattern};

#[cfg(test)]
pub(crate) mod testing {
    use crate::backend::{DirectoryBackend, RawEntry, SearchOutcome, SearchRequest};
    use async_trait::async_trait;
    use dirq_core::{Error, Result};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted backend. Responses are returned in push order; once they run
    /// out every search succeeds with no entries.
    #[derive(Default)]
    pub struct MockBackend {
        requests: Arc<Mutex<Vec<SearchRequest>>>,
        responses: Mutex<VecDeque<Result<SearchOutcome<RawEntry>>>>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Shared log of every request issued
        pub fn requests(&self) -> Arc<Mutex<Vec<SearchRequest>>> {
            self.requests.clone()
        }

        pub fn push_success(&self, entries: Vec<RawEntry>) {
            self.push(Ok(SearchOutcome::Success(entries)));
        }

        pub fn push_failure(&self, code: u32, message: &str) {
            self.push(Ok(SearchOutcome::Failure {
                code,
                message: message.to_string(),
            }));
        }

        pub fn push_error(&self, error: Error) {
            self.push(Err(error));
        }

        fn push(&self, response: Result<SearchOutcome<RawEntry>>) {
            self.responses.lock().unwrap().push_back(response);
        }
    }

    #[async_trait]
    impl DirectoryBackend for MockBackend {
        async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome<RawEntry>> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(SearchOutcome::Success(Vec::new())))
        }

        async fn unbind(&self) -> Result<()> {
            Ok(())
        }
    }
}
