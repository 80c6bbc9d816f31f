//! Error types for Dirq

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Connection Errors
    #[error("Failed to bind to LDAP server as user {bind_dn}")]
    Bind { bind_dn: String },

    #[error("Failed to bind to LDAP server anonymously")]
    AnonymousBind,

    #[error("Failed to connect to LDAP server: {0}")]
    Connect(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    // Search Errors
    #[error(
        "Distinguished Name provided does not contain configured Base DN. Base DN: {base_dn}, DN: {dn}"
    )]
    ConfigMismatch { base_dn: String, dn: String },

    #[error("LDAP search failed: {0}")]
    Search(String),

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Bind { .. } => "BindFailed",
            Error::AnonymousBind => "AnonymousBindFailed",
            Error::Connect(_) => "ConnectFailed",
            Error::Tls(_) => "TlsError",
            Error::ConfigMismatch { .. } => "ConfigMismatch",
            Error::Search(_) => "SearchFailed",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    /// Whether the error came from establishing the session
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::Bind { .. } | Error::AnonymousBind | Error::Connect(_) | Error::Tls(_)
        )
    }
}
