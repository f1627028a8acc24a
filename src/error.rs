//! Error types
//!
//! Every user action ends in one of four outcomes when it fails:
//! login required, session expired, validation, or a transient network
//! failure. None of them are retried automatically.

use thiserror::Error;

use crate::cache::CacheError;
use crate::client::ClientError;
use crate::config::ConfigError;

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    /// No token is present; the action is blocked before any request
    #[error("Login required")]
    AuthRequired,

    /// The server rejected the token (HTTP 401)
    #[error("Your session has expired, please log in again")]
    SessionExpired,

    /// Form incomplete, date taken, or similar user-correctable input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other failure talking to the server
    #[error("Request failed: {0}")]
    Client(ClientError),

    /// Local cache failure
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration failure
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ClientError> for Error {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::MissingToken => Error::AuthRequired,
            ClientError::Unauthorized => Error::SessionExpired,
            other => Error::Client(other),
        }
    }
}

/// Coarse classification used when reporting failures to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthRequired,
    SessionExpired,
    Validation,
    Transient,
    Local,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AuthRequired => ErrorKind::AuthRequired,
            Error::SessionExpired => ErrorKind::SessionExpired,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Client(_) => ErrorKind::Transient,
            Error::Cache(_) | Error::Config(_) => ErrorKind::Local,
        }
    }

    /// Whether the user has to log in (again) before retrying
    pub fn needs_login(&self) -> bool {
        matches!(self.kind(), ErrorKind::AuthRequired | ErrorKind::SessionExpired)
    }
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;
