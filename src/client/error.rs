//! HTTP client error types

use thiserror::Error;

/// Errors that can occur when talking to the journaling API
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No bearer token provided")]
    MissingToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("API unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Classify a transport error
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Unavailable
        } else {
            ClientError::Request(err)
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
