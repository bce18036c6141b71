//! Error types for ns-core
//!
//! A single tagged error type covers every way a listing call can fail.
//! Only the `Status` variant carries an HTTP status code.

use thiserror::Error;

/// Result type alias for ns-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// DNS, connect or I/O failure while talking to the server
    Network,
    /// The server answered with a non-success status
    Status,
    /// The response body could not be decoded
    Decode,
    /// The request could not be built or the client could not be configured
    Request,
}

/// Error types for ns-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure (not retried)
    #[error("GET '{url}' failed: {message}")]
    Network { url: String, message: String },

    /// Non-success HTTP status
    #[error("GET '{url}' returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Malformed document or unsupported declared charset
    #[error("response of GET '{url}' decode error: {message}")]
    Decode { url: String, message: String },

    /// Request could not be constructed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Category of this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::Network { .. } => ErrorKind::Network,
            Error::Status { .. } => ErrorKind::Status,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::InvalidRequest(_) | Error::Config(_) => ErrorKind::Request,
        }
    }

    /// HTTP status code, present only for status failures
    pub const fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller-driven retry may succeed.
    ///
    /// The client never retries on its own.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Error::Network { .. } => true,
            Error::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
