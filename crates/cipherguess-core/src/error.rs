//! Error types for cipherguess
//!
//! Three layers of failure exist:
//! - [`Error`]: a backend payload that does not satisfy the prediction contract
//! - [`BackendFailure`]: what went wrong while talking to the classification service
//! - [`GuessError`]: the caller-facing taxonomy every orchestrator operation returns

use std::time::Duration;

/// Result type alias using cipherguess's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Contract violations found while validating a backend payload
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field is present but outside its documented range
    #[error("invalid prediction payload: {0}")]
    InvalidPayload(String),

    /// The payload could not be decoded at all
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new invalid payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }
}

/// Failure of a single call to the classification backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendFailure {
    /// No connection could be established (refused, DNS, connect timeout)
    #[error("cannot connect to {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Connected, but no complete answer arrived in time
    #[error("no response within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The backend answered with a non-success status
    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The backend answered 2xx with a body that breaks the contract
    #[error("malformed backend payload: {0}")]
    Malformed(String),

    /// Any other transport failure after the connection was made
    #[error("transport error: {0}")]
    Transport(String),
}

impl BackendFailure {
    /// Whether restarting the backend is the likely fix
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

impl From<Error> for BackendFailure {
    fn from(err: Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Stable discriminator for caller-facing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller's request was malformed; fix it and resubmit
    Validation,
    /// The classification backend is down; try again later
    BackendUnreachable,
    /// The classification backend ran but failed
    Backend,
}

impl ErrorKind {
    /// HTTP status code this kind maps to
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::BackendUnreachable => 503,
            Self::Backend => 500,
        }
    }

    /// Short label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::BackendUnreachable => "backend_unreachable",
            Self::Backend => "backend_error",
        }
    }
}

/// Outcome of a failed orchestrator operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuessError {
    #[error("{0}")]
    Validation(String),

    #[error("classification backend at {url} is unreachable: {reason}")]
    BackendUnreachable { url: String, reason: String },

    #[error("{0}")]
    Backend(BackendFailure),
}

impl GuessError {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::BackendUnreachable { .. } => ErrorKind::BackendUnreachable,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }
}

impl From<BackendFailure> for GuessError {
    fn from(failure: BackendFailure) -> Self {
        match failure {
            BackendFailure::Unreachable { url, reason } => {
                Self::BackendUnreachable { url, reason }
            }
            other @ (BackendFailure::Timeout(_)
            | BackendFailure::Status { .. }
            | BackendFailure::Malformed(_)
            | BackendFailure::Transport(_)) => Self::Backend(other),
        }
    }
}
