//! Error type carried in the error slot of a completion outcome.
//!
//! # Design
//! The seam has no error taxonomy of its own. `SessionError` is the common
//! shape every binding reports through; HTTP status codes are never errors
//! here, a 404 arrives as data plus a response. `Cancelled` gets a dedicated
//! variant because callers usually treat it as "nothing to report".

/// Failure reported asynchronously by a `Session` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The task was cancelled before it produced a result.
    #[error("task cancelled")]
    Cancelled,

    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Host lookup or connection setup failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other I/O or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }
}
