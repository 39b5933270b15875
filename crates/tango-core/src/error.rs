//! Error types shared across the front end.

use thiserror::Error;

/// Errors raised by chat platform operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The channel or message no longer exists or is inaccessible.
    ///
    /// Callers resolving an acknowledgment context treat this as a
    /// normal outcome (suppress output), never as a failure.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The chat API rejected the request.
    #[error("chat API error {status}: {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        detail: String,
    },

    /// Transport-level HTTP failure.
    #[error("chat HTTP error: {0}")]
    Http(String),

    /// A response could not be interpreted.
    #[error("malformed chat API response: {0}")]
    Malformed(String),
}

impl ChatError {
    /// Returns `true` if the error means the target no longer exists.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors raised at the command boundary.
#[derive(Debug, Error)]
pub enum TangoError {
    /// The backend connection capability is absent.
    #[error("not connected to the word-game backend")]
    BackendUnavailable,

    /// A command parameter failed local validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A chat platform operation failed.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// The backend transport failed while sending; the current command
    /// is aborted, not retried.
    #[error("backend transport failure: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias.
pub type TangoResult<T> = Result<T, TangoError>;
