use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by remote store operations.
pub enum StoreError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("request to '{url}' failed: {message}")]
    Http {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The store answered with a non-success HTTP status.
    #[error("store returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The store rejected a command.
    #[error("{command} failed: {message}")]
    Command {
        /// Command name.
        command: &'static str,
        /// Error message reported by the store.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("failed to decode store response: {0}")]
    Decode(String),

    /// The reply had a different shape than the command produces.
    #[error("unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply {
        /// Expected shape.
        expected: &'static str,
        /// Debug rendering of the actual reply.
        actual: String,
    },
}

impl StoreError {
    /// Returns `true` for errors worth retrying at the transport layer.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Http { .. } => true,
            StoreError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
