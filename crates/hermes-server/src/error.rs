//! Server error types.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the server.
///
/// Per-connection failures are logged by the connection task and never
/// surface here.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address is invalid or could not be bound.
    #[error("Bind error: {0}")]
    BindError(String),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
