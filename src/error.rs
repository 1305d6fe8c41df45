//! Error types for sqlforge.

use thiserror::Error;

/// The main error type for sqlforge operations.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Could not reach the database or authenticate.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database rejected or failed a statement.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Missing or invalid configuration (credentials, dataset shape).
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error reading a query file or writing an artifact.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForgeError {
    /// Create a connection error from any displayable cause.
    pub fn connection(cause: impl std::fmt::Display) -> Self {
        Self::Connection(cause.to_string())
    }

    /// Create an execution error from any displayable cause.
    pub fn execution(cause: impl std::fmt::Display) -> Self {
        Self::Execution(cause.to_string())
    }

    /// Create a configuration error from any displayable cause.
    pub fn config(cause: impl std::fmt::Display) -> Self {
        Self::Config(cause.to_string())
    }
}

/// Result type alias for sqlforge operations.
pub type ForgeResult<T> = Result<T, ForgeError>;
