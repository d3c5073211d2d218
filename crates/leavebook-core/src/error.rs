//! Error types for leavebook-core

use thiserror::Error;

use crate::remote::RemoteError;
use crate::validation::ValidationError;

/// Result type alias using leavebook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in leavebook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record rejected by validation
    #[error("Invalid leave record: {0}")]
    Validation(#[from] ValidationError),

    /// Remote store error
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
