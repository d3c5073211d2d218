use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] leavebook_core::Error),
    #[error(transparent)]
    Validation(#[from] leavebook_core::ValidationError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid record id: {0:?}")]
    InvalidRecordId(String),
    #[error("Invalid month {0:?}, expected YYYY-MM")]
    InvalidMonth(String),
    #[error("{0}")]
    Blocked(String),
    #[error("Could not resolve the {0} directory for this platform")]
    MissingDirectory(&'static str),
}
