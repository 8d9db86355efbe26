//! Error types for platform operations.

use thiserror::Error;

use crate::command::CommandError;

pub type PlatformResult<T> = Result<T, PlatformError>;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to parse {what} output: {message}")]
    Parse { what: &'static str, message: String },

    #[error("platform rejected request: {0}")]
    Rejected(String),
}
