//! Error types for backups.

use std::path::PathBuf;

use thiserror::Error;
use twinslot_platform::CommandError;

pub type BackupResult<T> = Result<T, BackupError>;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("database dump failed: {0}")]
    Dump(#[from] CommandError),

    #[error("database dump was empty")]
    EmptyDump,

    #[error("failed to store backup at {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object key '{0}'")]
    InvalidKey(String),
}
