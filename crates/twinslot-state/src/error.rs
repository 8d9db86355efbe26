//! Error types for the twinslot state store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    /// Another process has the database open.
    #[error("state store is in use by another twinslot process")]
    Busy,

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("deployment {0} is already completed")]
    Immutable(String),

    #[error("lease held by {holder} ({operation}, state {state}) until {expires_at}")]
    LeaseHeld {
        holder: String,
        operation: String,
        state: String,
        expires_at: u64,
    },
}
