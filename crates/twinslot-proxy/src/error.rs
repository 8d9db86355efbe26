//! Error types for the routing layer.

use std::path::PathBuf;

use thiserror::Error;
use twinslot_platform::CommandError;

pub type RoutingResult<T> = Result<T, RoutingError>;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reload failed; the previous upstream file was put back.
    #[error("proxy reload failed (previous config restored: {restored}): {source}")]
    Reload {
        restored: bool,
        #[source]
        source: CommandError,
    },

    #[error("{} is not managed by twinslot (no target marker)", .0.display())]
    Unmanaged(PathBuf),

    #[error("{} has an unreadable target marker: {value}", path.display())]
    BadMarker { path: PathBuf, value: String },
}
