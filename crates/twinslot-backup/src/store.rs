//! Backup artifact storage.

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{BackupError, BackupResult};

/// Durable storage for backup artifacts.
pub trait ObjectStore {
    /// Store `data` under `key` and return its location.
    fn put(&self, key: &str, data: &[u8]) -> impl Future<Output = BackupResult<String>> + Send;
}

/// Stores objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Map a `/`-separated key to a path under the root, rejecting escapes.
    fn object_path(&self, key: &str) -> BackupResult<PathBuf> {
        let rel = Path::new(key);
        let clean = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(BackupError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, data: &[u8]) -> BackupResult<String> {
        let path = self.object_path(key)?;
        let store_err = |source| BackupError::Store {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(store_err)?;
        }
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, data).await.map_err(store_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(store_err)?;
        debug!(path = %path.display(), bytes = data.len(), "object stored");
        Ok(format!("file://{}", path.display()))
    }
}
