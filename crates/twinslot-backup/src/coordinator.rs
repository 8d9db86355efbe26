//! Backup coordinator: dump, checksum, store.

use std::future::Future;

use sha2::{Digest, Sha256};
use tracing::info;

use twinslot_state::{BackupRecord, SlotId, unix_now, unix_now_millis};

use crate::dumper::DatabaseDumper;
use crate::error::BackupResult;
use crate::store::ObjectStore;

/// Takes a snapshot of the durable state behind a slot.
pub trait Snapshotter {
    fn snapshot(&self, slot: SlotId) -> impl Future<Output = BackupResult<BackupRecord>> + Send;
}

pub struct BackupCoordinator<D, O> {
    project: String,
    dumper: D,
    store: O,
}

impl<D, O> BackupCoordinator<D, O> {
    pub fn new(project: &str, dumper: D, store: O) -> Self {
        Self {
            project: project.to_string(),
            dumper,
            store,
        }
    }
}

impl<D, O> Snapshotter for BackupCoordinator<D, O>
where
    D: DatabaseDumper + Sync,
    O: ObjectStore + Sync,
{
    async fn snapshot(&self, slot: SlotId) -> BackupResult<BackupRecord> {
        let data = self.dumper.dump(slot).await?;
        let sha256 = hex::encode(Sha256::digest(&data));

        let id = format!("{}-{}-{}", self.project, slot.suffix(), unix_now_millis());
        let key = format!("{}/{}/{id}.sql", self.project, slot.suffix());
        let location = self.store.put(&key, &data).await?;

        let record = BackupRecord {
            id,
            created_at: unix_now(),
            size_bytes: data.len() as u64,
            location,
            sha256,
        };
        info!(
            %slot,
            backup = %record.id,
            bytes = record.size_bytes,
            location = %record.location,
            "backup stored"
        );
        Ok(record)
    }
}
