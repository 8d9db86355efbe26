//! StateStore: redb-backed persistence for twinslot.
//!
//! Holds the deployment history and the run lease. The store supports both
//! on-disk and in-memory backends (the latter for testing). redb keeps an
//! exclusive lock on the file while a process has it open; a second process
//! gets [`StateError::Busy`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use redb::{Database, DatabaseError, ReadableDatabase, ReadableTable};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Outcome of a successful lease acquisition.
#[derive(Debug, Clone)]
pub struct LeaseAcquisition {
    pub lease: LeaseRecord,
    /// An expired lease that was taken over, if any.
    pub replaced: Option<LeaseRecord>,
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(|e| match e {
            DatabaseError::DatabaseAlreadyOpen => StateError::Busy,
            other => StateError::Open(other.to_string()),
        })?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        txn.open_table(LEASE).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Deployments ────────────────────────────────────────────────

    /// Insert or update a deployment record.
    ///
    /// A record that is already stored as completed cannot be overwritten.
    pub fn put_deployment(&self, record: &DeploymentRecord) -> StateResult<()> {
        let key = record.table_key();
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            let existing = table
                .get(key.as_str())
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec());
            if let Some(bytes) = existing {
                let stored: DeploymentRecord =
                    serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;
                if stored.is_completed() {
                    return Err(StateError::Immutable(record.id.clone()));
                }
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "deployment stored");
        Ok(())
    }

    /// Get a deployment by its id.
    pub fn get_deployment(&self, id: &str) -> StateResult<Option<DeploymentRecord>> {
        let suffix = format!(":{id}");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().ends_with(&suffix) {
                let record: DeploymentRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// List deployments, newest first, up to `limit` records.
    pub fn list_deployments(&self, limit: usize) -> StateResult<Vec<DeploymentRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))?.rev().take(limit) {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: DeploymentRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    /// Most recently started deployment.
    pub fn last_deployment(&self) -> StateResult<Option<DeploymentRecord>> {
        Ok(self.list_deployments(1)?.into_iter().next())
    }

    // ── Lease ──────────────────────────────────────────────────────

    /// Take the run lease for `holder`.
    ///
    /// Fails with [`StateError::LeaseHeld`] while an unexpired lease exists.
    /// An expired lease is replaced and returned in the acquisition.
    pub fn acquire_lease(
        &self,
        holder: &str,
        operation: &str,
        ttl: Duration,
        now: u64,
    ) -> StateResult<LeaseAcquisition> {
        let lease = LeaseRecord {
            holder: holder.to_string(),
            operation: operation.to_string(),
            acquired_at: now,
            expires_at: now.saturating_add(ttl.as_secs().max(1)),
            state: "IDLE".to_string(),
        };
        let value = serde_json::to_vec(&lease).map_err(map_err!(Serialize))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let replaced;
        {
            let mut table = txn.open_table(LEASE).map_err(map_err!(Table))?;
            let existing = table
                .get(LEASE_KEY)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec());
            replaced = match existing {
                Some(bytes) => {
                    let current: LeaseRecord =
                        serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;
                    if !current.is_expired(now) {
                        return Err(StateError::LeaseHeld {
                            holder: current.holder,
                            operation: current.operation,
                            state: current.state,
                            expires_at: current.expires_at,
                        });
                    }
                    warn!(
                        holder = %current.holder,
                        operation = %current.operation,
                        state = %current.state,
                        "taking over expired lease; previous run did not finish"
                    );
                    Some(current)
                }
                None => None,
            };
            table
                .insert(LEASE_KEY, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(holder, operation, "lease acquired");
        Ok(LeaseAcquisition { lease, replaced })
    }

    /// Record the orchestrator state reached by the lease holder.
    ///
    /// Returns false if `holder` no longer owns the lease.
    pub fn update_lease_state(&self, holder: &str, state: &str) -> StateResult<bool> {
        self.modify_lease(holder, |lease| {
            lease.state = state.to_string();
            true
        })
    }

    /// Release the lease if `holder` owns it. Returns true if it was removed.
    pub fn release_lease(&self, holder: &str) -> StateResult<bool> {
        self.modify_lease(holder, |_| false)
    }

    /// Read-modify-write the lease owned by `holder`. The closure returns
    /// whether to keep the lease (true) or delete it (false).
    fn modify_lease<F>(&self, holder: &str, f: F) -> StateResult<bool>
    where
        F: FnOnce(&mut LeaseRecord) -> bool,
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let owned;
        {
            let mut table = txn.open_table(LEASE).map_err(map_err!(Table))?;
            let existing = table
                .get(LEASE_KEY)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec());
            let mut lease = match existing {
                Some(bytes) => {
                    serde_json::from_slice::<LeaseRecord>(&bytes).map_err(map_err!(Deserialize))?
                }
                None => return Ok(false),
            };
            owned = lease.holder == holder;
            if owned {
                if f(&mut lease) {
                    let value = serde_json::to_vec(&lease).map_err(map_err!(Serialize))?;
                    table
                        .insert(LEASE_KEY, value.as_slice())
                        .map_err(map_err!(Write))?;
                } else {
                    table.remove(LEASE_KEY).map_err(map_err!(Write))?;
                }
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(owned)
    }

    /// The current lease, if any (expired or not).
    pub fn current_lease(&self) -> StateResult<Option<LeaseRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(LEASE).map_err(map_err!(Table))?;
        match table.get(LEASE_KEY).map_err(map_err!(Read))? {
            Some(guard) => {
                let lease: LeaseRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(lease))
            }
            None => Ok(None),
        }
    }

    /// Remove the lease regardless of holder. Returns the removed record.
    pub fn break_lease(&self) -> StateResult<Option<LeaseRecord>> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let removed = {
            let mut table = txn.open_table(LEASE).map_err(map_err!(Table))?;
            table
                .remove(LEASE_KEY)
                .map_err(map_err!(Write))?
                .map(|guard| guard.value().to_vec())
        };
        txn.commit().map_err(map_err!(Transaction))?;
        match removed {
            Some(bytes) => {
                let lease = serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;
                Ok(Some(lease))
            }
            None => Ok(None),
        }
    }
}
