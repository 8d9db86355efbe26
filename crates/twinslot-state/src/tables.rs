//! redb table definitions for the twinslot state store.

use redb::TableDefinition;

/// Deployment records keyed by `{started_at:020}:{id}`.
pub const DEPLOYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deployments");

/// The run lease, stored under [`LEASE_KEY`].
pub const LEASE: TableDefinition<&str, &[u8]> = TableDefinition::new("lease");

pub const LEASE_KEY: &str = "run";
