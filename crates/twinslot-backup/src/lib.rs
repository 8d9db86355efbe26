//! twinslot-backup: logical snapshot of durable state before a deploy.
//!
//! A snapshot is a database dump ([`DatabaseDumper`]) written to external
//! storage ([`ObjectStore`]). The orchestrator treats every error here as a
//! warning: a missing backup never blocks a deployment.

pub mod coordinator;
pub mod dumper;
pub mod error;
pub mod store;

pub use coordinator::{BackupCoordinator, Snapshotter};
pub use dumper::{CommandDumper, DatabaseDumper};
pub use error::{BackupError, BackupResult};
pub use store::{FsObjectStore, ObjectStore};
