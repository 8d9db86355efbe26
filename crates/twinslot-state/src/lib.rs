//! twinslot-state: domain types and embedded state for twinslot.
//!
//! Backed by [redb](https://docs.rs/redb), the store keeps the deployment
//! history and the run lease that serializes orchestrator invocations.
//!
//! # Architecture
//!
//! All records are JSON-serialized into redb's `&[u8]` value columns.
//! Deployment keys are `{started_at:020}:{id}` so a plain table scan yields
//! records in start order. The lease lives under a single fixed key.
//!
//! Environments, probe results and service statuses are not persisted; they
//! are rebuilt from the platform on every run.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{LeaseAcquisition, StateStore};
pub use types::*;
