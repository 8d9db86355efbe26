//! twinslot blue-green orchestrator: two slots, one live.
//!
//! This crate provides the deployment state machine that stands up a new
//! copy of the service stack in the idle slot, gates it on health, cuts
//! traffic over, verifies, and rolls back automatically on failure.
//!
//! # Components
//!
//! - **`phase`**: orchestrator phases and the legal transition table
//! - **`registry`**: which slot is active (platform markers + routing target)
//! - **`executor`**: provisioning and post-start maintenance
//! - **`cutover`**: traffic switch and unchanged-routing confirmation
//! - **`rollback`**: restore routing, then stop the failed slot
//! - **`cleanup`**: decommission a slot including volumes
//! - **`orchestrator`**: `deploy`, `status`, `rollback`, `cleanup`
//!
//! Components never call each other; every collaborator call is made from
//! the orchestrator, which passes the platform and router in by reference.

pub mod cleanup;
pub mod cutover;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod phase;
pub mod registry;
pub mod rollback;

pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{
    CleanupReport, Orchestrator, OrchestratorSettings, RecordedState, RollbackReport, SlotReport,
    StatusReport,
};
pub use phase::{Phase, PhaseTracker};
pub use registry::EnvironmentRegistry;
