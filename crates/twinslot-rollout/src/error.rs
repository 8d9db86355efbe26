//! Orchestrator errors.
//!
//! Deployment failures (health timeout, verification failure, rollback
//! failure) are not errors: they are recorded outcomes on the
//! `DeploymentRecord`. Errors here abort an operation before or outside
//! the deployment state machine.

use thiserror::Error;

use twinslot_platform::PlatformError;
use twinslot_proxy::RoutingError;
use twinslot_state::{StateError, SlotId};

use crate::phase::Phase;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Missing configuration or artifact; nothing was touched.
    #[error("prerequisite missing: {0}")]
    Prerequisite(String),

    /// Another run holds the lease (or the state store).
    #[error("another twinslot run is in progress: {0}")]
    LeaseHeld(String),

    /// The store failed mid-run, after phase transitions had begun.
    #[error("state store error: {0}")]
    State(StateError),

    #[error("discovery failed: platform unreachable: {0}")]
    DiscoveryPlatform(#[source] PlatformError),

    #[error("discovery failed: routing layer unreadable: {0}")]
    DiscoveryRouting(#[source] RoutingError),

    #[error("illegal phase transition {from} -> {to}")]
    IllegalTransition { from: Phase, to: Phase },

    #[error("nothing to roll back to: {0}")]
    NothingToRollBack(String),

    /// Routing could not be restored to `to`. Manual intervention required.
    #[error("rollback from slot {from} to slot {to} failed: {source}")]
    RollbackFailed {
        from: SlotId,
        to: SlotId,
        #[source]
        source: RoutingError,
    },
}

impl From<StateError> for OrchestratorError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::LeaseHeld { .. } | StateError::Busy => {
                OrchestratorError::LeaseHeld(e.to_string())
            }
            other => OrchestratorError::State(other),
        }
    }
}

impl OrchestratorError {
    /// Store failure before any phase transition. Nothing has been touched
    /// yet, so it is reported as a missing prerequisite.
    pub fn store_unavailable(e: StateError) -> Self {
        match Self::from(e) {
            OrchestratorError::State(e) => {
                OrchestratorError::Prerequisite(format!("state store unavailable: {e}"))
            }
            other => other,
        }
    }
}
