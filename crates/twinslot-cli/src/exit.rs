//! Process exit codes.

use std::process::ExitCode;

use twinslot_core::ConfigError;
use twinslot_rollout::OrchestratorError;
use twinslot_state::DeploymentOutcome;

/// Deployment failed or was rolled back; traffic is on a known-good slot.
pub const FAILED: u8 = 1;
/// Missing config or artifact, or another run holds the lease.
pub const PREREQUISITE: u8 = 2;
/// Rollback failed; an operator has to restore traffic.
pub const MANUAL_INTERVENTION: u8 = 3;

pub fn for_outcome(outcome: DeploymentOutcome) -> ExitCode {
    ExitCode::from(outcome_code(outcome))
}

pub fn outcome_code(outcome: DeploymentOutcome) -> u8 {
    match outcome {
        DeploymentOutcome::Success => 0,
        DeploymentOutcome::DeployFailed | DeploymentOutcome::RolledBack => FAILED,
        DeploymentOutcome::RollbackFailed => MANUAL_INTERVENTION,
    }
}

pub fn for_error(err: &anyhow::Error) -> ExitCode {
    ExitCode::from(error_code(err))
}

pub fn error_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return PREREQUISITE;
    }
    match err.downcast_ref::<OrchestratorError>() {
        Some(OrchestratorError::Prerequisite(_) | OrchestratorError::LeaseHeld(_)) => PREREQUISITE,
        Some(OrchestratorError::RollbackFailed { .. }) => MANUAL_INTERVENTION,
        _ => FAILED,
    }
}
