//! Orchestrator phases and the legal transition table.
//!
//! Every operation walks the same machine. `deploy` uses the full path,
//! `status` only discovers, `rollback` discovers then rolls back, and
//! `cleanup` goes straight to cleaning up. Terminal phases end a run.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OrchestratorError, OrchestratorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    Discovering,
    BackingUp,
    Deploying,
    HealthChecking,
    CuttingOver,
    Verifying,
    CleaningUp,
    RollingBack,
    DoneSuccess,
    DoneDeployFailed,
    DoneRolledBack,
    DoneRollbackFailed,
    /// Terminal phase for `status`, standalone `rollback` and `cleanup`.
    Done,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Discovering => "DISCOVERING",
            Phase::BackingUp => "BACKING_UP",
            Phase::Deploying => "DEPLOYING",
            Phase::HealthChecking => "HEALTH_CHECKING",
            Phase::CuttingOver => "CUTTING_OVER",
            Phase::Verifying => "VERIFYING",
            Phase::CleaningUp => "CLEANING_UP",
            Phase::RollingBack => "ROLLING_BACK",
            Phase::DoneSuccess => "DONE_SUCCESS",
            Phase::DoneDeployFailed => "DONE_DEPLOY_FAILED",
            Phase::DoneRolledBack => "DONE_ROLLED_BACK",
            Phase::DoneRollbackFailed => "DONE_ROLLBACK_FAILED",
            Phase::Done => "DONE",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::DoneSuccess
                | Phase::DoneDeployFailed
                | Phase::DoneRolledBack
                | Phase::DoneRollbackFailed
                | Phase::Done
        )
    }

    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Discovering | CleaningUp)
                | (Discovering, BackingUp | Deploying | RollingBack | Done)
                | (BackingUp, Deploying)
                | (Deploying, HealthChecking | DoneDeployFailed)
                | (HealthChecking, CuttingOver | DoneDeployFailed)
                | (CuttingOver, Verifying | RollingBack | DoneDeployFailed)
                | (Verifying, CleaningUp | RollingBack | DoneSuccess)
                | (CleaningUp, DoneSuccess | Done)
                | (RollingBack, DoneRolledBack | DoneRollbackFailed | Done)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current phase plus every phase visited so far.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: Phase,
    trail: Vec<Phase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: Phase::Idle,
            trail: vec![Phase::Idle],
        }
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn labels(&self) -> Vec<String> {
        self.trail.iter().map(|p| p.label().to_string()).collect()
    }

    /// Move to `next`, rejecting transitions outside the table.
    pub fn advance(&mut self, next: Phase) -> OrchestratorResult<()> {
        if !self.current.can_transition(next) {
            return Err(OrchestratorError::IllegalTransition {
                from: self.current,
                to: next,
            });
        }
        debug!(from = %self.current, to = %next, "phase transition");
        self.current = next;
        self.trail.push(next);
        Ok(())
    }
}
