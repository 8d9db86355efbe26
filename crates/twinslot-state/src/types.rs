//! Domain types for twinslot.
//!
//! Environments and probe results describe the live system and are rebuilt
//! on every run. Deployment records and the lease are persisted in the
//! state store. Timestamps are unix seconds.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub use twinslot_core::{ServiceName, SlotId};

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Current unix time in milliseconds.
pub fn unix_now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Current unix time in nanoseconds; used for sortable unique ids.
pub fn unix_now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

// ── Environment ───────────────────────────────────────────────────

/// Whether a slot currently receives public traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Active,
    Inactive,
    Unknown,
}

/// One of the two slots as seen by the environment registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub slot: SlotId,
    pub role: Role,
    /// Whether the platform reports the slot's project as present.
    pub provisioned: bool,
    pub service_set: Vec<ServiceName>,
    pub last_health: Option<HealthProbeResult>,
}

/// Result of discovering both slots plus the routing target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub active: Option<Environment>,
    pub inactive: Option<Environment>,
    /// Slot the routing layer points at, if any.
    pub routed: Option<SlotId>,
}

impl Topology {
    pub fn active_slot(&self) -> Option<SlotId> {
        self.active.as_ref().map(|e| e.slot)
    }

    /// Both environments, active first.
    pub fn environments(&self) -> impl Iterator<Item = &Environment> {
        self.active.iter().chain(self.inactive.iter())
    }

    pub fn environment(&self, slot: SlotId) -> Option<&Environment> {
        self.environments().find(|e| e.slot == slot)
    }

    /// Number of environments holding the active role.
    pub fn active_count(&self) -> usize {
        self.environments().filter(|e| e.role == Role::Active).count()
    }
}

// ── Service status ────────────────────────────────────────────────

/// Container health as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    Unknown,
}

/// One row of the platform's service-status view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service: ServiceName,
    pub running: bool,
    /// `None` when the service defines no healthcheck.
    pub health: Option<HealthStatus>,
}

impl ServiceStatus {
    /// Healthy if the healthcheck says so, or running without a healthcheck.
    pub fn is_healthy(&self) -> bool {
        match self.health {
            Some(HealthStatus::Healthy) => true,
            Some(_) => false,
            None => self.running,
        }
    }
}

// ── Health probe ──────────────────────────────────────────────────

/// Outcome of one whole-slot health polling attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthProbeResult {
    pub attempt: u32,
    pub timestamp: u64,
    pub healthy_services: u32,
    pub total_services: u32,
    pub passed: bool,
}

impl HealthProbeResult {
    /// Build a result; it passes only when every expected service is healthy.
    pub fn evaluate(attempt: u32, timestamp: u64, healthy_services: u32, total_services: u32) -> Self {
        Self {
            attempt,
            timestamp,
            healthy_services,
            total_services,
            passed: total_services > 0 && healthy_services == total_services,
        }
    }
}

// ── Backup ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: String,
    pub created_at: u64,
    pub size_bytes: u64,
    pub location: String,
    /// Hex SHA-256 of the stored payload.
    pub sha256: String,
}

// ── Deployment ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentOutcome {
    Success,
    DeployFailed,
    RolledBack,
    /// Routing could not be restored; an operator has to step in.
    RollbackFailed,
}

impl DeploymentOutcome {
    pub fn label(self) -> &'static str {
        match self {
            DeploymentOutcome::Success => "SUCCESS",
            DeploymentOutcome::DeployFailed => "DEPLOY_FAILED",
            DeploymentOutcome::RolledBack => "ROLLED_BACK",
            DeploymentOutcome::RollbackFailed => "ROLLBACK_FAILED",
        }
    }
}

/// One `deploy` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    pub target_slot: SlotId,
    pub previous_slot: Option<SlotId>,
    pub started_at: u64,
    pub completed_at: Option<u64>,
    pub outcome: Option<DeploymentOutcome>,
    pub backup: Option<BackupRecord>,
    pub last_health: Option<HealthProbeResult>,
    pub failure_reason: Option<String>,
    /// Orchestrator states visited, in order.
    pub trail: Vec<String>,
}

impl DeploymentRecord {
    pub fn new(id: String, target_slot: SlotId, previous_slot: Option<SlotId>, started_at: u64) -> Self {
        Self {
            id,
            target_slot,
            previous_slot,
            started_at,
            completed_at: None,
            outcome: None,
            backup: None,
            last_health: None,
            failure_reason: None,
            trail: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Seal the record. A completed record is never changed again; returns
    /// false if it was already completed.
    pub fn complete(&mut self, outcome: DeploymentOutcome, at: u64) -> bool {
        if self.is_completed() {
            return false;
        }
        self.outcome = Some(outcome);
        self.completed_at = Some(at);
        true
    }

    /// Build the composite key for the deployments table.
    pub fn table_key(&self) -> String {
        format!("{:020}:{}", self.started_at, self.id)
    }
}

// ── Lease ─────────────────────────────────────────────────────────

/// Mutual-exclusion record held for one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    pub holder: String,
    pub operation: String,
    pub acquired_at: u64,
    pub expires_at: u64,
    /// Last orchestrator state the holder reported.
    pub state: String,
}

impl LeaseRecord {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}
