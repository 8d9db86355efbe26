//! Deployment orchestrator: drives one run through the phase machine.
//!
//! The orchestrator is the only place that talks to collaborators. Each
//! operation is strictly sequential: every platform, routing, backup and
//! probe call is awaited before the next phase is entered. `deploy`,
//! `rollback` and `cleanup` hold the run lease for their whole duration;
//! `status` is a pure read and takes no lease.

use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use twinslot_backup::Snapshotter;
use twinslot_core::TwinslotConfig;
use twinslot_core::config::MaintenanceConfig;
use twinslot_health::{HealthProber, PostCutoverVerifier, PublicProbe};
use twinslot_platform::Platform;
use twinslot_proxy::RoutingLayer;
use twinslot_state::{
    DeploymentOutcome, DeploymentRecord, HealthProbeResult, LeaseRecord, Role, ServiceName,
    SlotId, StateStore, Topology, unix_now, unix_now_millis, unix_now_nanos,
};

use crate::cleanup::CleanupController;
use crate::cutover::CutoverController;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::executor::DeploymentExecutor;
use crate::phase::{Phase, PhaseTracker};
use crate::registry::EnvironmentRegistry;
use crate::rollback::RollbackController;

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub project: String,
    pub services: Vec<ServiceName>,
    pub max_attempts: u32,
    pub health_interval: Duration,
    pub stabilization: Duration,
    pub verify_timeout: Duration,
    pub lease_ttl: Duration,
    pub maintenance: Option<MaintenanceConfig>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &TwinslotConfig) -> Self {
        Self {
            project: config.project.name.clone(),
            services: config.project.services.clone(),
            max_attempts: config.health.max_attempts,
            health_interval: config.health_interval(),
            stabilization: config.stabilization(),
            verify_timeout: config.verify_timeout(),
            lease_ttl: config.lease_ttl(),
            maintenance: config.maintenance.clone(),
        }
    }
}

/// One slot as shown by `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotReport {
    pub slot: SlotId,
    pub role: Role,
    pub provisioned: bool,
    /// Whether the routing layer points at this slot.
    pub routed: bool,
    pub health: Option<HealthProbeResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub slots: Vec<SlotReport>,
    pub routed: Option<SlotId>,
    pub lease: Option<LeaseRecord>,
    pub last_deployment: Option<DeploymentRecord>,
}

impl StatusReport {
    pub fn active(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|s| s.role == Role::Active)
            .map(|s| s.slot)
    }
}

/// Lease and last deployment, read from the store up front so `status`
/// does not keep the store open while it queries the platform.
#[derive(Debug, Clone, Default)]
pub struct RecordedState {
    pub lease: Option<LeaseRecord>,
    pub last_deployment: Option<DeploymentRecord>,
}

impl RecordedState {
    /// Read failures are logged and reported as absent.
    pub fn read(store: &StateStore) -> Self {
        Self {
            lease: store.current_lease().unwrap_or_else(|e| {
                warn!(error = %e, "cannot read lease");
                None
            }),
            last_deployment: store.last_deployment().unwrap_or_else(|e| {
                warn!(error = %e, "cannot read deployment history");
                None
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    pub from: SlotId,
    pub to: SlotId,
    pub trail: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub destroyed: Vec<SlotId>,
    pub routing_cleared: bool,
    /// Problems that did not stop the cleanup.
    pub warnings: Vec<String>,
    pub trail: Vec<String>,
}

/// Blue-green orchestrator over a platform, a routing layer, a public
/// probe and an optional snapshotter.
pub struct Orchestrator<P, R, V, B> {
    settings: OrchestratorSettings,
    platform: P,
    router: R,
    probe: V,
    backup: Option<B>,
    store: Option<StateStore>,
    holder: String,
    registry: EnvironmentRegistry,
    prober: HealthProber,
    verifier: PostCutoverVerifier,
    executor: DeploymentExecutor,
    cutover: CutoverController,
    rollback: RollbackController,
    cleanup: CleanupController,
}

impl<P, R, V, B> Orchestrator<P, R, V, B>
where
    P: Platform + Sync,
    R: RoutingLayer + Sync,
    V: PublicProbe + Sync,
    B: Snapshotter + Sync,
{
    pub fn new(settings: OrchestratorSettings, platform: P, router: R, probe: V, backup: Option<B>) -> Self {
        let registry = EnvironmentRegistry::new(settings.services.clone());
        let prober = HealthProber::new(settings.max_attempts, settings.health_interval);
        let verifier = PostCutoverVerifier::new(settings.stabilization);
        let executor = DeploymentExecutor::new(
            &settings.project,
            settings.services.clone(),
            settings.maintenance.clone(),
        );
        let holder = format!("pid{}-{}", std::process::id(), unix_now_millis());
        Self {
            settings,
            platform,
            router,
            probe,
            backup,
            store: None,
            holder,
            registry,
            prober,
            verifier,
            executor,
            cutover: CutoverController,
            rollback: RollbackController,
            cleanup: CleanupController,
        }
    }

    /// Attach the state store holding the lease and deployment history.
    pub fn with_store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    // ── Operations ─────────────────────────────────────────────────

    /// Stand up the new release in the inactive slot and move traffic to it.
    ///
    /// Deployment failures come back as a completed record with a non-success
    /// outcome. `Err` means the run could not start or hit an internal error.
    pub async fn deploy(&self) -> OrchestratorResult<DeploymentRecord> {
        let store = self.require_store()?;
        self.acquire_lease(store, "deploy")?;
        let mut tracker = PhaseTracker::new();
        let result = self.run_deploy(store, &mut tracker).await;
        self.release_lease(store);
        result
    }

    /// Describe both slots and the routing target. Mutates nothing.
    pub async fn status(&self, recorded: RecordedState) -> OrchestratorResult<StatusReport> {
        let mut tracker = PhaseTracker::new();
        self.enter(None, &mut tracker, Phase::Discovering)?;
        let topology = self.registry.discover(&self.platform, &self.router).await?;

        let mut slots = Vec::with_capacity(SlotId::ALL.len());
        for slot in SlotId::ALL {
            slots.push(self.slot_report(&topology, slot).await);
        }

        self.enter(None, &mut tracker, Phase::Done)?;
        Ok(StatusReport {
            slots,
            routed: topology.routed,
            lease: recorded.lease,
            last_deployment: recorded.last_deployment,
        })
    }

    /// Send traffic back to the inactive slot and stop the active one.
    pub async fn rollback(&self) -> OrchestratorResult<RollbackReport> {
        let store = self.require_store()?;
        self.acquire_lease(store, "rollback")?;
        let mut tracker = PhaseTracker::new();
        let result = self.run_rollback(store, &mut tracker).await;
        self.release_lease(store);
        result
    }

    /// Decommission both slots and route traffic nowhere.
    ///
    /// Individual failures are collected as warnings; cleanup always runs to
    /// the end.
    pub async fn cleanup(&self) -> OrchestratorResult<CleanupReport> {
        let store = self.require_store()?;
        self.acquire_lease(store, "cleanup")?;
        let mut tracker = PhaseTracker::new();
        let result = self.run_cleanup(store, &mut tracker).await;
        self.release_lease(store);
        result
    }

    // ── Deploy ─────────────────────────────────────────────────────

    async fn run_deploy(
        &self,
        store: &StateStore,
        tracker: &mut PhaseTracker,
    ) -> OrchestratorResult<DeploymentRecord> {
        self.enter(Some(store), tracker, Phase::Discovering)?;
        let topology = self.registry.discover(&self.platform, &self.router).await?;
        let previous = topology.active_slot();
        let target = EnvironmentRegistry::inactive_of(previous);

        let id = format!("{}-{}", self.settings.project, unix_now_nanos());
        let mut record = DeploymentRecord::new(id, target, previous, unix_now());
        store.put_deployment(&record)?;
        info!(
            deployment = %record.id,
            %target,
            previous = ?previous,
            bootstrap = previous.is_none(),
            "deployment started"
        );

        if let (Some(active), Some(backup)) = (previous, &self.backup) {
            self.enter(Some(store), tracker, Phase::BackingUp)?;
            match backup.snapshot(active).await {
                Ok(snapshot) => record.backup = Some(snapshot),
                Err(e) => warn!(slot = %active, error = %e, "backup failed; continuing without backup"),
            }
        }

        self.enter(Some(store), tracker, Phase::Deploying)?;
        if let Err(e) = self.executor.provision(&self.platform, target).await {
            let reason = format!("provisioning slot {target} failed: {e}");
            return self.finish(store, tracker, record, DeploymentOutcome::DeployFailed, Some(reason));
        }

        self.enter(Some(store), tracker, Phase::HealthChecking)?;
        info!(%target, within = ?self.prober.ceiling(), "waiting for slot to become healthy");
        let health = self
            .prober
            .wait_healthy(target, &self.settings.services, || {
                self.platform.service_status(target)
            })
            .await;
        record.last_health = Some(health.clone());
        if !health.passed {
            let reason = format!(
                "slot {target} not healthy after {} attempts ({}/{} services healthy)",
                health.attempt, health.healthy_services, health.total_services
            );
            return self.finish(store, tracker, record, DeploymentOutcome::DeployFailed, Some(reason));
        }
        if let Err(e) = self.executor.run_maintenance(&self.platform, target).await {
            let reason = format!("maintenance command in slot {target} failed: {e}");
            return self.finish(store, tracker, record, DeploymentOutcome::DeployFailed, Some(reason));
        }

        self.enter(Some(store), tracker, Phase::CuttingOver)?;
        if let Err(e) = self.cutover.cutover(&self.router, target).await {
            let reason = format!("cutover to slot {target} failed: {e}");
            if self.cutover.routing_unchanged(&self.router, topology.routed).await {
                return self.finish(store, tracker, record, DeploymentOutcome::DeployFailed, Some(reason));
            }
            return self.roll_back_deploy(store, tracker, record, reason).await;
        }

        self.enter(Some(store), tracker, Phase::Verifying)?;
        if !self
            .verifier
            .verify(&self.probe, self.settings.verify_timeout)
            .await
        {
            let reason = format!("post-cutover verification of slot {target} failed");
            return self.roll_back_deploy(store, tracker, record, reason).await;
        }

        match previous {
            Some(old) => {
                self.enter(Some(store), tracker, Phase::CleaningUp)?;
                if let Err(e) = self.cleanup.decommission(&self.platform, old).await {
                    warn!(slot = %old, error = %e, "failed to decommission previous slot");
                }
            }
            None => info!(%target, "bootstrap deployment; nothing to decommission"),
        }
        self.finish(store, tracker, record, DeploymentOutcome::Success, None)
    }

    async fn roll_back_deploy(
        &self,
        store: &StateStore,
        tracker: &mut PhaseTracker,
        record: DeploymentRecord,
        reason: String,
    ) -> OrchestratorResult<DeploymentRecord> {
        self.enter(Some(store), tracker, Phase::RollingBack)?;
        warn!(deployment = %record.id, %reason, "rolling back");
        match self
            .rollback
            .rollback(&self.platform, &self.router, record.target_slot, record.previous_slot)
            .await
        {
            Ok(()) => self.finish(store, tracker, record, DeploymentOutcome::RolledBack, Some(reason)),
            Err(e) => {
                let reason = format!("{reason}; rollback failed: {e}");
                self.finish(store, tracker, record, DeploymentOutcome::RollbackFailed, Some(reason))
            }
        }
    }

    /// Enter the terminal phase for `outcome`, seal and persist the record.
    fn finish(
        &self,
        store: &StateStore,
        tracker: &mut PhaseTracker,
        mut record: DeploymentRecord,
        outcome: DeploymentOutcome,
        reason: Option<String>,
    ) -> OrchestratorResult<DeploymentRecord> {
        self.enter(Some(store), tracker, terminal_phase(outcome))?;
        if seal(&mut record, outcome, unix_now()) {
            record.failure_reason = reason;
            record.trail = tracker.labels();
        }
        if let Err(e) = store.put_deployment(&record) {
            error!(deployment = %record.id, error = %e, "failed to persist deployment record");
        }

        let reason = record.failure_reason.as_deref().unwrap_or("");
        match outcome {
            DeploymentOutcome::Success => {
                info!(deployment = %record.id, slot = %record.target_slot, "deployment succeeded")
            }
            DeploymentOutcome::DeployFailed | DeploymentOutcome::RolledBack => warn!(
                deployment = %record.id,
                outcome = outcome.label(),
                reason,
                "deployment failed"
            ),
            DeploymentOutcome::RollbackFailed => error!(
                deployment = %record.id,
                reason,
                "ROLLBACK FAILED; traffic may be on a broken slot; manual intervention required"
            ),
        }
        Ok(record)
    }

    // ── Rollback ───────────────────────────────────────────────────

    async fn run_rollback(
        &self,
        store: &StateStore,
        tracker: &mut PhaseTracker,
    ) -> OrchestratorResult<RollbackReport> {
        self.enter(Some(store), tracker, Phase::Discovering)?;
        let topology = self.registry.discover(&self.platform, &self.router).await?;
        let from = topology
            .active_slot()
            .ok_or_else(|| OrchestratorError::NothingToRollBack("no active slot".to_string()))?;
        let to = from.other();

        let mut target = match topology.environment(to) {
            Some(env) if env.provisioned => env.clone(),
            _ => {
                return Err(OrchestratorError::NothingToRollBack(format!(
                    "slot {to} is not provisioned"
                )));
            }
        };

        // Traffic only moves to a slot with a passing health result.
        self.registry.observe_health(&self.platform, &mut target).await;
        match &target.last_health {
            Some(health) if health.passed => {}
            Some(health) => {
                return Err(OrchestratorError::NothingToRollBack(format!(
                    "slot {to} is not healthy ({}/{} services healthy)",
                    health.healthy_services, health.total_services
                )));
            }
            None => {
                return Err(OrchestratorError::NothingToRollBack(format!(
                    "health of slot {to} is unknown"
                )));
            }
        }

        self.enter(Some(store), tracker, Phase::RollingBack)?;
        info!(%from, %to, "manual rollback");
        match self
            .rollback
            .rollback(&self.platform, &self.router, from, Some(to))
            .await
        {
            Ok(()) => {
                self.enter(Some(store), tracker, Phase::Done)?;
                Ok(RollbackReport {
                    from,
                    to,
                    trail: tracker.labels(),
                })
            }
            Err(source) => {
                self.enter(Some(store), tracker, Phase::DoneRollbackFailed)?;
                Err(OrchestratorError::RollbackFailed { from, to, source })
            }
        }
    }

    // ── Cleanup ────────────────────────────────────────────────────

    async fn run_cleanup(
        &self,
        store: &StateStore,
        tracker: &mut PhaseTracker,
    ) -> OrchestratorResult<CleanupReport> {
        self.enter(Some(store), tracker, Phase::CleaningUp)?;
        let mut report = CleanupReport::default();

        for slot in SlotId::ALL {
            match self.cleanup.decommission(&self.platform, slot).await {
                Ok(()) => report.destroyed.push(slot),
                Err(e) => {
                    warn!(%slot, error = %e, "failed to decommission slot");
                    report.warnings.push(format!("slot {slot}: {e}"));
                }
            }
        }
        match self.router.clear().await {
            Ok(()) => report.routing_cleared = true,
            Err(e) => {
                warn!(error = %e, "failed to clear routing");
                report.warnings.push(format!("routing: {e}"));
            }
        }

        self.enter(Some(store), tracker, Phase::Done)?;
        report.trail = tracker.labels();
        info!(destroyed = ?report.destroyed, warnings = report.warnings.len(), "cleanup finished");
        Ok(report)
    }

    // ── Helpers ────────────────────────────────────────────────────

    async fn slot_report(&self, topology: &Topology, slot: SlotId) -> SlotReport {
        let routed = topology.routed == Some(slot);
        match topology.environment(slot) {
            Some(env) => {
                let mut env = env.clone();
                self.registry.observe_health(&self.platform, &mut env).await;
                SlotReport {
                    slot,
                    role: env.role,
                    provisioned: env.provisioned,
                    routed,
                    health: env.last_health,
                }
            }
            None => SlotReport {
                slot,
                // Routed but not provisioned: traffic goes nowhere useful.
                role: if routed { Role::Unknown } else { Role::Inactive },
                provisioned: false,
                routed,
                health: None,
            },
        }
    }

    fn require_store(&self) -> OrchestratorResult<&StateStore> {
        self.store
            .as_ref()
            .ok_or_else(|| OrchestratorError::Prerequisite("state store not attached".to_string()))
    }

    fn acquire_lease(&self, store: &StateStore, operation: &str) -> OrchestratorResult<()> {
        let acquired = store
            .acquire_lease(&self.holder, operation, self.settings.lease_ttl, unix_now())
            .map_err(OrchestratorError::store_unavailable)?;
        if let Some(stale) = acquired.replaced {
            warn!(
                previous_holder = %stale.holder,
                previous_operation = %stale.operation,
                previous_state = %stale.state,
                "previous run was abandoned; inspect slots before trusting them"
            );
        }
        info!(holder = %self.holder, operation, "lease acquired");
        Ok(())
    }

    fn release_lease(&self, store: &StateStore) {
        match store.release_lease(&self.holder) {
            Ok(true) => {}
            Ok(false) => warn!(holder = %self.holder, "lease was no longer ours at release"),
            Err(e) => warn!(holder = %self.holder, error = %e, "failed to release lease"),
        }
    }

    /// Advance the tracker and report the new phase on the lease.
    fn enter(
        &self,
        store: Option<&StateStore>,
        tracker: &mut PhaseTracker,
        phase: Phase,
    ) -> OrchestratorResult<()> {
        tracker.advance(phase)?;
        info!(phase = %tracker.current(), "entering phase");
        if let Some(store) = store
            && let Err(e) = store.update_lease_state(&self.holder, phase.label())
        {
            warn!(error = %e, %phase, "failed to record phase on lease");
        }
        Ok(())
    }
}

/// Complete `record` with `outcome`. A record that is already complete keeps
/// its first outcome.
fn seal(record: &mut DeploymentRecord, outcome: DeploymentOutcome, now: u64) -> bool {
    let sealed = record.complete(outcome, now);
    if !sealed {
        error!(
            deployment = %record.id,
            recorded = ?record.outcome,
            attempted = outcome.label(),
            "deployment record already completed; keeping first outcome"
        );
    }
    sealed
}

fn terminal_phase(outcome: DeploymentOutcome) -> Phase {
    match outcome {
        DeploymentOutcome::Success => Phase::DoneSuccess,
        DeploymentOutcome::DeployFailed => Phase::DoneDeployFailed,
        DeploymentOutcome::RolledBack => Phase::DoneRolledBack,
        DeploymentOutcome::RollbackFailed => Phase::DoneRollbackFailed,
    }
}
