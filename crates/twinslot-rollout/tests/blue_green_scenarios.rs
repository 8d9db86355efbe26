//! Blue-green scenarios against in-memory collaborators.
//!
//! One shared `World` stands in for the container platform, the proxy, the
//! public endpoint and backup storage. Every collaborator call is logged so
//! tests can assert ordering and read-only behaviour.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use twinslot_backup::{BackupError, BackupResult, Snapshotter};
use twinslot_core::config::MaintenanceConfig;
use twinslot_health::{ProbeResult, PublicProbe};
use twinslot_platform::{CommandError, Platform, PlatformError, PlatformResult};
use twinslot_proxy::{RoutingError, RoutingLayer, RoutingResult};
use twinslot_rollout::{
    EnvironmentRegistry, Orchestrator, OrchestratorError, OrchestratorSettings, RecordedState,
};
use twinslot_state::*;

// ── Fakes ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct World {
    provisioned: BTreeSet<SlotId>,
    volumes: BTreeSet<SlotId>,
    routed: Option<SlotId>,
    /// Slots whose services never report healthy.
    unhealthy: BTreeSet<SlotId>,
    /// Slots that fail the public probe once routed.
    broken_public: BTreeSet<SlotId>,
    /// `route_to(slot)` fails for these slots.
    fail_routes_to: BTreeSet<SlotId>,
    /// A failing `route_to` still applies the change.
    partial_routes: bool,
    platform_down: bool,
    fail_provision: bool,
    fail_exec: bool,
    fail_destroy: bool,
    fail_backup: bool,
    calls: Vec<String>,
}

type Shared = Arc<Mutex<World>>;

const SERVICES: [&str; 2] = ["web", "db"];

fn world() -> Shared {
    Arc::new(Mutex::new(World::default()))
}

/// A world where `slot` is provisioned and receiving traffic.
fn running(slot: SlotId) -> Shared {
    let w = world();
    {
        let mut g = w.lock().unwrap();
        g.provisioned.insert(slot);
        g.volumes.insert(slot);
        g.routed = Some(slot);
    }
    w
}

fn rejected(what: &str) -> PlatformError {
    PlatformError::Rejected(what.to_string())
}

fn reload_failed() -> RoutingError {
    RoutingError::Reload {
        restored: true,
        source: CommandError::Failed {
            program: "nginx".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "bad config".to_string(),
        },
    }
}

struct FakePlatform(Shared);

impl Platform for FakePlatform {
    async fn provisioned_slots(&self) -> PlatformResult<Vec<SlotId>> {
        let mut w = self.0.lock().unwrap();
        w.calls.push("ls".to_string());
        if w.platform_down {
            return Err(rejected("daemon unreachable"));
        }
        Ok(w.provisioned.iter().copied().collect())
    }

    async fn service_status(&self, slot: SlotId) -> PlatformResult<Vec<ServiceStatus>> {
        let mut w = self.0.lock().unwrap();
        w.calls.push(format!("ps {slot}"));
        if !w.provisioned.contains(&slot) {
            return Ok(Vec::new());
        }
        let health = if w.unhealthy.contains(&slot) {
            HealthStatus::Starting
        } else {
            HealthStatus::Healthy
        };
        Ok(SERVICES
            .iter()
            .map(|s| ServiceStatus {
                service: s.to_string(),
                running: true,
                health: Some(health),
            })
            .collect())
    }

    async fn provision(&self, slot: SlotId, services: &[ServiceName]) -> PlatformResult<()> {
        let mut w = self.0.lock().unwrap();
        w.calls.push(format!("provision {slot} {}", services.join(",")));
        if w.fail_provision {
            return Err(rejected("image pull failed"));
        }
        w.provisioned.insert(slot);
        w.volumes.insert(slot);
        Ok(())
    }

    async fn exec(&self, slot: SlotId, service: &str, command: &[String]) -> PlatformResult<()> {
        let mut w = self.0.lock().unwrap();
        w.calls.push(format!("exec {slot} {service} {}", command.join(" ")));
        if w.fail_exec {
            return Err(rejected("migration failed"));
        }
        Ok(())
    }

    async fn stop(&self, slot: SlotId) -> PlatformResult<()> {
        let mut w = self.0.lock().unwrap();
        w.calls.push(format!("stop {slot}"));
        w.provisioned.remove(&slot);
        Ok(())
    }

    async fn destroy(&self, slot: SlotId) -> PlatformResult<()> {
        let mut w = self.0.lock().unwrap();
        w.calls.push(format!("destroy {slot}"));
        if w.fail_destroy {
            return Err(rejected("volume in use"));
        }
        w.provisioned.remove(&slot);
        w.volumes.remove(&slot);
        Ok(())
    }
}

struct FakeRouter(Shared);

impl RoutingLayer for FakeRouter {
    async fn current_target(&self) -> RoutingResult<Option<SlotId>> {
        let mut w = self.0.lock().unwrap();
        w.calls.push("current".to_string());
        Ok(w.routed)
    }

    async fn route_to(&self, slot: SlotId) -> RoutingResult<()> {
        let mut w = self.0.lock().unwrap();
        w.calls.push(format!("route {slot}"));
        if w.fail_routes_to.contains(&slot) {
            if w.partial_routes {
                w.routed = Some(slot);
            }
            return Err(reload_failed());
        }
        w.routed = Some(slot);
        Ok(())
    }

    async fn clear(&self) -> RoutingResult<()> {
        let mut w = self.0.lock().unwrap();
        w.calls.push("clear".to_string());
        w.routed = None;
        Ok(())
    }
}

struct FakeProbe(Shared);

impl PublicProbe for FakeProbe {
    async fn probe(&self, _timeout: Duration) -> ProbeResult {
        let mut w = self.0.lock().unwrap();
        w.calls.push("probe".to_string());
        match w.routed {
            Some(slot) if w.provisioned.contains(&slot) && !w.broken_public.contains(&slot) => {
                ProbeResult::Healthy
            }
            Some(_) => ProbeResult::Unhealthy,
            None => ProbeResult::Failed,
        }
    }
}

struct FakeBackup(Shared);

impl Snapshotter for FakeBackup {
    async fn snapshot(&self, slot: SlotId) -> BackupResult<BackupRecord> {
        let mut w = self.0.lock().unwrap();
        w.calls.push(format!("backup {slot}"));
        if w.fail_backup {
            return Err(BackupError::EmptyDump);
        }
        Ok(BackupRecord {
            id: format!("shop-{}-1", slot.suffix()),
            created_at: 1,
            size_bytes: 3,
            location: format!("mem://shop/{}/1.sql", slot.suffix()),
            sha256: "ba7816bf".to_string(),
        })
    }
}

type TestOrchestrator = Orchestrator<FakePlatform, FakeRouter, FakeProbe, FakeBackup>;

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        project: "shop".to_string(),
        services: SERVICES.iter().map(|s| s.to_string()).collect(),
        max_attempts: 3,
        health_interval: Duration::ZERO,
        stabilization: Duration::ZERO,
        verify_timeout: Duration::from_secs(1),
        lease_ttl: Duration::from_secs(30 * 60),
        maintenance: None,
    }
}

fn orchestrator_with(w: &Shared, settings: OrchestratorSettings, store: &StateStore) -> TestOrchestrator {
    Orchestrator::new(
        settings,
        FakePlatform(w.clone()),
        FakeRouter(w.clone()),
        FakeProbe(w.clone()),
        Some(FakeBackup(w.clone())),
    )
    .with_store(store.clone())
}

fn orchestrator(w: &Shared) -> (TestOrchestrator, StateStore) {
    let store = StateStore::open_in_memory().unwrap();
    (orchestrator_with(w, settings(), &store), store)
}

fn calls(w: &Shared) -> Vec<String> {
    w.lock().unwrap().calls.clone()
}

fn position(calls: &[String], call: &str) -> usize {
    calls
        .iter()
        .position(|c| c == call)
        .unwrap_or_else(|| panic!("no call '{call}' in {calls:?}"))
}

// ── Deploy scenarios ───────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_deploys_to_slot_b() {
    let w = world();
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::Success));
    assert_eq!(record.target_slot, SlotId::B);
    assert_eq!(record.previous_slot, None);
    assert!(record.backup.is_none());
    assert!(!record.trail.contains(&"BACKING_UP".to_string()));
    assert!(!record.trail.contains(&"CLEANING_UP".to_string()));
    assert_eq!(record.trail.last().unwrap(), "DONE_SUCCESS");

    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::B));
    assert_eq!(g.provisioned, BTreeSet::from([SlotId::B]));
    assert!(!g.calls.iter().any(|c| c.starts_with("destroy")));
}

#[tokio::test]
async fn steady_state_switches_slots_and_decommissions_old() {
    let w = running(SlotId::A);
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::Success));
    assert_eq!(record.target_slot, SlotId::B);
    assert_eq!(record.previous_slot, Some(SlotId::A));
    assert!(record.backup.is_some());
    assert!(record.last_health.as_ref().unwrap().passed);
    assert_eq!(
        record.trail,
        vec![
            "IDLE",
            "DISCOVERING",
            "BACKING_UP",
            "DEPLOYING",
            "HEALTH_CHECKING",
            "CUTTING_OVER",
            "VERIFYING",
            "CLEANING_UP",
            "DONE_SUCCESS"
        ]
    );

    {
        let g = w.lock().unwrap();
        assert_eq!(g.routed, Some(SlotId::B));
        assert_eq!(g.provisioned, BTreeSet::from([SlotId::B]));
        assert!(!g.volumes.contains(&SlotId::A), "old slot volumes must be removed");
    }

    let calls = calls(&w);
    assert!(position(&calls, "backup A") < position(&calls, "provision B web,db"));
    assert!(position(&calls, "ps B") < position(&calls, "route B"));
    assert!(position(&calls, "route B") < position(&calls, "probe"));
    assert!(position(&calls, "probe") < position(&calls, "destroy A"));
}

#[tokio::test]
async fn consecutive_deploys_alternate_slots() {
    let w = running(SlotId::A);
    let (orch, store) = orchestrator(&w);

    let first = orch.deploy().await.unwrap();
    let second = orch.deploy().await.unwrap();

    assert_eq!(first.target_slot, SlotId::B);
    assert_eq!(second.target_slot, SlotId::A);
    assert_eq!(second.previous_slot, Some(SlotId::B));
    assert_eq!(w.lock().unwrap().routed, Some(SlotId::A));

    let history = store.list_deployments(10).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(DeploymentRecord::is_completed));
}

#[tokio::test]
async fn health_never_passing_leaves_routing_unchanged() {
    let w = running(SlotId::A);
    w.lock().unwrap().unhealthy.insert(SlotId::B);
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::DeployFailed));
    let health = record.last_health.as_ref().unwrap();
    assert!(!health.passed);
    assert_eq!(health.attempt, 3);
    assert_eq!(health.healthy_services, 0);
    assert_eq!(health.total_services, 2);
    assert!(record.failure_reason.as_ref().unwrap().contains("not healthy"));

    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::A));
    assert!(g.provisioned.contains(&SlotId::A));
    // The failed slot is left running for inspection.
    assert!(g.provisioned.contains(&SlotId::B));
    assert_eq!(g.calls.iter().filter(|c| c.as_str() == "ps B").count(), 3);
    assert!(!g.calls.iter().any(|c| c.starts_with("route")));
}

#[tokio::test]
async fn verification_failure_rolls_back_to_previous_slot() {
    let w = running(SlotId::A);
    w.lock().unwrap().broken_public.insert(SlotId::B);
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::RolledBack));
    assert!(record.trail.ends_with(&[
        "VERIFYING".to_string(),
        "ROLLING_BACK".to_string(),
        "DONE_ROLLED_BACK".to_string()
    ]));

    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::A));
    assert_eq!(g.provisioned, BTreeSet::from([SlotId::A]));
    // Stopped, not destroyed.
    assert!(g.volumes.contains(&SlotId::B));
    let restore = g.calls.iter().rposition(|c| c == "route A").unwrap();
    let stop = g.calls.iter().position(|c| c == "stop B").unwrap();
    assert!(restore < stop, "traffic must be restored before teardown");
}

#[tokio::test]
async fn bootstrap_verification_failure_clears_routing() {
    let w = world();
    w.lock().unwrap().broken_public.insert(SlotId::B);
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::RolledBack));
    let g = w.lock().unwrap();
    assert_eq!(g.routed, None);
    assert!(g.provisioned.is_empty());
}

#[tokio::test]
async fn backup_failure_does_not_block_deploy() {
    let w = running(SlotId::A);
    w.lock().unwrap().fail_backup = true;
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::Success));
    assert!(record.backup.is_none());
    assert!(record.trail.contains(&"BACKING_UP".to_string()));
}

#[tokio::test]
async fn cleanup_failure_after_success_keeps_success() {
    let w = running(SlotId::A);
    w.lock().unwrap().fail_destroy = true;
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::Success));
    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::B));
    assert!(g.provisioned.contains(&SlotId::A));
}

#[tokio::test]
async fn provisioning_failure_is_deploy_failed() {
    let w = running(SlotId::A);
    w.lock().unwrap().fail_provision = true;
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::DeployFailed));
    assert_eq!(record.trail.last().unwrap(), "DONE_DEPLOY_FAILED");
    assert!(record.last_health.is_none());
    assert_eq!(w.lock().unwrap().routed, Some(SlotId::A));
}

#[tokio::test]
async fn cutover_error_with_unchanged_routing_is_deploy_failed() {
    let w = running(SlotId::A);
    w.lock().unwrap().fail_routes_to.insert(SlotId::B);
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::DeployFailed));
    assert!(record.trail.contains(&"CUTTING_OVER".to_string()));
    assert!(!record.trail.contains(&"ROLLING_BACK".to_string()));
    assert!(record.failure_reason.as_ref().unwrap().contains("cutover"));

    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::A));
    assert!(!g.calls.iter().any(|c| c == "probe"));
}

#[tokio::test]
async fn partial_cutover_rolls_back() {
    let w = running(SlotId::A);
    {
        let mut g = w.lock().unwrap();
        g.fail_routes_to.insert(SlotId::B);
        g.partial_routes = true;
    }
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::RolledBack));
    assert!(record.trail.contains(&"ROLLING_BACK".to_string()));
    assert!(!record.trail.contains(&"VERIFYING".to_string()));
    assert_eq!(w.lock().unwrap().routed, Some(SlotId::A));
}

#[tokio::test]
async fn rollback_failure_is_reported() {
    let w = running(SlotId::A);
    {
        let mut g = w.lock().unwrap();
        g.broken_public.insert(SlotId::B);
        g.fail_routes_to.insert(SlotId::A);
    }
    let (orch, _store) = orchestrator(&w);

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::RollbackFailed));
    assert_eq!(record.trail.last().unwrap(), "DONE_ROLLBACK_FAILED");
    assert!(record.failure_reason.as_ref().unwrap().contains("rollback failed"));

    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::B));
    // Nothing is torn down when traffic could not be restored.
    assert!(!g.calls.iter().any(|c| c.starts_with("stop")));
}

#[tokio::test]
async fn maintenance_runs_between_health_gate_and_cutover() {
    let w = running(SlotId::A);
    let store = StateStore::open_in_memory().unwrap();
    let orch = orchestrator_with(
        &w,
        OrchestratorSettings {
            maintenance: Some(MaintenanceConfig {
                service: "web".to_string(),
                command: vec!["migrate".to_string(), "--project={project}".to_string()],
            }),
            ..settings()
        },
        &store,
    );

    let record = orch.deploy().await.unwrap();
    assert_eq!(record.outcome, Some(DeploymentOutcome::Success));

    let calls = calls(&w);
    let exec = position(&calls, "exec B web migrate --project=shop-b");
    assert!(position(&calls, "ps B") < exec);
    assert!(exec < position(&calls, "route B"));
}

#[tokio::test]
async fn maintenance_failure_aborts_before_cutover() {
    let w = running(SlotId::A);
    w.lock().unwrap().fail_exec = true;
    let store = StateStore::open_in_memory().unwrap();
    let orch = orchestrator_with(
        &w,
        OrchestratorSettings {
            maintenance: Some(MaintenanceConfig {
                service: "web".to_string(),
                command: vec!["migrate".to_string()],
            }),
            ..settings()
        },
        &store,
    );

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::DeployFailed));
    assert!(record.failure_reason.as_ref().unwrap().contains("maintenance"));
    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::A));
    assert!(!g.calls.iter().any(|c| c.starts_with("route")));
}

#[tokio::test]
async fn platform_unreachable_aborts_before_any_change() {
    let w = running(SlotId::A);
    w.lock().unwrap().platform_down = true;
    let (orch, store) = orchestrator(&w);

    let err = orch.deploy().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::DiscoveryPlatform(_)));
    assert!(store.list_deployments(10).unwrap().is_empty());
    assert!(store.current_lease().unwrap().is_none());
    assert_eq!(w.lock().unwrap().routed, Some(SlotId::A));
}

// ── Persistence and lease ──────────────────────────────────────────

#[tokio::test]
async fn deployment_records_are_persisted_newest_first() {
    let w = running(SlotId::A);
    let (orch, store) = orchestrator(&w);

    let first = orch.deploy().await.unwrap();
    w.lock().unwrap().unhealthy.insert(SlotId::A);
    let second = orch.deploy().await.unwrap();

    let history = store.list_deployments(10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[1].id, first.id);
    assert_eq!(history[0].outcome, Some(DeploymentOutcome::DeployFailed));
    assert_eq!(store.get_deployment(&first.id).unwrap().unwrap(), first);
}

#[tokio::test]
async fn lease_is_released_after_run() {
    let w = running(SlotId::A);
    let (orch, store) = orchestrator(&w);

    orch.deploy().await.unwrap();
    assert!(store.current_lease().unwrap().is_none());
}

#[tokio::test]
async fn held_lease_blocks_a_second_run() {
    let w = running(SlotId::A);
    let (orch, store) = orchestrator(&w);
    store
        .acquire_lease("other-host", "deploy", Duration::from_secs(600), unix_now())
        .unwrap();

    let err = orch.deploy().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::LeaseHeld(_)));
    assert!(calls(&w).is_empty(), "nothing may be touched without the lease");
    assert_eq!(store.current_lease().unwrap().unwrap().holder, "other-host");
}

#[tokio::test]
async fn expired_lease_is_taken_over() {
    let w = running(SlotId::A);
    let (orch, store) = orchestrator(&w);
    store
        .acquire_lease("crashed", "deploy", Duration::from_secs(60), unix_now() - 3600)
        .unwrap();

    let record = orch.deploy().await.unwrap();

    assert_eq!(record.outcome, Some(DeploymentOutcome::Success));
    assert!(store.current_lease().unwrap().is_none());
}

// ── Status, rollback, cleanup ──────────────────────────────────────

#[tokio::test]
async fn status_reports_slots_without_mutating() {
    let w = running(SlotId::A);
    let (orch, store) = orchestrator(&w);
    orch.deploy().await.unwrap();
    w.lock().unwrap().calls.clear();

    let report = orch.status(RecordedState::read(&store)).await.unwrap();

    assert_eq!(report.active(), Some(SlotId::B));
    assert_eq!(report.routed, Some(SlotId::B));
    let b = report.slots.iter().find(|s| s.slot == SlotId::B).unwrap();
    assert!(b.provisioned && b.routed);
    assert!(b.health.as_ref().unwrap().passed);
    let a = report.slots.iter().find(|s| s.slot == SlotId::A).unwrap();
    assert_eq!(a.role, Role::Inactive);
    assert!(!a.provisioned);
    assert_eq!(
        report.last_deployment.as_ref().map(|d| d.id.clone()),
        store.last_deployment().unwrap().map(|d| d.id)
    );

    for call in calls(&w) {
        assert!(
            call == "ls" || call == "current" || call.starts_with("ps "),
            "status made a mutating call: {call}"
        );
    }
    assert_eq!(w.lock().unwrap().routed, Some(SlotId::B));
}

#[tokio::test]
async fn status_shows_dangling_route() {
    let w = world();
    w.lock().unwrap().routed = Some(SlotId::A);
    let (orch, _store) = orchestrator(&w);

    let report = orch.status(RecordedState::default()).await.unwrap();

    assert_eq!(report.active(), None);
    let a = report.slots.iter().find(|s| s.slot == SlotId::A).unwrap();
    assert_eq!(a.role, Role::Unknown);
    assert!(a.routed && !a.provisioned);
}

#[tokio::test]
async fn manual_rollback_returns_traffic_to_inactive_slot() {
    let w = running(SlotId::B);
    {
        let mut g = w.lock().unwrap();
        g.provisioned.insert(SlotId::A);
        g.volumes.insert(SlotId::A);
    }
    let (orch, store) = orchestrator(&w);

    let report = orch.rollback().await.unwrap();

    assert_eq!(report.from, SlotId::B);
    assert_eq!(report.to, SlotId::A);
    assert_eq!(report.trail, vec!["IDLE", "DISCOVERING", "ROLLING_BACK", "DONE"]);
    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::A));
    assert_eq!(g.provisioned, BTreeSet::from([SlotId::A]));
    assert!(store.current_lease().unwrap().is_none());
}

#[tokio::test]
async fn manual_rollback_needs_a_provisioned_inactive_slot() {
    let w = running(SlotId::A);
    let (orch, _store) = orchestrator(&w);

    let err = orch.rollback().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::NothingToRollBack(_)));
    let g = w.lock().unwrap();
    assert_eq!(g.routed, Some(SlotId::A));
    assert!(!g.calls.iter().any(|c| c.starts_with("route") || c.starts_with("stop")));
}

#[tokio::test]
async fn manual_rollback_refuses_unhealthy_slot() {
    let w = running(SlotId::B);
    {
        let mut g = w.lock().unwrap();
        g.provisioned.insert(SlotId::A);
        g.unhealthy.insert(SlotId::A);
    }
    let (orch, _store) = orchestrator(&w);

    let err = orch.rollback().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::NothingToRollBack(_)));
    assert_eq!(w.lock().unwrap().routed, Some(SlotId::B));
}

#[tokio::test]
async fn manual_rollback_routing_failure_is_rollback_failed() {
    let w = running(SlotId::B);
    {
        let mut g = w.lock().unwrap();
        g.provisioned.insert(SlotId::A);
        g.fail_routes_to.insert(SlotId::A);
    }
    let (orch, _store) = orchestrator(&w);

    let err = orch.rollback().await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::RollbackFailed {
            from: SlotId::B,
            to: SlotId::A,
            ..
        }
    ));
    assert!(!calls(&w).iter().any(|c| c.starts_with("stop")));
}

#[tokio::test]
async fn cleanup_destroys_both_slots_and_clears_routing() {
    let w = running(SlotId::A);
    {
        let mut g = w.lock().unwrap();
        g.provisioned.insert(SlotId::B);
        g.volumes.insert(SlotId::B);
    }
    let (orch, _store) = orchestrator(&w);

    let report = orch.cleanup().await.unwrap();

    assert_eq!(report.destroyed, vec![SlotId::A, SlotId::B]);
    assert!(report.routing_cleared);
    assert!(report.warnings.is_empty());
    assert_eq!(report.trail, vec!["IDLE", "CLEANING_UP", "DONE"]);
    let g = w.lock().unwrap();
    assert_eq!(g.routed, None);
    assert!(g.provisioned.is_empty());
    assert!(g.volumes.is_empty());
}

#[tokio::test]
async fn cleanup_collects_failures_as_warnings() {
    let w = running(SlotId::A);
    w.lock().unwrap().fail_destroy = true;
    let (orch, _store) = orchestrator(&w);

    let report = orch.cleanup().await.unwrap();

    assert!(report.destroyed.is_empty());
    assert_eq!(report.warnings.len(), 2);
    assert!(report.routing_cleared);
    assert_eq!(w.lock().unwrap().routed, None);
}

// ── Registry ───────────────────────────────────────────────────────

#[tokio::test]
async fn registry_prefers_routed_slot_when_both_are_up() {
    let w = running(SlotId::B);
    w.lock().unwrap().provisioned.insert(SlotId::A);
    let registry = EnvironmentRegistry::new(settings().services);
    let platform = FakePlatform(w.clone());
    let router = FakeRouter(w.clone());

    let active = registry.discover_active(&platform, &router).await.unwrap().unwrap();
    assert_eq!(active.slot, SlotId::B);
    assert_eq!(active.role, Role::Active);

    let topology = registry.discover(&platform, &router).await.unwrap();
    let inactive = topology.inactive.clone().unwrap();
    assert_eq!(inactive.slot, SlotId::A);
    assert!(inactive.provisioned);
    assert_eq!(topology.active_count(), 1);
    assert!(calls(&w).iter().all(|c| c == "ls" || c == "current"));
}

#[tokio::test]
async fn registry_reports_bootstrap_when_nothing_runs() {
    let w = world();
    let registry = EnvironmentRegistry::new(settings().services);

    let topology = registry
        .discover(&FakePlatform(w.clone()), &FakeRouter(w.clone()))
        .await
        .unwrap();

    assert!(topology.active.is_none());
    assert_eq!(topology.inactive.unwrap().slot, SlotId::BOOTSTRAP_TARGET);
}
