//! Environment registry: which slot is live, which is idle.
//!
//! The platform says which slots are provisioned; the routing layer says
//! which slot receives traffic. The routed slot is active when it is
//! provisioned. Otherwise the first provisioned slot (A before B) is. With
//! nothing provisioned the system is bootstrapping and slot B is the target.

use tracing::{debug, warn};

use twinslot_health::count_healthy;
use twinslot_platform::Platform;
use twinslot_proxy::RoutingLayer;
use twinslot_state::{Environment, HealthProbeResult, Role, ServiceName, SlotId, Topology, unix_now};

use crate::error::{OrchestratorError, OrchestratorResult};

#[derive(Debug, Clone)]
pub struct EnvironmentRegistry {
    services: Vec<ServiceName>,
}

impl EnvironmentRegistry {
    pub fn new(services: Vec<ServiceName>) -> Self {
        Self { services }
    }

    /// Read provisioned slots and the routing target, then assign roles.
    pub async fn discover<P, R>(&self, platform: &P, router: &R) -> OrchestratorResult<Topology>
    where
        P: Platform,
        R: RoutingLayer,
    {
        let provisioned = platform
            .provisioned_slots()
            .await
            .map_err(OrchestratorError::DiscoveryPlatform)?;
        let routed = router
            .current_target()
            .await
            .map_err(OrchestratorError::DiscoveryRouting)?;

        if let Some(slot) = routed
            && !provisioned.contains(&slot)
        {
            warn!(%slot, "routing points at a slot that is not provisioned");
        }

        let active = resolve_active(&provisioned, routed);
        let inactive = Self::inactive_of(active);
        let topology = Topology {
            active: active.map(|slot| self.environment(slot, Role::Active, true)),
            inactive: Some(self.environment(
                inactive,
                Role::Inactive,
                provisioned.contains(&inactive),
            )),
            routed,
        };
        debug_assert!(topology.active_count() <= 1);
        debug!(?active, %inactive, ?routed, ?provisioned, "topology discovered");
        Ok(topology)
    }

    /// The environment currently serving traffic, if any.
    pub async fn discover_active<P, R>(
        &self,
        platform: &P,
        router: &R,
    ) -> OrchestratorResult<Option<Environment>>
    where
        P: Platform,
        R: RoutingLayer,
    {
        Ok(self.discover(platform, router).await?.active)
    }

    /// The slot a deployment targets given the active one.
    pub fn inactive_of(active: Option<SlotId>) -> SlotId {
        active.map_or(SlotId::BOOTSTRAP_TARGET, SlotId::other)
    }

    /// Fill in `last_health` with a single status reading. Read-only.
    pub async fn observe_health<P: Platform>(&self, platform: &P, env: &mut Environment) {
        if !env.provisioned {
            return;
        }
        match platform.service_status(env.slot).await {
            Ok(statuses) => {
                let healthy = count_healthy(&self.services, &statuses);
                env.last_health = Some(HealthProbeResult::evaluate(
                    0,
                    unix_now(),
                    healthy,
                    self.services.len() as u32,
                ));
            }
            Err(e) => warn!(slot = %env.slot, error = %e, "status query failed"),
        }
    }

    fn environment(&self, slot: SlotId, role: Role, provisioned: bool) -> Environment {
        Environment {
            slot,
            role,
            provisioned,
            service_set: self.services.clone(),
            last_health: None,
        }
    }
}

/// Pick the active slot from provisioned slots and the routing target.
pub fn resolve_active(provisioned: &[SlotId], routed: Option<SlotId>) -> Option<SlotId> {
    routed
        .filter(|slot| provisioned.contains(slot))
        .or_else(|| SlotId::ALL.into_iter().find(|slot| provisioned.contains(slot)))
}
