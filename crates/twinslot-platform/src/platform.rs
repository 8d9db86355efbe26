//! The orchestration platform as seen by the orchestrator.

use std::future::Future;

use twinslot_state::{ServiceName, ServiceStatus, SlotId};

use crate::error::PlatformResult;

/// Starts, stops, and reports on a slot's service set.
pub trait Platform {
    /// Slots whose project is currently running on the platform.
    fn provisioned_slots(&self) -> impl Future<Output = PlatformResult<Vec<SlotId>>> + Send;

    /// Status of every container the slot's project has.
    fn service_status(
        &self,
        slot: SlotId,
    ) -> impl Future<Output = PlatformResult<Vec<ServiceStatus>>> + Send;

    /// Materialize `services` in `slot`, replacing any prior state there.
    fn provision(
        &self,
        slot: SlotId,
        services: &[ServiceName],
    ) -> impl Future<Output = PlatformResult<()>> + Send;

    /// Run a one-off command inside a running service of `slot`.
    fn exec(
        &self,
        slot: SlotId,
        service: &str,
        command: &[String],
    ) -> impl Future<Output = PlatformResult<()>> + Send;

    /// Stop and remove the slot's containers, keeping its volumes.
    fn stop(&self, slot: SlotId) -> impl Future<Output = PlatformResult<()>> + Send;

    /// Remove the slot's containers and volumes.
    fn destroy(&self, slot: SlotId) -> impl Future<Output = PlatformResult<()>> + Send;
}
