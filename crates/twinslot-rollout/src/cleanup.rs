//! Cleanup controller: decommissions a slot and its durable state.

use tracing::info;

use twinslot_platform::{Platform, PlatformResult};
use twinslot_state::SlotId;

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupController;

impl CleanupController {
    /// Remove `slot`'s containers and volumes.
    pub async fn decommission<P: Platform>(&self, platform: &P, slot: SlotId) -> PlatformResult<()> {
        platform.destroy(slot).await?;
        info!(%slot, "slot decommissioned");
        Ok(())
    }
}
