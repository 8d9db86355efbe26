//! Cutover controller: moves public traffic to a verified-healthy slot.

use tracing::{info, warn};

use twinslot_proxy::{RoutingLayer, RoutingResult};
use twinslot_state::SlotId;

#[derive(Debug, Clone, Copy, Default)]
pub struct CutoverController;

impl CutoverController {
    pub async fn cutover<R: RoutingLayer>(&self, router: &R, target: SlotId) -> RoutingResult<()> {
        router.route_to(target).await?;
        info!(%target, "cutover complete");
        Ok(())
    }

    /// After a failed cutover, check whether routing still points where it
    /// did before. An unreadable routing layer counts as changed.
    pub async fn routing_unchanged<R: RoutingLayer>(&self, router: &R, before: Option<SlotId>) -> bool {
        match router.current_target().await {
            Ok(now) if now == before => true,
            Ok(now) => {
                warn!(?before, ?now, "routing changed despite cutover error");
                false
            }
            Err(e) => {
                warn!(error = %e, "cannot confirm routing after cutover error");
                false
            }
        }
    }
}
