//! Rollback controller: restores traffic, then stops the failed slot.
//!
//! Traffic comes first: the failed slot is stopped only after routing
//! points back at the previous slot. Its volumes are kept for inspection.
//! A failed deploy with no previous slot (bootstrap) clears routing instead.

use tracing::{error, info, warn};

use twinslot_platform::Platform;
use twinslot_proxy::{RoutingLayer, RoutingResult};
use twinslot_state::SlotId;

#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackController;

impl RollbackController {
    pub async fn rollback<P, R>(
        &self,
        platform: &P,
        router: &R,
        failed: SlotId,
        restore: Option<SlotId>,
    ) -> RoutingResult<()>
    where
        P: Platform,
        R: RoutingLayer,
    {
        let routed = match restore {
            Some(slot) => router.route_to(slot).await,
            None => router.clear().await,
        };
        if let Err(e) = routed {
            error!(
                %failed,
                ?restore,
                error = %e,
                "rollback could not restore routing; manual intervention required"
            );
            return Err(e);
        }
        info!(%failed, ?restore, "traffic restored");

        if let Err(e) = platform.stop(failed).await {
            warn!(%failed, error = %e, "failed to stop rolled-back slot");
        }
        Ok(())
    }
}
