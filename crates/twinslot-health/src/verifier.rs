//! Post-cutover verifier: one probe after the stabilization window.

use std::time::Duration;

use tracing::{info, warn};

use crate::probe::PublicProbe;

#[derive(Debug, Clone)]
pub struct PostCutoverVerifier {
    stabilization: Duration,
}

impl PostCutoverVerifier {
    pub fn new(stabilization: Duration) -> Self {
        Self { stabilization }
    }

    /// Wait out the stabilization window, then probe once.
    ///
    /// Single point-in-time check: no soak, no retry.
    pub async fn verify<P: PublicProbe>(&self, probe: &P, timeout: Duration) -> bool {
        if !self.stabilization.is_zero() {
            info!(
                secs = self.stabilization.as_secs(),
                "waiting for traffic to stabilize"
            );
            tokio::time::sleep(self.stabilization).await;
        }

        let result = probe.probe(timeout).await;
        if result.is_healthy() {
            info!("public endpoint verified");
            true
        } else {
            warn!(?result, "public endpoint verification failed");
            false
        }
    }
}
