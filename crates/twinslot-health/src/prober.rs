//! Health prober: polls a slot until every expected service is healthy.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use twinslot_state::{HealthProbeResult, ServiceName, ServiceStatus, SlotId, unix_now};

/// Polls the whole-slot status view at a fixed interval.
#[derive(Debug, Clone)]
pub struct HealthProber {
    max_attempts: u32,
    interval: Duration,
}

impl HealthProber {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Upper bound on how long [`wait_healthy`](Self::wait_healthy) blocks.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }

    /// Poll `query` until the slot passes or attempts run out.
    ///
    /// Returns the last result either way; the caller decides what a
    /// failed result means. A query error counts as an attempt with no
    /// healthy services.
    pub async fn wait_healthy<F, Fut, E>(
        &self,
        slot: SlotId,
        expected: &[ServiceName],
        mut query: F,
    ) -> HealthProbeResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<ServiceStatus>, E>>,
        E: Display,
    {
        let total = expected.len() as u32;
        info!(
            %slot,
            total,
            max_attempts = self.max_attempts,
            interval_ms = self.interval.as_millis() as u64,
            "waiting for slot to become healthy"
        );

        let mut last = HealthProbeResult::evaluate(0, unix_now(), 0, total);
        for attempt in 1..=self.max_attempts {
            let healthy = match query().await {
                Ok(statuses) => count_healthy(expected, &statuses),
                Err(e) => {
                    warn!(%slot, attempt, error = %e, "status query failed");
                    0
                }
            };
            last = HealthProbeResult::evaluate(attempt, unix_now(), healthy, total);

            if last.passed {
                info!(%slot, attempt, healthy, total, "slot healthy");
                return last;
            }
            debug!(%slot, attempt, healthy, total, "slot not yet healthy");

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        warn!(
            %slot,
            attempts = self.max_attempts,
            healthy = last.healthy_services,
            total,
            "slot did not become healthy"
        );
        last
    }
}

/// Number of expected services whose containers are all healthy.
///
/// A service with no container at all counts as unhealthy; rows for
/// services outside the expected set are ignored.
pub fn count_healthy(expected: &[ServiceName], statuses: &[ServiceStatus]) -> u32 {
    expected
        .iter()
        .filter(|name| {
            let mut rows = statuses.iter().filter(|s| &s.service == *name).peekable();
            rows.peek().is_some() && rows.all(ServiceStatus::is_healthy)
        })
        .count() as u32
}
