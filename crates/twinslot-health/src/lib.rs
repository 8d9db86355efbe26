//! twinslot-health: slot health gating and post-cutover verification.
//!
//! # Architecture
//!
//! ```text
//! HealthProber::wait_healthy(slot, expected, query)
//!   ├── query() → Vec<ServiceStatus>   (supplied by the orchestrator)
//!   ├── HealthProbeResult::evaluate()  (all expected services healthy?)
//!   └── sleep(interval), up to max_attempts
//!
//! PostCutoverVerifier::verify(probe, timeout)
//!   ├── sleep(stabilization)
//!   └── probe.probe(timeout) → ProbeResult   (one shot, no retry)
//! ```
//!
//! The prober never talks to the platform itself; the orchestrator hands it
//! a status query closure.

pub mod probe;
pub mod prober;
pub mod verifier;

pub use probe::{HttpProbe, ProbeResult, PublicProbe, http_probe};
pub use prober::{HealthProber, count_healthy};
pub use verifier::PostCutoverVerifier;
