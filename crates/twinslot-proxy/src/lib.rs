//! twinslot-proxy: the routing layer that decides which slot is live.
//!
//! # Components
//!
//! - **`router`**: `RoutingLayer` trait and `UpstreamFileRouter`, which
//!   renders a reverse-proxy upstream block for one slot and triggers a
//!   single reload
//! - **`error`**: routing errors

pub mod error;
pub mod router;

pub use error::{RoutingError, RoutingResult};
pub use router::{RoutingLayer, UpstreamFileRouter, parse_target, render_upstream};
