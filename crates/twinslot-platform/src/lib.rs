//! twinslot-platform: the container platform that hosts the two slots.
//!
//! Each slot is a separate compose project (`{project}-a`, `{project}-b`)
//! built from the same compose file. The [`Platform`] trait is what the
//! orchestrator consumes; [`ComposePlatform`] drives the `docker compose`
//! CLI through [`command::run_command`].
//!
//! # Components
//!
//! - **`command`**: bounded subprocess execution shared by all adapters
//! - **`compose`**: `ComposePlatform` and compose JSON output parsing
//! - **`platform`**: the `Platform` trait

pub mod command;
pub mod compose;
pub mod error;
pub mod platform;

pub use command::{CommandError, run_command};
pub use compose::ComposePlatform;
pub use error::{PlatformError, PlatformResult};
pub use platform::Platform;
