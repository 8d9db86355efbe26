//! Logical database dumps.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use twinslot_core::expand_command;
use twinslot_platform::run_command;
use twinslot_state::SlotId;

use crate::error::{BackupError, BackupResult};

/// Produces a consistent logical dump of the database behind a slot.
pub trait DatabaseDumper {
    fn dump(&self, slot: SlotId) -> impl Future<Output = BackupResult<Vec<u8>>> + Send;
}

/// Runs a configured dump command (e.g. `pg_dump` inside the slot's
/// database container) and captures its stdout.
#[derive(Debug, Clone)]
pub struct CommandDumper {
    project: String,
    command: Vec<String>,
    timeout: Duration,
}

impl CommandDumper {
    pub fn new(project: &str, command: Vec<String>, timeout: Duration) -> Self {
        Self {
            project: project.to_string(),
            command,
            timeout,
        }
    }
}

impl DatabaseDumper for CommandDumper {
    async fn dump(&self, slot: SlotId) -> BackupResult<Vec<u8>> {
        let argv = expand_command(&self.command, &self.project, slot);
        debug!(%slot, command = %argv.join(" "), "dumping database");
        let out = run_command(&argv, &[], self.timeout).await?;
        if out.is_empty() {
            return Err(BackupError::EmptyDump);
        }
        Ok(out)
    }
}
