//! `twinslot unlock`: drop a lease abandoned by a crashed run.

use std::path::Path;
use std::process::ExitCode;

use tracing::warn;

use twinslot_state::unix_now;

use crate::workspace::Workspace;

pub fn unlock(config: &Path) -> anyhow::Result<ExitCode> {
    let workspace = Workspace::load(config)?;
    // Fails with a held-lease error while a live run has the store open.
    let store = workspace.open_store()?;

    match store.break_lease()? {
        Some(lease) => {
            if !lease.is_expired(unix_now()) {
                warn!(holder = %lease.holder, "removed a lease that had not expired yet");
            }
            println!(
                "removed lease held by {} ({} reached {})",
                lease.holder, lease.operation, lease.state
            );
        }
        None => println!("no lease held"),
    }
    Ok(ExitCode::SUCCESS)
}
