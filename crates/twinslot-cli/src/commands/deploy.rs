//! `twinslot deploy`

use std::path::Path;
use std::process::ExitCode;

use twinslot_state::DeploymentOutcome;

use crate::commands::render_record;
use crate::exit;
use crate::workspace::Workspace;

pub async fn deploy(config: &Path) -> anyhow::Result<ExitCode> {
    let workspace = Workspace::load(config)?;
    let orchestrator = workspace.orchestrator()?.with_store(workspace.open_store()?);

    let record = orchestrator.deploy().await?;
    print!("{}", render_record(&record));
    if record.outcome == Some(DeploymentOutcome::RollbackFailed) {
        eprintln!("ROLLBACK FAILED: restore traffic manually, then run `twinslot status`");
    }

    Ok(exit::for_outcome(
        record.outcome.unwrap_or(DeploymentOutcome::DeployFailed),
    ))
}
