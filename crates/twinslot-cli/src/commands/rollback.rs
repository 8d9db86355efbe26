//! `twinslot rollback`

use std::path::Path;
use std::process::ExitCode;

use crate::workspace::Workspace;

pub async fn rollback(config: &Path) -> anyhow::Result<ExitCode> {
    let workspace = Workspace::load(config)?;
    let orchestrator = workspace.orchestrator()?.with_store(workspace.open_store()?);

    let report = orchestrator.rollback().await?;
    println!(
        "rolled back: traffic moved from slot {} to slot {}; slot {} stopped (volumes kept)",
        report.from, report.to, report.from
    );
    Ok(ExitCode::SUCCESS)
}
