//! `twinslot cleanup`

use std::path::Path;
use std::process::ExitCode;

use twinslot_rollout::CleanupReport;

use crate::workspace::Workspace;

pub async fn cleanup(config: &Path) -> anyhow::Result<ExitCode> {
    let workspace = Workspace::load(config)?;
    let orchestrator = workspace.orchestrator()?.with_store(workspace.open_store()?);

    let report = orchestrator.cleanup().await?;
    print!("{}", render(&report));
    Ok(ExitCode::SUCCESS)
}

fn render(report: &CleanupReport) -> String {
    let destroyed: Vec<String> = report.destroyed.iter().map(|s| s.to_string()).collect();
    let mut out = format!(
        "cleanup: destroyed slots [{}]; routing {}\n",
        destroyed.join(", "),
        if report.routing_cleared { "cleared" } else { "NOT cleared" }
    );
    for warning in &report.warnings {
        out.push_str(&format!("  warning: {warning}\n"));
    }
    out
}
