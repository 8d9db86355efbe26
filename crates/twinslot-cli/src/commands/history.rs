//! `twinslot history`

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use twinslot_state::{DeploymentRecord, StateStore};

use crate::OutputFormat;
use crate::commands::{outcome_label, render_record, slot_or_none};
use crate::workspace::Workspace;

pub fn history(
    config: &Path,
    limit: usize,
    id: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let workspace = Workspace::load(config)?;
    let Some(store) = workspace.open_store_for_read()? else {
        if workspace.store_path().exists() {
            println!("operation in progress: state store is held by another twinslot run");
        } else {
            println!("no deployments recorded");
        }
        return Ok(ExitCode::SUCCESS);
    };

    if let Some(id) = id {
        let record = lookup(&store, id)?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
            OutputFormat::Text => print!("{}", render_record(&record)),
        }
        return Ok(ExitCode::SUCCESS);
    }

    let records = store.list_deployments(limit)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => print!("{}", render(&records)),
    }
    Ok(ExitCode::SUCCESS)
}

fn lookup(store: &StateStore, id: &str) -> anyhow::Result<DeploymentRecord> {
    store
        .get_deployment(id)?
        .with_context(|| format!("no deployment with id {id}"))
}

fn render(records: &[DeploymentRecord]) -> String {
    if records.is_empty() {
        return "no deployments recorded\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "{:<32} {:<16} {} -> {}  started {}",
            record.id,
            outcome_label(record),
            slot_or_none(record.previous_slot),
            record.target_slot,
            record.started_at
        ));
        if let Some(reason) = &record.failure_reason {
            out.push_str(&format!("  ({reason})"));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use twinslot_state::{DeploymentOutcome, SlotId};

    #[test]
    fn one_line_per_record() {
        let mut failed = fixtures::record("shop-2", DeploymentOutcome::DeployFailed);
        failed.failure_reason = Some("slot B not healthy".to_string());
        let mut first = fixtures::record("shop-1", DeploymentOutcome::Success);
        first.previous_slot = None;
        first.target_slot = SlotId::B;

        let text = render(&[failed, first]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("shop-2"));
        assert!(lines[0].contains("DEPLOY_FAILED"));
        assert!(lines[0].ends_with("(slot B not healthy)"));
        assert!(lines[1].contains("none -> B"));
    }

    #[test]
    fn lookup_by_id() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .put_deployment(&fixtures::record("shop-7", DeploymentOutcome::RolledBack))
            .unwrap();

        let found = lookup(&store, "shop-7").unwrap();
        assert_eq!(found.outcome, Some(DeploymentOutcome::RolledBack));

        let err = lookup(&store, "shop-8").unwrap_err();
        assert_eq!(err.to_string(), "no deployment with id shop-8");
        assert_eq!(crate::exit::error_code(&err), crate::exit::FAILED);
    }

    #[test]
    fn empty_history() {
        assert_eq!(render(&[]), "no deployments recorded\n");
    }
}
