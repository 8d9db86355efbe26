//! `twinslot status`: read-only view of both slots.

use std::path::Path;
use std::process::ExitCode;

use twinslot_rollout::StatusReport;
use twinslot_state::{Role, unix_now};

use crate::OutputFormat;
use crate::commands::{outcome_label, slot_or_none};
use crate::workspace::Workspace;

pub async fn status(config: &Path, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let workspace = Workspace::load(config)?;
    let recorded = workspace.read_recorded_state()?;
    let busy = recorded.is_none() && workspace.store_path().exists();

    let report = workspace
        .orchestrator()?
        .status(recorded.unwrap_or_default())
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print!("{}", render(&workspace.config.project.name, &report, unix_now()));
            if busy {
                println!("operation in progress: state store is held by another twinslot run");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn render(project: &str, report: &StatusReport, now: u64) -> String {
    let mut out = format!(
        "project: {project}\nrouting: {}\n\n",
        slot_or_none(report.routed)
    );
    out.push_str(&format!(
        "{:<6}{:<10}{:<13}{}\n",
        "SLOT", "ROLE", "PROVISIONED", "HEALTH"
    ));
    for slot in &report.slots {
        let role = match slot.role {
            Role::Active => "active",
            Role::Inactive => "inactive",
            Role::Unknown => "unknown",
        };
        let health = match &slot.health {
            Some(h) => format!(
                "{}/{} {}",
                h.healthy_services,
                h.total_services,
                if h.passed { "healthy" } else { "unhealthy" }
            ),
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "{:<6}{:<10}{:<13}{}\n",
            slot.slot.to_string(),
            role,
            if slot.provisioned { "yes" } else { "no" },
            health
        ));
    }
    out.push('\n');

    match &report.lease {
        Some(lease) if lease.is_expired(now) => out.push_str(&format!(
            "lease: EXPIRED, held by {} ({} reached {}); run `twinslot unlock` after inspecting\n",
            lease.holder, lease.operation, lease.state
        )),
        Some(lease) => out.push_str(&format!(
            "lease: held by {} ({}, {}), expires in {}s\n",
            lease.holder,
            lease.operation,
            lease.state,
            lease.expires_at.saturating_sub(now)
        )),
        None => out.push_str("lease: none\n"),
    }
    match &report.last_deployment {
        Some(d) => out.push_str(&format!(
            "last deployment: {} {} (slot {}, started {})\n",
            d.id,
            outcome_label(d),
            d.target_slot,
            d.started_at
        )),
        None => out.push_str("last deployment: none\n"),
    }
    out
}
