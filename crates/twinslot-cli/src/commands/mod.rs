pub mod cleanup;
pub mod deploy;
pub mod history;
pub mod rollback;
pub mod status;
pub mod unlock;

use twinslot_state::{DeploymentRecord, SlotId};

pub(crate) fn slot_or_none(slot: Option<SlotId>) -> String {
    slot.map_or_else(|| "none".to_string(), |s| s.to_string())
}

pub(crate) fn outcome_label(record: &DeploymentRecord) -> &'static str {
    record.outcome.map_or("IN_PROGRESS", |o| o.label())
}

/// Multi-line summary of one deployment.
pub(crate) fn render_record(record: &DeploymentRecord) -> String {
    let mut out = format!("deployment {}: {}\n", record.id, outcome_label(record));
    out.push_str(&format!(
        "  slot:    {} (previous: {})\n",
        record.target_slot,
        slot_or_none(record.previous_slot)
    ));
    if let Some(backup) = &record.backup {
        out.push_str(&format!(
            "  backup:  {} ({} bytes, sha256 {})\n",
            backup.location, backup.size_bytes, backup.sha256
        ));
    }
    if let Some(health) = &record.last_health {
        out.push_str(&format!(
            "  health:  {}/{} services healthy after {} attempt(s)\n",
            health.healthy_services, health.total_services, health.attempt
        ));
    }
    if let Some(reason) = &record.failure_reason {
        out.push_str(&format!("  reason:  {reason}\n"));
    }
    if !record.trail.is_empty() {
        out.push_str(&format!("  trail:   {}\n", record.trail.join(" -> ")));
    }
    out
}
