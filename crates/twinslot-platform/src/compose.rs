//! `ComposePlatform`: one compose project per slot.
//!
//! Slot markers are the compose project names `{project}-a` / `{project}-b`.
//! The compose file receives `TWINSLOT_SLOT` so it can vary names or ports
//! per slot.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use twinslot_core::slot_project;
use twinslot_state::{HealthStatus, ServiceName, ServiceStatus, SlotId};

use crate::command::run_command;
use crate::error::{PlatformError, PlatformResult};
use crate::platform::Platform;

/// Drives `{binary} compose` for both slots.
#[derive(Debug, Clone)]
pub struct ComposePlatform {
    binary: String,
    project: String,
    compose_file: PathBuf,
    timeout: Duration,
}

impl ComposePlatform {
    pub fn new(binary: &str, project: &str, compose_file: PathBuf, timeout: Duration) -> Self {
        Self {
            binary: binary.to_string(),
            project: project.to_string(),
            compose_file,
            timeout,
        }
    }

    /// Base argv for commands scoped to one slot's project.
    fn slot_args(&self, slot: SlotId) -> Vec<String> {
        vec![
            self.binary.clone(),
            "compose".to_string(),
            "-p".to_string(),
            slot_project(&self.project, slot),
            "-f".to_string(),
            self.compose_file.display().to_string(),
        ]
    }

    fn slot_env(slot: SlotId) -> Vec<(String, String)> {
        vec![("TWINSLOT_SLOT".to_string(), slot.suffix().to_string())]
    }

    async fn run_for_slot(&self, slot: SlotId, extra: &[&str]) -> PlatformResult<Vec<u8>> {
        let mut argv = self.slot_args(slot);
        argv.extend(extra.iter().map(|s| s.to_string()));
        Ok(run_command(&argv, &Self::slot_env(slot), self.timeout).await?)
    }
}

impl Platform for ComposePlatform {
    async fn provisioned_slots(&self) -> PlatformResult<Vec<SlotId>> {
        let argv = vec![
            self.binary.clone(),
            "compose".to_string(),
            "ls".to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        let out = run_command(&argv, &[], self.timeout).await?;
        let projects = parse_ls(&out)?;
        let slots: Vec<SlotId> = SlotId::ALL
            .into_iter()
            .filter(|slot| {
                let name = slot_project(&self.project, *slot);
                projects
                    .iter()
                    .any(|p| p.name == name && p.status.contains("running"))
            })
            .collect();
        debug!(project = %self.project, ?slots, "provisioned slots");
        Ok(slots)
    }

    async fn service_status(&self, slot: SlotId) -> PlatformResult<Vec<ServiceStatus>> {
        let out = self
            .run_for_slot(slot, &["ps", "--all", "--format", "json"])
            .await?;
        parse_ps(&out)
    }

    async fn provision(&self, slot: SlotId, services: &[ServiceName]) -> PlatformResult<()> {
        if services.is_empty() {
            return Err(PlatformError::Rejected("empty service set".to_string()));
        }
        info!(%slot, services = services.len(), "provisioning slot");
        let mut extra = vec!["up", "-d", "--force-recreate", "--remove-orphans"];
        extra.extend(services.iter().map(String::as_str));
        self.run_for_slot(slot, &extra).await?;
        Ok(())
    }

    async fn exec(&self, slot: SlotId, service: &str, command: &[String]) -> PlatformResult<()> {
        info!(%slot, service, command = %command.join(" "), "running maintenance command");
        let mut extra = vec!["exec", "-T", service];
        extra.extend(command.iter().map(String::as_str));
        self.run_for_slot(slot, &extra).await?;
        Ok(())
    }

    async fn stop(&self, slot: SlotId) -> PlatformResult<()> {
        info!(%slot, "stopping slot");
        self.run_for_slot(slot, &["down", "--remove-orphans"]).await?;
        Ok(())
    }

    async fn destroy(&self, slot: SlotId) -> PlatformResult<()> {
        info!(%slot, "destroying slot and volumes");
        self.run_for_slot(slot, &["down", "--volumes", "--remove-orphans"])
            .await?;
        Ok(())
    }
}

// ── Output parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LsEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Status", default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Health", default)]
    health: String,
}

/// Compose emits either a JSON array or one JSON object per line,
/// depending on its version. Accept both.
fn parse_json_rows<T: for<'de> Deserialize<'de>>(
    out: &[u8],
    what: &'static str,
) -> PlatformResult<Vec<T>> {
    let text = String::from_utf8_lossy(out);
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let parse_err = |e: serde_json::Error| PlatformError::Parse {
        what,
        message: e.to_string(),
    };
    if text.starts_with('[') {
        return serde_json::from_str(text).map_err(parse_err);
    }
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(parse_err))
        .collect()
}

fn parse_ls(out: &[u8]) -> PlatformResult<Vec<LsEntry>> {
    parse_json_rows(out, "compose ls")
}

fn parse_ps(out: &[u8]) -> PlatformResult<Vec<ServiceStatus>> {
    let rows: Vec<PsEntry> = parse_json_rows(out, "compose ps")?;
    Ok(rows
        .into_iter()
        .map(|row| ServiceStatus {
            service: row.service,
            running: row.state == "running",
            health: parse_health(&row.health),
        })
        .collect())
}

fn parse_health(raw: &str) -> Option<HealthStatus> {
    match raw.trim() {
        "" => None,
        "healthy" => Some(HealthStatus::Healthy),
        "unhealthy" => Some(HealthStatus::Unhealthy),
        "starting" => Some(HealthStatus::Starting),
        _ => Some(HealthStatus::Unknown),
    }
}
