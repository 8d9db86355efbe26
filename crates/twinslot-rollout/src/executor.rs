//! Deployment executor: materializes the service set in the target slot.

use tracing::info;

use twinslot_core::config::MaintenanceConfig;
use twinslot_core::expand_command;
use twinslot_platform::{Platform, PlatformResult};
use twinslot_state::{ServiceName, SlotId};

#[derive(Debug, Clone)]
pub struct DeploymentExecutor {
    project: String,
    services: Vec<ServiceName>,
    maintenance: Option<MaintenanceConfig>,
}

impl DeploymentExecutor {
    pub fn new(project: &str, services: Vec<ServiceName>, maintenance: Option<MaintenanceConfig>) -> Self {
        Self {
            project: project.to_string(),
            services,
            maintenance,
        }
    }

    /// Start the full service set in `slot`, replacing whatever was there.
    pub async fn provision<P: Platform>(&self, platform: &P, slot: SlotId) -> PlatformResult<()> {
        platform.provision(slot, &self.services).await?;
        info!(%slot, services = ?self.services, "slot provisioned");
        Ok(())
    }

    /// Run the configured maintenance command (schema migration, cache
    /// warmup) inside the healthy target slot. No-op when unconfigured.
    pub async fn run_maintenance<P: Platform>(&self, platform: &P, slot: SlotId) -> PlatformResult<()> {
        let Some(maintenance) = &self.maintenance else {
            return Ok(());
        };
        let command = expand_command(&maintenance.command, &self.project, slot);
        platform.exec(slot, &maintenance.service, &command).await?;
        info!(%slot, service = %maintenance.service, "maintenance command completed");
        Ok(())
    }
}
