//! twinslot.toml configuration parser.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::{ConfigError, ConfigResult};
use crate::types::{ServiceName, SlotId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinslotConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub health: HealthConfig,
    pub verify: VerifyConfig,
    pub router: RouterConfig,
    pub backup: Option<BackupConfig>,
    pub maintenance: Option<MaintenanceConfig>,
    #[serde(default)]
    pub lease: LeaseConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Prefix for the per-slot compose projects (`{name}-a`, `{name}-b`).
    pub name: String,
    pub compose_file: PathBuf,
    /// Full declared service set; every one must be healthy before cutover.
    pub services: Vec<ServiceName>,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub max_attempts: u32,
    pub interval: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: "10s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Public `host:port` the verifier probes after cutover.
    pub address: String,
    #[serde(default = "default_verify_path")]
    pub path: String,
    #[serde(default = "default_stabilization")]
    pub stabilization: String,
    #[serde(default = "default_verify_timeout")]
    pub timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub upstream_file: PathBuf,
    #[serde(default = "default_upstream_name")]
    pub upstream_name: String,
    pub reload_command: Vec<String>,
    pub backends: SlotBackends,
}

/// Upstream `host:port` serving each slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotBackends {
    pub a: String,
    pub b: String,
}

impl SlotBackends {
    pub fn for_slot(&self, slot: SlotId) -> &str {
        match slot {
            SlotId::A => &self.a,
            SlotId::B => &self.b,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub dump_command: Vec<String>,
    pub destination: PathBuf,
}

/// Command run inside the target slot after it is healthy (e.g. migrations).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub service: ServiceName,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    pub ttl: String,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl: "30m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Container CLI binary; invoked as `{binary} compose ...`.
    pub binary: String,
    pub command_timeout: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            command_timeout: "300s".to_string(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".twinslot")
}

fn default_verify_path() -> String {
    "/health".to_string()
}

fn default_stabilization() -> String {
    "30s".to_string()
}

fn default_verify_timeout() -> String {
    "10s".to_string()
}

fn default_upstream_name() -> String {
    "app".to_string()
}

fn default_true() -> bool {
    true
}

impl TwinslotConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate config from a TOML string.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: TwinslotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the orchestrator relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.project.name.trim().is_empty() {
            return invalid("project.name must not be empty");
        }
        if self.project.services.is_empty() {
            return invalid("project.services must list at least one service");
        }
        let mut seen = HashSet::new();
        for service in &self.project.services {
            if service.trim().is_empty() {
                return invalid("project.services contains an empty name");
            }
            if !seen.insert(service.as_str()) {
                return invalid(&format!("project.services lists '{service}' twice"));
            }
        }

        if self.health.max_attempts == 0 {
            return invalid("health.max_attempts must be at least 1");
        }
        check_duration("health.interval", &self.health.interval)?;
        check_duration("verify.stabilization", &self.verify.stabilization)?;
        check_duration("verify.timeout", &self.verify.timeout)?;
        check_duration("lease.ttl", &self.lease.ttl)?;
        check_duration("platform.command_timeout", &self.platform.command_timeout)?;

        if self.verify.address.trim().is_empty() {
            return invalid("verify.address must not be empty");
        }
        if !self.verify.path.starts_with('/') {
            return invalid("verify.path must start with '/'");
        }

        if self.router.reload_command.is_empty() {
            return invalid("router.reload_command must not be empty");
        }
        if self.router.backends.a.trim().is_empty() || self.router.backends.b.trim().is_empty() {
            return invalid("router.backends must define both a and b");
        }

        if let Some(backup) = &self.backup {
            if backup.enabled && backup.dump_command.is_empty() {
                return invalid("backup.dump_command must not be empty");
            }
        }

        if let Some(maintenance) = &self.maintenance {
            if maintenance.command.is_empty() {
                return invalid("maintenance.command must not be empty");
            }
            if !self.project.services.contains(&maintenance.service) {
                return invalid(&format!(
                    "maintenance.service '{}' is not in project.services",
                    maintenance.service
                ));
            }
        }

        Ok(())
    }

    pub fn health_interval(&self) -> Duration {
        parse_duration(&self.health.interval).unwrap_or(Duration::from_secs(10))
    }

    pub fn stabilization(&self) -> Duration {
        parse_duration(&self.verify.stabilization).unwrap_or(Duration::from_secs(30))
    }

    pub fn verify_timeout(&self) -> Duration {
        parse_duration(&self.verify.timeout).unwrap_or(Duration::from_secs(10))
    }

    pub fn lease_ttl(&self) -> Duration {
        parse_duration(&self.lease.ttl).unwrap_or(Duration::from_secs(30 * 60))
    }

    pub fn command_timeout(&self) -> Duration {
        parse_duration(&self.platform.command_timeout).unwrap_or(Duration::from_secs(300))
    }

    /// Backup settings, if backups are configured and enabled.
    pub fn active_backup(&self) -> Option<&BackupConfig> {
        self.backup.as_ref().filter(|b| b.enabled)
    }

    /// Resolve a path from the config relative to the config file's directory.
    pub fn resolve(&self, base: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

fn invalid<T>(msg: &str) -> ConfigResult<T> {
    Err(ConfigError::Invalid(msg.to_string()))
}

fn check_duration(field: &str, value: &str) -> ConfigResult<()> {
    match parse_duration(value) {
        Some(_) => Ok(()),
        None => invalid(&format!("{field}: cannot parse duration '{value}'")),
    }
}
