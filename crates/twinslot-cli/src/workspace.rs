//! Loaded configuration plus the concrete adapters built from it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use twinslot_backup::{BackupCoordinator, CommandDumper, FsObjectStore};
use twinslot_core::TwinslotConfig;
use twinslot_health::HttpProbe;
use twinslot_platform::ComposePlatform;
use twinslot_proxy::UpstreamFileRouter;
use twinslot_rollout::{Orchestrator, OrchestratorError, OrchestratorSettings, RecordedState};
use twinslot_state::{StateError, StateStore};

pub type LiveOrchestrator = Orchestrator<
    ComposePlatform,
    UpstreamFileRouter,
    HttpProbe,
    BackupCoordinator<CommandDumper, FsObjectStore>,
>;

const STORE_FILE: &str = "twinslot.redb";

pub struct Workspace {
    pub config: TwinslotConfig,
    /// Directory relative config paths resolve against.
    base: PathBuf,
}

impl Workspace {
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let config = TwinslotConfig::from_file(config_path)?;
        let base = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        debug!(config = %config_path.display(), project = %config.project.name, "config loaded");
        Ok(Self { config, base })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.config.resolve(&self.base, path)
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.config.project.state_dir).join(STORE_FILE)
    }

    /// Open the state store, creating the state directory if needed.
    ///
    /// A store held open by another twinslot process is reported as a held
    /// lease.
    pub fn open_store(&self) -> anyhow::Result<StateStore> {
        let dir = self.resolve(&self.config.project.state_dir);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create state directory {}", dir.display()))
            .map_err(|e| OrchestratorError::Prerequisite(format!("{e:#}")))?;
        let store =
            StateStore::open(&self.store_path()).map_err(OrchestratorError::store_unavailable)?;
        Ok(store)
    }

    /// Open the store for a read-only command. `None` when another run has it.
    pub fn open_store_for_read(&self) -> anyhow::Result<Option<StateStore>> {
        if !self.store_path().exists() {
            return Ok(None);
        }
        match StateStore::open(&self.store_path()) {
            Ok(store) => Ok(Some(store)),
            Err(StateError::Busy) => Ok(None),
            Err(e) => Err(OrchestratorError::store_unavailable(e).into()),
        }
    }

    /// Lease and last deployment for `status`. The store is closed again
    /// before this returns, so a concurrent deploy can open it. `None` when
    /// another run has it.
    pub fn read_recorded_state(&self) -> anyhow::Result<Option<RecordedState>> {
        Ok(self
            .open_store_for_read()?
            .map(|store| RecordedState::read(&store)))
    }

    /// Build the orchestrator over the compose platform and the upstream
    /// file router. Fails before touching anything if the compose file is
    /// missing.
    pub fn orchestrator(&self) -> anyhow::Result<LiveOrchestrator> {
        let config = &self.config;
        let compose_file = self.resolve(&config.project.compose_file);
        if !compose_file.is_file() {
            return Err(OrchestratorError::Prerequisite(format!(
                "compose file {} not found",
                compose_file.display()
            ))
            .into());
        }

        let timeout = config.command_timeout();
        let platform = ComposePlatform::new(
            &config.platform.binary,
            &config.project.name,
            compose_file,
            timeout,
        );
        let router = UpstreamFileRouter::new(
            self.resolve(&config.router.upstream_file),
            &config.router.upstream_name,
            config.router.backends.clone(),
            config.router.reload_command.clone(),
            timeout,
        );
        let probe = HttpProbe::new(&config.verify.address, &config.verify.path);
        let backup = config.active_backup().map(|backup| {
            BackupCoordinator::new(
                &config.project.name,
                CommandDumper::new(&config.project.name, backup.dump_command.clone(), timeout),
                FsObjectStore::new(self.resolve(&backup.destination)),
            )
        });

        Ok(Orchestrator::new(
            OrchestratorSettings::from_config(config),
            platform,
            router,
            probe,
            backup,
        ))
    }
}
