//! Traffic routing: points the public upstream at one slot.
//!
//! The upstream file carries a marker line (`# twinslot-target: a|b|none`)
//! so the current target can be read back without parsing proxy syntax.
//! A cutover writes the new file beside the old one, renames it into place
//! and triggers exactly one reload. If the reload fails the old content is
//! restored, so routing is either fully switched or unchanged.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info};

use twinslot_core::SlotId;
use twinslot_core::config::SlotBackends;
use twinslot_platform::run_command;

use crate::error::{RoutingError, RoutingResult};

const MARKER: &str = "# twinslot-target:";

/// The external routing layer.
pub trait RoutingLayer {
    /// Slot that currently receives public traffic, if any.
    fn current_target(&self) -> impl Future<Output = RoutingResult<Option<SlotId>>> + Send;

    /// Atomically repoint public traffic at `slot`.
    fn route_to(&self, slot: SlotId) -> impl Future<Output = RoutingResult<()>> + Send;

    /// Route public traffic nowhere.
    fn clear(&self) -> impl Future<Output = RoutingResult<()>> + Send;
}

/// Renders an nginx-style upstream file and runs a reload command.
#[derive(Debug, Clone)]
pub struct UpstreamFileRouter {
    path: PathBuf,
    upstream_name: String,
    backends: SlotBackends,
    reload_command: Vec<String>,
    timeout: Duration,
}

impl UpstreamFileRouter {
    pub fn new(
        path: PathBuf,
        upstream_name: &str,
        backends: SlotBackends,
        reload_command: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            path,
            upstream_name: upstream_name.to_string(),
            backends,
            reload_command,
            timeout,
        }
    }

    fn io_err(&self) -> impl Fn(std::io::Error) -> RoutingError + '_ {
        |source| RoutingError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read_current(&self) -> RoutingResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err()(e)),
        }
    }

    /// Write via a sibling temp file and rename, so the proxy never reads a
    /// half-written config.
    async fn replace_file(&self, content: &str) -> RoutingResult<()> {
        let tmp = self.path.with_extension("twinslot-tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| RoutingError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(self.io_err())
    }

    async fn restore(&self, previous: Option<&str>) -> bool {
        let restored = match previous {
            Some(content) => self.replace_file(content).await.is_ok(),
            None => tokio::fs::remove_file(&self.path).await.is_ok(),
        };
        if !restored {
            error!(path = %self.path.display(), "failed to restore previous upstream file");
        }
        restored
    }

    /// Swap in the config for `target` and reload once.
    async fn apply(&self, target: Option<SlotId>) -> RoutingResult<()> {
        let previous = self.read_current().await?;
        let content = render_upstream(&self.upstream_name, target, &self.backends);
        self.replace_file(&content).await?;
        debug!(path = %self.path.display(), ?target, "upstream file written");

        if let Err(source) = run_command(&self.reload_command, &[], self.timeout).await {
            let restored = self.restore(previous.as_deref()).await;
            return Err(RoutingError::Reload { restored, source });
        }
        Ok(())
    }
}

impl RoutingLayer for UpstreamFileRouter {
    async fn current_target(&self) -> RoutingResult<Option<SlotId>> {
        match self.read_current().await? {
            Some(content) => parse_target(&self.path, &content),
            None => Ok(None),
        }
    }

    async fn route_to(&self, slot: SlotId) -> RoutingResult<()> {
        info!(%slot, backend = self.backends.for_slot(slot), "switching traffic");
        self.apply(Some(slot)).await?;
        info!(%slot, "traffic switched");
        Ok(())
    }

    async fn clear(&self) -> RoutingResult<()> {
        info!("routing traffic nowhere");
        self.apply(None).await
    }
}

/// Render the upstream block for `target` (or a closed upstream for `None`).
pub fn render_upstream(name: &str, target: Option<SlotId>, backends: &SlotBackends) -> String {
    let (marker, server) = match target {
        Some(slot) => (slot.suffix(), format!("server {};", backends.for_slot(slot))),
        None => ("none", "server 127.0.0.1:9 down;".to_string()),
    };
    format!(
        "# managed by twinslot; do not edit\n\
         {MARKER} {marker}\n\
         upstream {name} {{\n    {server}\n}}\n"
    )
}

/// Read the target marker back out of an upstream file.
pub fn parse_target(path: &Path, content: &str) -> RoutingResult<Option<SlotId>> {
    let value = content
        .lines()
        .find_map(|line| line.trim().strip_prefix(MARKER))
        .map(str::trim)
        .ok_or_else(|| RoutingError::Unmanaged(path.to_path_buf()))?;
    if value == "none" {
        return Ok(None);
    }
    value
        .parse::<SlotId>()
        .map(Some)
        .map_err(|_| RoutingError::BadMarker {
            path: path.to_path_buf(),
            value: value.to_string(),
        })
}
