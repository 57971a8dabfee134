// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor / auto-start for the shared PM service.
//!
//! Grounded on `original_source`'s `mcp/server.py` (`_ensure_api_running`,
//! `_find_headless_pm_command`): probe for an existing server, coordinate
//! with peers through the registry, rate-limit and discover a launch
//! command, preflight it, spawn, and wait for the new server to answer
//! `/health`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use hpm_core::{Clock, ClientId};
use hpm_storage::{ProcessRegistry, RateLimiter};

use crate::command_table::{self, CommandProbe};
use crate::error::DaemonError;
use crate::health_probe::HealthProbe;
use crate::mcp_context;
use crate::spawner::ProcessSpawner;

const PEER_START_TIMEOUT: Duration = Duration::from_secs(10);
const PEER_POLL_INTERVAL: Duration = Duration::from_millis(250);
const READY_TIMEOUT: Duration = Duration::from_secs(15);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct SupervisorConfig {
    pub port: u16,
    pub client_id: ClientId,
    pub no_autostart: bool,
    pub command_override: Option<String>,
    pub spawn_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// A server was already reachable; we never touch its lifecycle.
    ConnectedToExisting { pid: Option<u32>, started_at_secs: Option<u64> },
    /// We spawned the server and own shutting it down later. `started_at_secs`
    /// is the OS process creation time, recorded so shutdown can later
    /// detect PID reuse before sending a termination signal.
    StartedByUs { pid: u32, started_at_secs: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub base_url: String,
    pub ownership: Ownership,
}

pub struct Supervisor<C, S, P, H> {
    config: SupervisorConfig,
    registry: ProcessRegistry,
    rate_limiter: RateLimiter,
    clock: C,
    spawner: S,
    probe: P,
    health: H,
}

impl<C, S, P, H> Supervisor<C, S, P, H>
where
    C: Clock,
    S: ProcessSpawner,
    P: CommandProbe,
    H: HealthProbe,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SupervisorConfig,
        registry: ProcessRegistry,
        rate_limiter: RateLimiter,
        clock: C,
        spawner: S,
        probe: P,
        health: H,
    ) -> Self {
        Self { config, registry, rate_limiter, clock, spawner, probe, health }
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.config.port)
    }

    pub fn ensure(&self) -> Result<EnsureOutcome, DaemonError> {
        self.registry.prune_stale(self.clock.epoch_secs())?;

        if self.health.check() {
            return Ok(self.connected_to_existing());
        }

        let should_start = self.registry.register_mcp_client(
            std::process::id(),
            self.config.client_id.as_str(),
            self.clock.epoch_secs(),
        )?;

        if !should_start {
            if let Some(outcome) = self.wait_for_peer_start() {
                return Ok(outcome);
            }
        }

        if self.config.no_autostart {
            return Err(DaemonError::AutoStartDisabled);
        }

        if !self.rate_limiter.check_startup(self.config.port, self.clock.epoch_secs())? {
            return Err(DaemonError::RateLimited);
        }

        let in_mcp_context = mcp_context::detect(|key| std::env::var(key).ok());
        let command = command_table::discover(
            self.config.command_override.as_deref(),
            in_mcp_context,
            self.config.port,
            &self.probe,
        )
        .ok_or(DaemonError::NoLaunchCommand)?;

        self.preflight()?;

        let env_set = [("HEADLESS_PM_FROM_MCP".to_string(), "1".to_string())];
        let env_clear = ["MCP_PORT"];
        let mut child = self.spawner.spawn(&command, self.config.spawn_dir.as_deref(), &env_set, &env_clear)?;

        self.wait_for_ready(child.as_mut())
    }

    fn connected_to_existing(&self) -> EnsureOutcome {
        let (pid, started_at_secs) = match mcp_context::find_api_server_on_port(self.config.port) {
            Some((pid, started_at)) => (Some(pid.as_u32()), Some(started_at)),
            None => (None, None),
        };
        EnsureOutcome { base_url: self.base_url(), ownership: Ownership::ConnectedToExisting { pid, started_at_secs } }
    }

    fn wait_for_peer_start(&self) -> Option<EnsureOutcome> {
        let deadline = Instant::now() + PEER_START_TIMEOUT;
        while Instant::now() < deadline {
            if self.health.check() {
                return Some(self.connected_to_existing());
            }
            std::thread::sleep(PEER_POLL_INTERVAL);
        }
        None
    }

    /// Working directory and port checks only; unlike the original, this
    /// supervisor never imports the PM service's own runtime dependencies
    /// (it launches an external binary, it doesn't embed one), so there is
    /// no analogous "import test" step here.
    fn preflight(&self) -> Result<(), DaemonError> {
        if let Some(dir) = &self.config.spawn_dir {
            let metadata = std::fs::metadata(dir)
                .map_err(|e| DaemonError::PreflightFailed(format!("spawn directory {} unreadable: {e}", dir.display())))?;
            if !metadata.is_dir() {
                return Err(DaemonError::PreflightFailed(format!("{} is not a directory", dir.display())));
            }
        }
        if !hpm_net::port_is_free(self.config.port) {
            return Err(DaemonError::PreflightFailed(format!("port {} is already bound", self.config.port)));
        }
        Ok(())
    }

    fn wait_for_ready(&self, child: &mut dyn crate::spawner::SpawnedChild) -> Result<EnsureOutcome, DaemonError> {
        let deadline = Instant::now() + READY_TIMEOUT;
        loop {
            match child.try_wait() {
                Ok(Some(code)) => {
                    let stderr = child.drain_stderr();
                    return Err(DaemonError::SpawnedProcessExited(format!("exit code {code}: {stderr}")));
                }
                Ok(None) => {}
                Err(_) => return Err(DaemonError::ReadyTimeout),
            }

            if self.health.check() {
                let (pid, started_at_secs) = match mcp_context::find_api_server_on_port(self.config.port) {
                    Some((pid, started_at)) => (pid.as_u32(), started_at),
                    None => {
                        let pid = child.pid();
                        let started_at = mcp_context::process_identity(pid).map(|(t, _)| t).unwrap_or(0);
                        (pid, started_at)
                    }
                };
                return Ok(EnsureOutcome {
                    base_url: self.base_url(),
                    ownership: Ownership::StartedByUs { pid, started_at_secs },
                });
            }

            if Instant::now() >= deadline {
                child.kill();
                return Err(DaemonError::ReadyTimeout);
            }
            std::thread::sleep(READY_POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
