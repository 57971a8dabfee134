// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hpm supervisor ensure` / `hpm supervisor shutdown` — the auto-start and
//! shutdown entry points. Each subcommand is a separate process invocation, so a fact
//! `ensure` learns (whether *this* client started the server) is persisted
//! to a small sidecar ledger rather than kept in memory, for `shutdown` to
//! pick back up later.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use hpm_core::{ClientId, Config, SystemClock};
use hpm_daemon::{
    OsSpawner, OwnedServer, ShutdownCoordinator, SignalTerminator, SpawnProbe, Supervisor,
    SupervisorConfig, SysinfoIdentity,
};
use hpm_net::PmClient;
use hpm_storage::{atomic, ProcessRegistry, RateLimiter};

use crate::exit_error::ExitError;

#[derive(Args)]
pub struct SupervisorArgs {
    #[command(subcommand)]
    pub command: SupervisorCommand,
}

#[derive(clap::Subcommand)]
pub enum SupervisorCommand {
    /// Start the PM service if nothing answers on the target port, or
    /// confirm that one already does
    Ensure(EnsureArgs),
    /// Release this client's hold on the server, tearing it down if this
    /// client started it and no peers remain
    Shutdown(ShutdownArgs),
}

#[derive(Args)]
pub struct EnsureArgs {
    /// Port to target; defaults to `SERVICE_PORT`/6969
    #[arg(long)]
    pub port: Option<u16>,
    /// Stable identifier for this MCP client, used for registry bookkeeping
    /// and deterministic port hashing
    #[arg(long = "client-id")]
    pub client_id: String,
}

#[derive(Args)]
pub struct ShutdownArgs {
    /// Port this client targeted in its `ensure` call
    #[arg(long)]
    pub port: Option<u16>,
    /// Must match the `--client-id` passed to the corresponding `ensure`
    #[arg(long = "client-id")]
    pub client_id: String,
}

/// A one-shot record of `Ownership::StartedByUs`, keyed by client and port,
/// so a later `shutdown` invocation (a separate process) can reconstruct
/// the `OwnedServer` argument `ShutdownCoordinator::shutdown` needs.
/// Written through `hpm_storage::atomic::update`, the same primitive the
/// registry and rate-limit documents already use.
#[derive(Debug, Default, Serialize, Deserialize)]
struct OwnershipLedger {
    #[serde(default)]
    entries: std::collections::BTreeMap<String, LedgerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    pid: u32,
    started_at_secs: u64,
}

fn ledger_path(port: u16) -> PathBuf {
    std::env::temp_dir().join(format!("headless_pm_ownership_{port}.json"))
}

fn resolve_port(requested: Option<u16>, config: &Config, client_id: &str) -> u16 {
    let baseline = requested.unwrap_or(config.service_port);
    hpm_net::allocate_port(baseline, Some(client_id), None)
}

pub fn ensure(args: EnsureArgs) -> Result<()> {
    let config = Config::from_env();
    let client_id = ClientId::new(args.client_id.clone());
    let port = resolve_port(args.port, &config, client_id.as_str());

    let registry = ProcessRegistry::new(config.registry_path());
    let rate_limiter = RateLimiter::new(config.registry_path());
    let supervisor_config = SupervisorConfig {
        port,
        client_id: client_id.clone(),
        no_autostart: config.no_autostart,
        command_override: config.command_override.clone(),
        spawn_dir: config.spawn_dir.clone(),
    };
    let pm = PmClient::new(format!("http://127.0.0.1:{port}"), config.api_key.clone());

    let supervisor = Supervisor::new(
        supervisor_config,
        registry,
        rate_limiter,
        SystemClock,
        OsSpawner,
        SpawnProbe,
        pm,
    );

    let outcome = supervisor.ensure().map_err(|e| ExitError::new(1, e.to_string()))?;

    if let hpm_daemon::Ownership::StartedByUs { pid, started_at_secs } = outcome.ownership {
        record_ownership(port, client_id.as_str(), pid, started_at_secs)?;
    }

    println!("{}", serde_json::json!({
        "base_url": outcome.base_url,
        "started_by_us": matches!(outcome.ownership, hpm_daemon::Ownership::StartedByUs { .. }),
    }));
    Ok(())
}

pub fn shutdown(args: ShutdownArgs) -> Result<()> {
    let config = Config::from_env();
    let client_id = ClientId::new(args.client_id.clone());
    let port = args.port.unwrap_or(config.service_port);

    let registry = ProcessRegistry::new(config.registry_path());
    let coordinator = ShutdownCoordinator::new(
        registry,
        SystemClock,
        SignalTerminator,
        SysinfoIdentity,
    );

    let owned = take_ownership(port, client_id.as_str())?;
    coordinator.shutdown(owned).map_err(|e| ExitError::new(1, e.to_string()))?;
    Ok(())
}

fn record_ownership(port: u16, client_id: &str, pid: u32, started_at_secs: u64) -> Result<()> {
    let path = ledger_path(port);
    atomic::update(&path, OwnershipLedger::default(), |mut ledger| {
        ledger.entries.insert(client_id.to_string(), LedgerEntry { pid, started_at_secs });
        ledger
    })
    .map_err(|e| anyhow!("failed to persist ownership record: {e}"))?;
    Ok(())
}

/// Reads and removes this client's entry, if any. An absent entry is treated
/// as "this client never started the server" — the safe default, since
/// `ShutdownCoordinator::shutdown(None)` only unregisters this client.
fn take_ownership(port: u16, client_id: &str) -> Result<Option<OwnedServer>> {
    let path = ledger_path(port);
    let client_id = client_id.to_string();
    let mut taken = None;
    atomic::update(&path, OwnershipLedger::default(), |mut ledger| {
        taken = ledger.entries.remove(&client_id);
        ledger
    })
    .map_err(|e| anyhow!("failed to read ownership record: {e}"))?;

    Ok(taken.map(|entry| OwnedServer { pid: entry.pid, started_at_secs: entry.started_at_secs }))
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
