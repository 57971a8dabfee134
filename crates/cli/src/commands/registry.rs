// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hpm registry status` — a read-only dump of the process registry
//! document, analogous to the original's debug introspection helper.

use anyhow::Result;
use clap::Args;

use hpm_core::Config;
use hpm_storage::ProcessRegistry;

use crate::exit_error::ExitError;

#[derive(Args)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistryCommand,
}

#[derive(clap::Subcommand)]
pub enum RegistryCommand {
    /// Print the current registry document as JSON
    Status {
        /// Port whose registry file to read; defaults to `SERVICE_PORT`/6969
        #[arg(long)]
        port: Option<u16>,
    },
}

pub fn status(port: Option<u16>) -> Result<()> {
    let config = Config::from_env();
    let path = match port {
        Some(port) => hpm_core::registry_path_for_port(port),
        None => config.registry_path(),
    };

    let registry = ProcessRegistry::new(path);
    let snapshot = registry.snapshot().map_err(|e| ExitError::new(1, e.to_string()))?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_path_defaults_to_the_configured_service_port() {
        let config = Config::from_lookup(|_| None);
        let path = hpm_core::registry_path_for_port(config.service_port);
        assert!(path.to_string_lossy().ends_with(&format!("headless_pm_mcp_clients_{}.json", config.service_port)));
    }

    #[test]
    fn status_with_an_explicit_port_reads_that_ports_registry() {
        let dir = tempfile::tempdir().expect("dir");
        let path = dir.path().join("registry.json");
        let registry = ProcessRegistry::new(path.clone());
        registry.register_mcp_client(std::process::id(), "me", 1_700_000_000).expect("register");

        let snapshot = registry.snapshot().expect("snapshot");
        assert_eq!(snapshot.processes.len(), 1);
    }
}
