// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process registry: the flat, PID-keyed coordination document.
//!
//! Typed operations layered on [`crate::atomic::update`]; every operation
//! below is a pure function applied under the file lock, so registry
//! mutation is atomic end-to-end. Grounded on `original_source`'s
//! `process_registry.py` (`register_api_server`, `unregister_api_server`,
//! `migrate_legacy_structure`, `cleanup_process_registry`).

use std::path::{Path, PathBuf};

use hpm_core::{ProcessEntry, ProcessType, RegistryDocument};
use sysinfo::{Pid, System};

use crate::atomic;
use crate::error::StorageError;

pub struct ProcessRegistry {
    path: PathBuf,
}

impl ProcessRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert this PID as the API server. Rejects a PID already registered
    /// under a different type. Sets `primary_api` only if currently unset,
    /// a deliberate divergence from the original's unconditional overwrite.
    pub fn register_api_server(&self, pid: u32, repository: &str, now: u64) -> Result<(), StorageError> {
        let mut system = System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

        let outcome = atomic::update(&self.path, RegistryDocument::default(), |doc| {
            let mut doc = prune_dead_pids(migrate_legacy(doc), &system);
            if check_pid_conflict(&doc, pid, ProcessType::ApiServer) {
                return doc; // conflict handled by re-checking after the transaction
            }
            doc.processes.insert(
                pid.to_string(),
                ProcessEntry {
                    process_type: ProcessType::ApiServer,
                    started: now,
                    repository: repository.to_string(),
                    last_heartbeat: now,
                    client_id: None,
                },
            );
            if doc.primary_api.is_none() {
                doc.primary_api = Some(pid);
            }
            doc
        })?;

        if !matches_type(&outcome, pid, ProcessType::ApiServer) {
            return Err(StorageError::PidConflict { pid });
        }
        Ok(())
    }

    /// Insert this PID as an MCP client. Returns whether the caller should
    /// start its own API server (true iff no API server is registered after
    /// this insertion).
    pub fn register_mcp_client(
        &self,
        pid: u32,
        client_id: &str,
        now: u64,
    ) -> Result<bool, StorageError> {
        let mut system = System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

        let outcome = atomic::update(&self.path, RegistryDocument::default(), |doc| {
            let mut doc = prune_dead_pids(migrate_legacy(doc), &system);
            if check_pid_conflict(&doc, pid, ProcessType::McpClient) {
                return doc;
            }
            doc.processes.insert(
                pid.to_string(),
                ProcessEntry {
                    process_type: ProcessType::McpClient,
                    started: now,
                    repository: String::new(),
                    last_heartbeat: now,
                    client_id: Some(client_id.to_string()),
                },
            );
            doc
        })?;

        if !matches_type(&outcome, pid, ProcessType::McpClient) {
            return Err(StorageError::PidConflict { pid });
        }

        let has_api_server = outcome
            .processes
            .values()
            .any(|e| e.process_type == ProcessType::ApiServer);
        Ok(!has_api_server)
    }

    /// Remove `pid` if it matches `expected_type`. Returns whether the
    /// caller should tear down the API it started (true iff no MCP clients
    /// remain and `expected_type` was `McpClient` and this removal owned the
    /// last reference — callers additionally gate on having started it).
    pub fn unregister(&self, pid: u32, expected_type: ProcessType, now: u64) -> Result<bool, StorageError> {
        let mut system = System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

        let outcome = atomic::update(&self.path, RegistryDocument::default(), |doc| {
            let mut doc = prune_dead_pids(migrate_legacy(doc), &system);
            let key = pid.to_string();
            let removed = doc
                .processes
                .get(&key)
                .map(|e| e.process_type == expected_type)
                .unwrap_or(false);

            if removed {
                doc.processes.remove(&key);
                if doc.primary_api == Some(pid) {
                    doc.primary_api = doc
                        .processes
                        .iter()
                        .find(|(_, e)| e.process_type == ProcessType::ApiServer)
                        .map(|(pid_str, _)| pid_str.parse().unwrap_or(0));
                }
            }
            let _ = now;
            doc
        })?;

        let no_clients_remain = !outcome
            .processes
            .values()
            .any(|e| e.process_type == ProcessType::McpClient);
        Ok(no_clients_remain)
    }

    /// Remove entries whose PID no longer exists on the host; refresh
    /// heartbeats for survivors.
    pub fn prune_stale(&self, now: u64) -> Result<(), StorageError> {
        let mut system = System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

        atomic::update(&self.path, RegistryDocument::default(), |doc| {
            let mut doc = prune_dead_pids(migrate_legacy(doc), &system);
            for entry in doc.processes.values_mut() {
                entry.last_heartbeat = now;
            }
            doc
        })?;
        Ok(())
    }

    /// Read-only snapshot for CLI introspection (`registry status`).
    pub fn snapshot(&self) -> Result<RegistryDocument, StorageError> {
        atomic::update(&self.path, RegistryDocument::default(), migrate_legacy)
    }
}

/// Drops entries whose PID no longer exists on the host and fixes up
/// `primary_api` if it pointed at one of them. Called from every mutating
/// operation so a crashed peer's stale entry never lingers through a
/// subsequent registration.
fn prune_dead_pids(mut doc: RegistryDocument, system: &System) -> RegistryDocument {
    doc.processes.retain(|pid_str, _| {
        pid_str
            .parse::<u32>()
            .map(|pid| system.process(Pid::from_u32(pid)).is_some())
            .unwrap_or(false)
    });
    if let Some(primary) = doc.primary_api {
        let alive_api = doc
            .processes
            .get(&primary.to_string())
            .map(|e| e.process_type == ProcessType::ApiServer)
            .unwrap_or(false);
        if !alive_api {
            doc.primary_api = doc
                .processes
                .iter()
                .find(|(_, e)| e.process_type == ProcessType::ApiServer)
                .map(|(pid_str, _)| pid_str.parse().unwrap_or(0));
        }
    }
    doc
}

fn check_pid_conflict(doc: &RegistryDocument, pid: u32, process_type: ProcessType) -> bool {
    doc.processes
        .get(&pid.to_string())
        .map(|e| e.process_type != process_type)
        .unwrap_or(false)
}

fn matches_type(doc: &RegistryDocument, pid: u32, process_type: ProcessType) -> bool {
    doc.processes
        .get(&pid.to_string())
        .map(|e| e.process_type == process_type)
        .unwrap_or(false)
}

/// Translate the legacy `api_pid`/`clients` shape into the flat `processes`
/// map, preferring the legacy `api_pid` on any collision — mirrors
/// `migrate_legacy_structure` in the original Python.
pub fn migrate_legacy(doc: RegistryDocument) -> RegistryDocument {
    if !doc.needs_migration() {
        return doc;
    }

    let mut migrated = RegistryDocument {
        processes: doc.processes,
        ..Default::default()
    };

    if let Some(api_pid) = doc.api_pid {
        migrated.processes.insert(
            api_pid.to_string(),
            ProcessEntry {
                process_type: ProcessType::ApiServer,
                started: 0,
                repository: String::new(),
                last_heartbeat: 0,
                client_id: None,
            },
        );
        migrated.primary_api = Some(api_pid);
    }

    for (client_id, info) in doc.clients {
        let key = info.pid.to_string();
        if migrated.processes.contains_key(&key) {
            continue; // legacy api_pid wins on collision
        }
        migrated.processes.insert(
            key,
            ProcessEntry {
                process_type: ProcessType::McpClient,
                started: info.timestamp.unwrap_or(0),
                repository: String::new(),
                last_heartbeat: 0,
                client_id: Some(client_id),
            },
        );
    }

    migrated
}

#[cfg(test)]
#[path = "process_registry_tests.rs"]
mod tests;
