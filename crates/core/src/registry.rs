// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process registry document shape.
//!
//! This module only holds the data; the atomic read-modify-write algorithm
//! and the typed operations that mutate it live in `hpm-storage`, which is
//! the only crate allowed to open the registry file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    ApiServer,
    McpClient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEntry {
    #[serde(rename = "type")]
    pub process_type: ProcessType,
    pub started: u64,
    pub repository: String,
    pub last_heartbeat: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Sliding window of startup-attempt timestamps for one port.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub attempts: Vec<u64>,
}

/// The flat, PID-keyed coordination document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub processes: BTreeMap<String, ProcessEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_api: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rate_limits: BTreeMap<String, RateLimitWindow>,

    /// Legacy single-API-server PID, read during migration by
    /// `migrate_legacy`, never written by this implementation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_pid: Option<u32>,
    /// Legacy client map, read during migration only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub clients: BTreeMap<String, LegacyClientEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyClientEntry {
    pub pid: u32,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl RegistryDocument {
    /// True if the legacy shape (either field present) needs migrating.
    pub fn needs_migration(&self) -> bool {
        self.api_pid.is_some() || !self.clients.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty() && self.primary_api.is_none() && !self.needs_migration()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
