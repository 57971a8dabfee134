// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task lock store: per-agent lease files on disk.
//!
//! One file per agent; writes are atomic via tempfile+rename but do not take
//! the cross-process registry lock, since only the owning agent ever writes
//! its own lease file (grounded on `original_source`'s `task_persistence.py`).

use std::fs;
use std::path::{Path, PathBuf};

use hpm_core::{AgentId, TaskLease};

use crate::atomic::update as atomic_update;
use crate::error::StorageError;

pub struct TaskLockStore {
    agent_id: AgentId,
    path: PathBuf,
}

impl TaskLockStore {
    pub fn new(lease_dir: &Path, agent_id: AgentId) -> Self {
        let path = lease_dir.join(format!("agent-{}.lock", agent_id.as_str()));
        Self { agent_id, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock(&self, lease: TaskLease) -> Result<(), StorageError> {
        atomic_update(&self.path, None::<TaskLease>, |_| Some(lease.clone())).map(|_| ())
    }

    /// Load the current lease, if any. A lease file that fails to parse or
    /// belongs to a different agent is treated as "no lease" and removed —
    /// a stale or foreign lock file should never block a fresh start.
    pub fn load(&self) -> Option<TaskLease> {
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice::<TaskLease>(&bytes) {
            Ok(lease) if lease.agent_id == self.agent_id => Some(lease),
            _ => {
                let _ = self.release();
                None
            }
        }
    }

    pub fn update(&self, f: impl FnOnce(TaskLease) -> TaskLease) -> Result<(), StorageError> {
        let Some(current) = self.load() else {
            return Err(StorageError::NoLease);
        };
        atomic_update(&self.path, None::<TaskLease>, |_| Some(f(current.clone()))).map(|_| ())
    }

    pub fn release(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write { path: self.path.clone(), source }),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.path.exists()
    }

    pub fn age_seconds(&self, now: u64) -> Option<u64> {
        self.load().map(|lease| now.saturating_sub(lease.locked_at))
    }
}

#[cfg(test)]
#[path = "lease_store_tests.rs"]
mod tests;
