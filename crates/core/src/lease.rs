// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent task lease file shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{AgentId, TaskId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLease {
    pub task_id: TaskId,
    pub task_title: String,
    pub agent_id: AgentId,
    /// Epoch seconds the lease was created.
    pub locked_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Full task payload as received from the PM service, kept for recovery
    /// so a restart can resume without a round-trip before the first action.
    pub task_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
}

impl TaskLease {
    pub fn new(
        task_id: TaskId,
        task_title: String,
        agent_id: AgentId,
        locked_at: u64,
        task_data: Value,
    ) -> Self {
        Self {
            task_id,
            task_title,
            agent_id,
            locked_at,
            worktree_path: None,
            branch_name: None,
            task_data,
            updated_at: None,
        }
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
