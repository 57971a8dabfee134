// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and agent-classification types consumed from the PM service.
//!
//! These mirror the PM service's own enums; the core is opaque to anything
//! beyond what it reads.

use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// Remote task status, widest-to-narrowest in the pipeline a task flows
/// through. `Pending` sorts first: it exists on the wire but is never
/// pickup-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Created,
    UnderWork,
    DevDone,
    Testing,
    QaDone,
    DocumentationDone,
    Committed,
    /// Deprecated upstream, still accepted for round-tripping.
    Evaluation,
    /// Deprecated upstream, still accepted for round-tripping.
    Approved,
}

impl TaskStatus {
    /// True for any status the runner should no longer hold a lease over.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Committed | TaskStatus::Evaluation | TaskStatus::Approved
        )
    }

    /// True for a status the poller may hand out as fresh work.
    pub fn is_pickup_eligible(self) -> bool {
        !matches!(self, TaskStatus::Pending) && !self.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    FrontendDev,
    BackendDev,
    Qa,
    Architect,
    Pm,
}

impl AgentRole {
    /// The status this role writes when it finishes a task.
    pub fn completion_status(self) -> TaskStatus {
        match self {
            AgentRole::FrontendDev | AgentRole::BackendDev => TaskStatus::DevDone,
            AgentRole::Qa | AgentRole::Architect | AgentRole::Pm => TaskStatus::Committed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Junior,
    Senior,
    Principal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskComplexity {
    Minor,
    Major,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Mcp,
    Client,
}

/// A task as handed back by the PM service. Extra remote fields are dropped
/// silently; the core only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub complexity: TaskComplexity,
    pub skill_level: DifficultyLevel,
    pub role: AgentRole,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
