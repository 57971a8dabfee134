// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runner: the per-agent task loop.
//!
//! Grounded on `original_source`'s `advanced_agent_runner.py`: recover a
//! locked task before polling for new work, gate pre-task hook failures
//! behind an operator decision, tolerate worktree failure by falling back
//! to the repository root, and keep the lease on any subprocess failure so
//! the same task is retried on the next tick.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hpm_core::{
    AgentId, AgentRole, Clock, ConnectionType, DifficultyLevel, Task, TaskComplexity, TaskLease, TaskStatus,
};
use hpm_storage::TaskLockStore;
use serde_json::json;

use hpm_adapters::{HookRunner, SubprocessExecutor, WorktreeManager};

use crate::error::EngineError;
use crate::operator_gate::{GateDecision, OperatorGate};
use crate::pm_backend::PmBackend;

pub struct RunnerConfig {
    pub agent_id: AgentId,
    pub role: AgentRole,
    pub skill_level: DifficultyLevel,
    pub repository: PathBuf,
    pub base_branch: String,
    pub instructions_path: PathBuf,
    pub claude_timeout: Duration,
    pub health_check_interval: Duration,
    pub task_check_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    ExecutedSuccess,
    ExecutedFailure,
    Released,
}

pub struct AgentRunner<C, PM, W, E, H, G> {
    config: RunnerConfig,
    clock: C,
    pm: PM,
    lease_store: TaskLockStore,
    worktree: W,
    executor: E,
    hooks: H,
    gate: G,
}

impl<C, PM, W, E, H, G> AgentRunner<C, PM, W, E, H, G>
where
    C: Clock,
    PM: PmBackend,
    W: WorktreeManager,
    E: SubprocessExecutor,
    H: HookRunner,
    G: OperatorGate,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RunnerConfig,
        clock: C,
        pm: PM,
        lease_store: TaskLockStore,
        worktree: W,
        executor: E,
        hooks: H,
        gate: G,
    ) -> Self {
        Self { config, clock, pm, lease_store, worktree, executor, hooks, gate }
    }

    pub fn register(&self) -> Result<(), EngineError> {
        self.pm.register_agent(&self.config.agent_id, self.config.role, self.config.skill_level, ConnectionType::Client)?;
        Ok(())
    }

    /// Crash-recovery invariant: a lease surviving a
    /// restart is re-validated against the PM service's current status
    /// before being treated as live work again.
    pub fn recover_lease(&self) -> Result<Option<Task>, EngineError> {
        let Some(lease) = self.lease_store.load() else {
            return Ok(None);
        };
        let task = match self.pm.get_task(&lease.task_id) {
            Ok(task) => task,
            Err(err) => {
                tracing::warn!(task_id = %lease.task_id, error = %err, "could not refresh leased task; releasing");
                self.lease_store.release()?;
                return Ok(None);
            }
        };
        if task.status.is_terminal() {
            self.lease_store.release()?;
            return Ok(None);
        }
        Ok(Some(task))
    }

    /// Polls the PM service for fresh work; on receipt, immediately records
    /// a local lease so the task survives a crash before it is PM-locked.
    pub fn poll_for_task(&self) -> Result<Option<Task>, EngineError> {
        let Some(task) = self.pm.get_next_task(self.config.role, self.config.skill_level, 180)? else {
            return Ok(None);
        };
        let lease = TaskLease::new(
            task.id.clone(),
            task.title.clone(),
            self.config.agent_id.clone(),
            self.clock.epoch_secs(),
            json!({
                "id": task.id.as_str(),
                "title": task.title,
                "skill_level": task.skill_level,
                "complexity": task.complexity,
                "status": task.status,
            }),
        );
        self.lease_store.lock(lease)?;
        Ok(Some(task))
    }

    fn hook_context(task: &Task) -> serde_json::Value {
        json!({
            "task_id": task.id.as_str(),
            "task_title": task.title,
            "skill_level": task.skill_level,
            "complexity": task.complexity,
            "status": task.status,
        })
    }

    /// Runs the pre-task hook, routing a failure through the operator gate
    /// until it resolves to proceed (`Ok(true)`) or release (`Ok(false)`).
    fn clear_pre_task_gate(&self, task: &Task) -> Result<bool, EngineError> {
        let context = Self::hook_context(task);
        loop {
            let outcome = self.hooks.run_pre_task(&context)?;
            if outcome.ok {
                return Ok(true);
            }
            match self.gate.decide(&outcome.message) {
                GateDecision::Retry => continue,
                GateDecision::Skip => return Ok(true),
                GateDecision::Release => return Ok(false),
            }
        }
    }

    fn provision_worktree(&self, task: &Task) -> PathBuf {
        if task.complexity != TaskComplexity::Major {
            return self.config.repository.clone();
        }
        let branch = match self.worktree.create_branch_for_task(&task.id, &self.config.base_branch) {
            Ok(branch) => branch,
            Err(err) => {
                tracing::warn!(task_id = %task.id, error = %err, "worktree branch creation failed; using repository root");
                return self.config.repository.clone();
            }
        };
        match self.worktree.create_for_task(&task.id, &branch) {
            Ok(path) => {
                if let Err(err) = self.lease_store.update(|mut lease| {
                    lease.worktree_path = Some(path.to_string_lossy().into_owned());
                    lease.branch_name = Some(branch.clone());
                    lease
                }) {
                    tracing::warn!(task_id = %task.id, error = %err, "failed to annotate lease with worktree path");
                }
                path
            }
            Err(err) => {
                tracing::warn!(task_id = %task.id, error = %err, "worktree creation failed; using repository root");
                self.config.repository.clone()
            }
        }
    }

    /// Runs one task end to end. Returns `Released` when the task was
    /// abandoned (lock conflict, operator release), `ExecutedSuccess` or
    /// `ExecutedFailure` once the subprocess has run.
    pub fn execute_task(&self, task: Task) -> Result<TickOutcome, EngineError> {
        if !self.clear_pre_task_gate(&task)? {
            self.lease_store.release()?;
            return Ok(TickOutcome::Released);
        }

        if let Err(err) = self.pm.lock_task(&task.id, &self.config.agent_id) {
            tracing::error!(task_id = %task.id, error = %err, "failed to lock task in PM service");
            self.lease_store.release()?;
            return Ok(TickOutcome::Released);
        }

        let used_worktree = task.complexity == TaskComplexity::Major;
        let cwd = self.provision_worktree(&task);

        let outcome = self.executor.execute_task(&task, &cwd, &self.config.instructions_path, self.config.claude_timeout)?;

        let post_context = json!({
            "task_id": task.id.as_str(),
            "task_title": task.title,
            "success": outcome.ok,
        });
        self.hooks.run_post_task(&post_context);

        if outcome.ok {
            let status = self.config.role.completion_status();
            if let Err(err) = self.pm.update_task_status(&task.id, status, &self.config.agent_id) {
                tracing::error!(task_id = %task.id, error = %err, "failed to update task status");
            }
            if used_worktree {
                if let Err(err) = self.worktree.cleanup(&task.id) {
                    tracing::warn!(task_id = %task.id, error = %err, "worktree cleanup failed");
                }
            }
            self.lease_store.release()?;
            Ok(TickOutcome::ExecutedSuccess)
        } else {
            tracing::error!(task_id = %task.id, message = %outcome.message, "task execution failed; lease retained for retry");
            Ok(TickOutcome::ExecutedFailure)
        }
    }

    /// One pass of the Idle state: recover a crashed-over lease first, else
    /// poll for new work. Returns `Idle` when there was nothing to do.
    pub fn tick(&self) -> Result<TickOutcome, EngineError> {
        if let Some(task) = self.recover_lease()? {
            return self.execute_task(task);
        }
        if let Some(task) = self.poll_for_task()? {
            return self.execute_task(task);
        }
        Ok(TickOutcome::Idle)
    }

    pub fn run_health_check(&self) -> bool {
        let outcome = self.hooks.run_health_check();
        if outcome.ok {
            tracing::info!(message = %outcome.message, "health check passed");
        } else {
            tracing::warn!(message = %outcome.message, "health check failed");
        }
        outcome.ok
    }

    /// Graceful shutdown: release any held lease, then
    /// best-effort unregister from the PM service.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        if self.lease_store.is_locked() {
            self.lease_store.release()?;
        }
        if let Err(err) = self.pm.delete_agent(&self.config.agent_id) {
            tracing::warn!(error = %err, "failed to unregister agent during shutdown");
        }
        Ok(())
    }

    pub fn task_check_interval(&self) -> Duration {
        self.config.task_check_interval
    }

    pub fn health_check_interval(&self) -> Duration {
        self.config.health_check_interval
    }

    pub fn lease_path(&self) -> &Path {
        self.lease_store.path()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
