// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin seam over [`hpm_net::PmClient`] so the runner can be driven by a
//! fake in tests without a live PM service.

use hpm_core::{AgentId, AgentRole, ConnectionType, DifficultyLevel, Task, TaskId, TaskStatus};
use hpm_net::{AgentRecord, PmClient, PmError};

pub trait PmBackend: Send + Sync {
    fn register_agent(
        &self,
        agent_id: &AgentId,
        role: AgentRole,
        skill_level: DifficultyLevel,
        connection_type: ConnectionType,
    ) -> Result<AgentRecord, PmError>;

    fn get_next_task(
        &self,
        role: AgentRole,
        skill_level: DifficultyLevel,
        timeout_secs: u64,
    ) -> Result<Option<Task>, PmError>;

    fn get_task(&self, task_id: &TaskId) -> Result<Task, PmError>;
    fn lock_task(&self, task_id: &TaskId, agent_id: &AgentId) -> Result<(), PmError>;
    fn update_task_status(&self, task_id: &TaskId, status: TaskStatus, agent_id: &AgentId) -> Result<(), PmError>;
    fn delete_agent(&self, agent_id: &AgentId) -> Result<(), PmError>;
}

impl PmBackend for PmClient {
    fn register_agent(
        &self,
        agent_id: &AgentId,
        role: AgentRole,
        skill_level: DifficultyLevel,
        connection_type: ConnectionType,
    ) -> Result<AgentRecord, PmError> {
        PmClient::register_agent(self, agent_id, role, skill_level, connection_type)
    }

    fn get_next_task(
        &self,
        role: AgentRole,
        skill_level: DifficultyLevel,
        timeout_secs: u64,
    ) -> Result<Option<Task>, PmError> {
        PmClient::get_next_task(self, role, skill_level, timeout_secs)
    }

    fn get_task(&self, task_id: &TaskId) -> Result<Task, PmError> {
        PmClient::get_task(self, task_id)
    }

    fn lock_task(&self, task_id: &TaskId, agent_id: &AgentId) -> Result<(), PmError> {
        PmClient::lock_task(self, task_id, agent_id)
    }

    fn update_task_status(&self, task_id: &TaskId, status: TaskStatus, agent_id: &AgentId) -> Result<(), PmError> {
        PmClient::update_task_status(self, task_id, status, agent_id, None)
    }

    fn delete_agent(&self, agent_id: &AgentId) -> Result<(), PmError> {
        PmClient::delete_agent(self, agent_id)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct FakePmBackend {
        pub pending_tasks: Mutex<VecDeque<Task>>,
        pub tasks_by_id: Mutex<std::collections::BTreeMap<String, Task>>,
        pub lock_should_fail: Mutex<bool>,
        pub status_updates: Mutex<Vec<(String, TaskStatus)>>,
        pub deleted_agents: Mutex<Vec<String>>,
    }

    impl FakePmBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_task(&self, task: Task) {
            self.tasks_by_id.lock().insert(task.id.to_string(), task.clone());
            self.pending_tasks.lock().push_back(task);
        }
    }

    impl PmBackend for FakePmBackend {
        fn register_agent(
            &self,
            agent_id: &AgentId,
            role: AgentRole,
            _skill_level: DifficultyLevel,
            _connection_type: ConnectionType,
        ) -> Result<AgentRecord, PmError> {
            Ok(AgentRecord { agent_id: agent_id.clone(), role })
        }

        fn get_next_task(
            &self,
            _role: AgentRole,
            _skill_level: DifficultyLevel,
            _timeout_secs: u64,
        ) -> Result<Option<Task>, PmError> {
            Ok(self.pending_tasks.lock().pop_front())
        }

        fn get_task(&self, task_id: &TaskId) -> Result<Task, PmError> {
            self.tasks_by_id
                .lock()
                .get(task_id.as_str())
                .cloned()
                .ok_or_else(|| PmError::Status { status: 404, body: "not found".to_string() })
        }

        fn lock_task(&self, _task_id: &TaskId, _agent_id: &AgentId) -> Result<(), PmError> {
            if *self.lock_should_fail.lock() {
                return Err(PmError::Status { status: 409, body: "already locked".to_string() });
            }
            Ok(())
        }

        fn update_task_status(&self, task_id: &TaskId, status: TaskStatus, _agent_id: &AgentId) -> Result<(), PmError> {
            self.status_updates.lock().push((task_id.to_string(), status));
            Ok(())
        }

        fn delete_agent(&self, agent_id: &AgentId) -> Result<(), PmError> {
            self.deleted_agents.lock().push(agent_id.to_string());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePmBackend;
