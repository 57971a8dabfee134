// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PM client: talks HTTP to the shared project-management service.
//!
//! A blocking `reqwest` client, matching the agent runner's single-threaded
//! synchronous model. Every non-2xx response is
//! surfaced as a typed [`PmError::Status`] rather than leaking `reqwest`
//! types to callers.

use std::time::Duration;

use hpm_core::{AgentId, AgentRole, ConnectionType, DifficultyLevel, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

use crate::error::PmError;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: AgentId,
    pub role: AgentRole,
}

pub struct PmClient {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::blocking::Client,
}

impl PmClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { base_url: base_url.into(), api_key, http }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::blocking::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key);
        }
        req
    }

    /// `GET /health`. Reachable iff the server answers 200; any transport
    /// error or non-2xx is treated as unreachable, never propagated.
    pub fn health(&self) -> bool {
        self.request(reqwest::Method::GET, "/health")
            .timeout(HEALTH_TIMEOUT)
            .send()
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    pub fn register_agent(
        &self,
        agent_id: &AgentId,
        role: AgentRole,
        skill_level: DifficultyLevel,
        connection_type: ConnectionType,
    ) -> Result<AgentRecord, PmError> {
        #[derive(Serialize)]
        struct RegisterRequest<'a> {
            agent_id: &'a str,
            role: AgentRole,
            skill_level: DifficultyLevel,
            connection_type: ConnectionType,
        }

        let resp = self
            .request(reqwest::Method::POST, "/api/v1/register")
            .json(&RegisterRequest {
                agent_id: agent_id.as_str(),
                role,
                skill_level,
                connection_type,
            })
            .send()?;
        into_json(resp)
    }

    /// Long-polls for a task up to the server-side cap (~3 min). `Ok(None)`
    /// means "keep polling", never an error.
    pub fn get_next_task(
        &self,
        role: AgentRole,
        skill_level: DifficultyLevel,
        timeout_secs: u64,
    ) -> Result<Option<Task>, PmError> {
        let resp = self
            .request(reqwest::Method::GET, "/api/v1/tasks/next")
            .query(&[
                ("role", format!("{role:?}")),
                ("level", format!("{skill_level:?}")),
                ("timeout", timeout_secs.to_string()),
            ])
            .timeout(Duration::from_secs(timeout_secs + 10))
            .send()?;

        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let status = resp.status();
        if !status.is_success() {
            return Err(into_status_error(resp));
        }
        let task: Option<Task> = resp.json().map_err(PmError::Transport)?;
        Ok(task)
    }

    /// `GET /api/v1/tasks/{id}`, used by the crash-recovery path to check a
    /// previously-leased task's current status before resuming or releasing.
    pub fn get_task(&self, task_id: &TaskId) -> Result<Task, PmError> {
        let resp = self.request(reqwest::Method::GET, &format!("/api/v1/tasks/{task_id}")).send()?;
        into_json(resp)
    }

    pub fn lock_task(&self, task_id: &TaskId, agent_id: &AgentId) -> Result<(), PmError> {
        #[derive(Serialize)]
        struct LockRequest<'a> {
            agent_id: &'a str,
        }
        let resp = self
            .request(reqwest::Method::POST, &format!("/api/v1/tasks/{task_id}/lock"))
            .json(&LockRequest { agent_id: agent_id.as_str() })
            .send()?;
        expect_success(resp)
    }

    pub fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        agent_id: &AgentId,
        notes: Option<&str>,
    ) -> Result<(), PmError> {
        #[derive(Serialize)]
        struct StatusRequest<'a> {
            status: TaskStatus,
            agent_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            notes: Option<&'a str>,
        }
        let resp = self
            .request(reqwest::Method::PUT, &format!("/api/v1/tasks/{task_id}/status"))
            .json(&StatusRequest { status, agent_id: agent_id.as_str(), notes })
            .send()?;
        expect_success(resp)
    }

    pub fn delete_agent(&self, agent_id: &AgentId) -> Result<(), PmError> {
        let resp = self
            .request(reqwest::Method::DELETE, &format!("/api/v1/agents/{agent_id}"))
            .send()?;
        // Idempotent: a 404 here means the agent is already gone.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(resp)
    }
}

fn expect_success(resp: reqwest::blocking::Response) -> Result<(), PmError> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(into_status_error(resp))
    }
}

fn into_json<T: serde::de::DeserializeOwned>(resp: reqwest::blocking::Response) -> Result<T, PmError> {
    if !resp.status().is_success() {
        return Err(into_status_error(resp));
    }
    resp.json().map_err(PmError::Transport)
}

fn into_status_error(resp: reqwest::blocking::Response) -> PmError {
    let status = resp.status().as_u16();
    let body = resp.text().unwrap_or_default();
    PmError::Status { status, body }
}

#[cfg(test)]
#[path = "pm_client_tests.rs"]
mod tests;
