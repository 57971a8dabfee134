// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hpm agent run` — wires the real lease store, PM client, worktree
//! manager, executor, and hook runner behind the agent runner and drives
//! its loop to completion or shutdown.
//!
//! Grounded on `original_source`'s `advanced_agent_runner.py::run_continuous`
//! and its `_signal_handler`: a single-threaded loop that recovers or polls,
//! runs an advisory health check on an interval, and treats `SIGINT`/`SIGTERM`
//! as a flag observed between iterations rather than an abrupt exit.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};

use hpm_adapters::{ClaudeExecutor, GitWorktreeManager, ScriptHookRunner, SubprocessExecutor};
use hpm_core::{AgentId, AgentRole, Config, DifficultyLevel, SystemClock};
use hpm_engine::{AgentRunner, RunnerConfig, RetryOnceThenRelease, TickOutcome};
use hpm_net::PmClient;
use hpm_storage::TaskLockStore;

use crate::exit_error::ExitError;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(clap::Subcommand)]
pub enum AgentCommand {
    /// Run the continuous agent loop until signalled to stop
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Agent role
    #[arg(long, value_enum)]
    pub role: RoleArg,
    /// Skill level used for task matching and the model-mapping table
    #[arg(long = "skill-level", value_enum)]
    pub skill_level: SkillArg,
    /// Stable agent identifier; defaults to `<role>-<pid>`
    #[arg(long = "agent-id")]
    pub agent_id: Option<String>,
    /// Repository root the runner operates from (defaults to the cwd)
    #[arg(long)]
    pub repository: Option<PathBuf>,
    /// Base branch new task worktrees/branches are created from
    #[arg(long = "base-branch", default_value = "main")]
    pub base_branch: String,
    /// Directory of per-role instructions files (`<role>.md`)
    #[arg(long = "instructions-dir", default_value = "agent_instructions")]
    pub instructions_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RoleArg {
    FrontendDev,
    BackendDev,
    Qa,
    Architect,
    Pm,
}

impl From<RoleArg> for AgentRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::FrontendDev => AgentRole::FrontendDev,
            RoleArg::BackendDev => AgentRole::BackendDev,
            RoleArg::Qa => AgentRole::Qa,
            RoleArg::Architect => AgentRole::Architect,
            RoleArg::Pm => AgentRole::Pm,
        }
    }
}

impl RoleArg {
    fn as_file_stem(self) -> &'static str {
        match self {
            RoleArg::FrontendDev => "frontend_dev",
            RoleArg::BackendDev => "backend_dev",
            RoleArg::Qa => "qa",
            RoleArg::Architect => "architect",
            RoleArg::Pm => "pm",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SkillArg {
    Junior,
    Senior,
    Principal,
}

impl From<SkillArg> for DifficultyLevel {
    fn from(value: SkillArg) -> Self {
        match value {
            SkillArg::Junior => DifficultyLevel::Junior,
            SkillArg::Senior => DifficultyLevel::Senior,
            SkillArg::Principal => DifficultyLevel::Principal,
        }
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = Config::from_env();
    config.validate().map_err(|e| ExitError::new(1, e.to_string()))?;

    let executor = ClaudeExecutor::new();
    if !executor.verify_available().unwrap_or(false) {
        return Err(ExitError::new(1, "LLM binary not found or not runnable (--version probe failed)").into());
    }

    let repository = match args.repository {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(|e| anyhow!("cannot determine current directory: {e}"))?,
    };
    let instructions_path = args.instructions_dir.join(format!("{}.md", args.role.as_file_stem()));
    if !instructions_path.is_file() {
        return Err(ExitError::new(
            1,
            format!("no instructions file for role '{}' at {}", args.role.as_file_stem(), instructions_path.display()),
        )
        .into());
    }

    let agent_id = AgentId::new(args.agent_id.unwrap_or_else(|| format!("{}-{}", args.role.as_file_stem(), std::process::id())));
    let agent_id_display = agent_id.to_string();

    let runner_config = RunnerConfig {
        agent_id: agent_id.clone(),
        role: args.role.into(),
        skill_level: args.skill_level.into(),
        repository: repository.clone(),
        base_branch: args.base_branch,
        instructions_path,
        claude_timeout: Duration::from_secs(config.claude_timeout_secs),
        health_check_interval: Duration::from_secs(config.health_check_interval_secs),
        task_check_interval: Duration::from_secs(config.task_check_interval_secs),
    };

    let clock = SystemClock;
    let pm = PmClient::new(config.base_url.clone(), config.api_key.clone());
    let lease_store = TaskLockStore::new(&config.lease_dir(), agent_id);
    let worktree = GitWorktreeManager::new(repository.clone());
    let hooks_dir = repository.join(".headless-pm").join("hooks");
    let hooks = ScriptHookRunner::new(hooks_dir)?;
    let gate = RetryOnceThenRelease::new();

    let runner = AgentRunner::new(runner_config, clock, pm, lease_store, worktree, executor, hooks, gate);

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown_flag.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .map_err(|e| anyhow!("failed to install signal handler: {e}"))?;
    }

    runner.register()?;
    tracing::info!(agent_id = %agent_id_display, "agent registered");

    let mut last_health_check = Instant::now();
    while !shutdown_flag.load(Ordering::SeqCst) {
        match runner.tick() {
            Ok(TickOutcome::Idle) => sleep_interruptible(runner.task_check_interval(), &shutdown_flag),
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, "tick failed; continuing"),
        }

        if last_health_check.elapsed() >= runner.health_check_interval() {
            runner.run_health_check();
            last_health_check = Instant::now();
        }
    }

    runner.shutdown()?;
    Err(ExitError::new(130, "interrupted").into())
}

/// Sleeps in short increments so a pending shutdown signal is observed
/// promptly instead of only between full-length idle backoffs.
fn sleep_interruptible(total: Duration, shutdown_flag: &AtomicBool) {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if shutdown_flag.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
