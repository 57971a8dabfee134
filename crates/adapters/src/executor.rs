// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs the LLM CLI as a subprocess and captures its output.
//!
//! Grounded on `original_source`'s `claude_executor.py`: probe a short list
//! of well-known install paths before falling back to PATH resolution,
//! pipe the instructions file to stdin, and interpret a non-zero exit code
//! (or a timeout) as failure.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use hpm_core::Task;

use crate::error::AdapterError;
use crate::model_mapper;

const CANDIDATE_PATHS: &[&str] = &["~/.claude/bin/claude", "/usr/local/bin/claude"];
const PATH_FALLBACK: &str = "claude";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct ExecutionOutcome {
    pub ok: bool,
    pub message: String,
}

pub trait SubprocessExecutor: Send + Sync {
    fn execute_task(
        &self,
        task: &Task,
        cwd: &Path,
        instructions_path: &Path,
        timeout: Duration,
    ) -> Result<ExecutionOutcome, AdapterError>;

    fn verify_available(&self) -> Result<bool, AdapterError>;
}

pub struct ClaudeExecutor {
    binary: PathBuf,
}

impl ClaudeExecutor {
    pub fn new() -> Self {
        Self { binary: Self::locate_binary() }
    }

    fn locate_binary() -> PathBuf {
        for candidate in CANDIDATE_PATHS {
            let expanded = expand_home(candidate);
            if is_executable_file(&expanded) {
                return expanded;
            }
        }
        PathBuf::from(PATH_FALLBACK)
    }

    /// Runs `command` to completion, killing it if it outruns `timeout`.
    /// Polling rather than blocking lets us observe elapsed time without a
    /// dedicated watchdog thread.
    fn run_with_timeout(
        &self,
        mut command: Command,
        stdin_payload: Option<&str>,
        timeout: Duration,
    ) -> Result<(bool, String), AdapterError> {
        command.stdin(if stdin_payload.is_some() { Stdio::piped() } else { Stdio::null() });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|source| AdapterError::Io { path: self.binary.clone(), source })?;

        if let Some(payload) = stdin_payload {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(payload.as_bytes());
            }
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|source| AdapterError::Io { path: self.binary.clone(), source })?
            {
                let output = child
                    .wait_with_output()
                    .map_err(|source| AdapterError::Io { path: self.binary.clone(), source })?;
                let combined = if !output.stderr.is_empty() {
                    String::from_utf8_lossy(&output.stderr).into_owned()
                } else {
                    String::from_utf8_lossy(&output.stdout).into_owned()
                };
                return Ok((status.success(), combined));
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AdapterError::Timeout { timeout_secs: timeout.as_secs() });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for ClaudeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SubprocessExecutor for ClaudeExecutor {
    fn execute_task(
        &self,
        task: &Task,
        cwd: &Path,
        instructions_path: &Path,
        timeout: Duration,
    ) -> Result<ExecutionOutcome, AdapterError> {
        if !cwd.exists() {
            return Ok(ExecutionOutcome {
                ok: false,
                message: format!("worktree path does not exist: {}", cwd.display()),
            });
        }

        let instructions = match std::fs::read_to_string(instructions_path) {
            Ok(contents) => contents,
            Err(source) => {
                return Err(AdapterError::Io { path: instructions_path.to_path_buf(), source });
            }
        };

        let model = model_mapper::model_for(task.skill_level);
        let model_name = model_mapper::display_name(model);

        let mut command = Command::new(&self.binary);
        command
            .arg("--model")
            .arg(model)
            .arg("--dangerously-skip-permissions")
            .current_dir(cwd);

        match self.run_with_timeout(command, Some(&instructions), timeout) {
            Ok((true, _)) => {
                Ok(ExecutionOutcome { ok: true, message: format!("task completed successfully with {model_name}") })
            }
            Ok((false, output)) => {
                let detail = if output.trim().is_empty() { "unknown error".to_string() } else { output };
                Ok(ExecutionOutcome { ok: false, message: format!("subprocess exited with a failure: {detail}") })
            }
            Err(AdapterError::Timeout { timeout_secs }) => {
                Ok(ExecutionOutcome { ok: false, message: format!("execution timed out after {timeout_secs}s") })
            }
            Err(other) => Err(other),
        }
    }

    fn verify_available(&self) -> Result<bool, AdapterError> {
        let mut command = Command::new(&self.binary);
        command.arg("--version");
        match self.run_with_timeout(command, None, Duration::from_secs(5)) {
            Ok((ok, _)) => Ok(ok),
            Err(AdapterError::Timeout { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Clone)]
    pub struct Recorded {
        pub task_id: String,
        pub cwd: PathBuf,
    }

    /// Records each call instead of spawning a real LLM process; `outcome`
    /// controls what the next `execute_task` call returns.
    pub struct FakeExecutor {
        pub outcome: Mutex<ExecutionOutcome>,
        pub available: Mutex<bool>,
        calls: Mutex<Vec<Recorded>>,
    }

    impl Default for FakeExecutor {
        fn default() -> Self {
            Self {
                outcome: Mutex::new(ExecutionOutcome { ok: true, message: "ok".to_string() }),
                available: Mutex::new(true),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<Recorded> {
            self.calls.lock().clone()
        }
    }

    impl SubprocessExecutor for FakeExecutor {
        fn execute_task(
            &self,
            task: &Task,
            cwd: &Path,
            _instructions_path: &Path,
            _timeout: Duration,
        ) -> Result<ExecutionOutcome, AdapterError> {
            self.calls.lock().push(Recorded { task_id: task.id.to_string(), cwd: cwd.to_path_buf() });
            Ok(self.outcome.lock().clone())
        }

        fn verify_available(&self) -> Result<bool, AdapterError> {
            Ok(*self.available.lock())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeExecutor;

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
