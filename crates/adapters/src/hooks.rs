// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs optional per-repository shell scripts around a task's lifecycle.
//!
//! Grounded on `original_source`'s `hook_runner.py`: hooks live in a
//! directory by logical name, resolved `.py` then `.sh` then extensionless;
//! a missing script is success, not failure. `run_pre_task` gates the task,
//! `run_post_task`/`run_health_check` are advisory only.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::error::AdapterError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const EXTENSIONS: &[&str] = &["py", "sh", ""];

pub struct HookOutcome {
    pub ok: bool,
    pub message: String,
}

pub trait HookRunner: Send + Sync {
    fn run_pre_task(&self, context: &Value) -> Result<HookOutcome, AdapterError>;
    fn run_post_task(&self, context: &Value);
    fn run_health_check(&self) -> HookOutcome;
}

pub struct ScriptHookRunner {
    hooks_dir: PathBuf,
}

impl ScriptHookRunner {
    pub fn new(hooks_dir: impl Into<PathBuf>) -> Result<Self, AdapterError> {
        let hooks_dir = hooks_dir.into();
        std::fs::create_dir_all(&hooks_dir).map_err(|source| AdapterError::Io { path: hooks_dir.clone(), source })?;
        Ok(Self { hooks_dir })
    }

    fn resolve(&self, hook_name: &str) -> Option<PathBuf> {
        for ext in EXTENSIONS {
            let candidate = if ext.is_empty() {
                self.hooks_dir.join(hook_name)
            } else {
                self.hooks_dir.join(format!("{hook_name}.{ext}"))
            };
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn execute(&self, hook_name: &str, data: Option<&Value>) -> Result<HookOutcome, AdapterError> {
        let Some(script) = self.resolve(hook_name) else {
            return Ok(HookOutcome { ok: true, message: format!("no hook found for: {hook_name}") });
        };
        ensure_executable(&script)?;

        let stdin_payload = data.map(|v| v.to_string()).unwrap_or_default();

        let mut command = Command::new(&script);
        command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn().map_err(|source| AdapterError::Io { path: script.clone(), source })?;
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(stdin_payload.as_bytes());
        }

        let deadline = Instant::now() + DEFAULT_TIMEOUT;
        loop {
            if let Some(status) =
                child.try_wait().map_err(|source| AdapterError::Io { path: script.clone(), source })?
            {
                let output =
                    child.wait_with_output().map_err(|source| AdapterError::Io { path: script.clone(), source })?;
                return if status.success() {
                    Ok(HookOutcome { ok: true, message: String::from_utf8_lossy(&output.stdout).trim().to_string() })
                } else {
                    let detail = if !output.stderr.is_empty() {
                        String::from_utf8_lossy(&output.stderr).into_owned()
                    } else if !output.stdout.is_empty() {
                        String::from_utf8_lossy(&output.stdout).into_owned()
                    } else {
                        format!("hook {hook_name} failed with no output")
                    };
                    Ok(HookOutcome { ok: false, message: detail })
                };
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(HookOutcome {
                    ok: false,
                    message: format!("hook {hook_name} timed out after {}s", DEFAULT_TIMEOUT.as_secs()),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl HookRunner for ScriptHookRunner {
    fn run_pre_task(&self, context: &Value) -> Result<HookOutcome, AdapterError> {
        let outcome = self.execute("pre_task", Some(context))?;
        if outcome.ok {
            Ok(HookOutcome { ok: true, message: "pre-task checks passed".to_string() })
        } else {
            Ok(HookOutcome { ok: false, message: format!("pre-task hook failed: {}", outcome.message) })
        }
    }

    fn run_post_task(&self, context: &Value) {
        if let Err(err) = self.execute("post_task", Some(context)) {
            tracing::warn!(error = %err, "post-task hook invocation failed");
        }
    }

    fn run_health_check(&self) -> HookOutcome {
        match self.execute("health_check", None) {
            Ok(outcome) if outcome.ok => HookOutcome { ok: true, message: "system healthy".to_string() },
            Ok(outcome) => HookOutcome { ok: false, message: format!("health check failed: {}", outcome.message) },
            Err(err) => HookOutcome { ok: false, message: format!("health check failed: {err}") },
        }
    }
}

fn ensure_executable(path: &Path) -> Result<(), AdapterError> {
    use std::os::unix::fs::PermissionsExt;
    let meta = std::fs::metadata(path).map_err(|source| AdapterError::Io { path: path.to_path_buf(), source })?;
    if meta.permissions().mode() & 0o111 == 0 {
        let mut perms = meta.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).map_err(|source| AdapterError::Io { path: path.to_path_buf(), source })?;
    }
    Ok(())
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    pub struct FakeHookRunner {
        pub pre_task_outcome: Mutex<Option<(bool, String)>>,
        pub health_outcome: Mutex<Option<(bool, String)>>,
        pub post_task_calls: Mutex<Vec<Value>>,
    }

    impl FakeHookRunner {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl HookRunner for FakeHookRunner {
        fn run_pre_task(&self, _context: &Value) -> Result<HookOutcome, AdapterError> {
            let (ok, message) =
                self.pre_task_outcome.lock().clone().unwrap_or((true, "pre-task checks passed".to_string()));
            Ok(HookOutcome { ok, message })
        }

        fn run_post_task(&self, context: &Value) {
            self.post_task_calls.lock().push(context.clone());
        }

        fn run_health_check(&self) -> HookOutcome {
            let (ok, message) = self.health_outcome.lock().clone().unwrap_or((true, "system healthy".to_string()));
            HookOutcome { ok, message }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeHookRunner;

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
