// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch-command discovery for auto-starting the PM service.
//!
//! Grounded on `original_source`'s `_find_headless_pm_command`: the
//! candidate list itself is the data table below, not branching code, so
//! adding a way to launch the PM service never touches the discovery
//! algorithm. `{port}` in an arg is substituted with the resolved service
//! port before the candidate is probed.

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct CommandTemplate {
    pub program: &'static str,
    pub args: &'static [&'static str],
    /// True iff this invocation only ever starts the API server, never a
    /// command that could itself spawn another supervisor.
    pub api_only: bool,
}

/// Priority order mirrors the original: port-aware `uvicorn`/`headless-pm`
/// invocations first, then the bare entry points, then module/`uv` fallbacks.
pub const CANDIDATES: &[CommandTemplate] = &[
    CommandTemplate { program: "uvicorn", args: &["src.main:app", "--host", "0.0.0.0", "--port", "{port}"], api_only: true },
    CommandTemplate { program: "headless-pm", args: &["--port", "{port}"], api_only: true },
    CommandTemplate { program: "headless-pm", args: &[], api_only: false },
    CommandTemplate { program: "headless-pm-mcp", args: &[], api_only: false },
    CommandTemplate { program: "uv", args: &["run", "headless-pm"], api_only: false },
    CommandTemplate { program: "python3", args: &["-m", "headless_pm"], api_only: false },
    CommandTemplate { program: "python", args: &["-m", "headless_pm"], api_only: false },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub api_only: bool,
}

pub trait CommandProbe {
    /// Cheap existence check for `program` — a `--help` probe, not a full
    /// dry run.
    fn probe(&self, program: &str) -> bool;
}

/// Spawns `<program> --help` with a short timeout. A process that exists
/// but hangs on `--help` still counts as found — we only care that the
/// binary is resolvable, not that it behaves.
pub struct SpawnProbe;

impl CommandProbe for SpawnProbe {
    fn probe(&self, program: &str) -> bool {
        let mut child = match Command::new(program)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(_) => return false,
        };

        let deadline = Instant::now() + PROBE_TIMEOUT;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => return true,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return true;
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(_) => return false,
            }
        }
    }
}

/// Resolves the launch command to run. `HEADLESS_PM_COMMAND`, when set,
/// bypasses the candidate table entirely. Otherwise the table is filtered to
/// `api_only` entries when `in_mcp_context` and the first candidate whose
/// program probes successfully wins.
pub fn discover(
    command_override: Option<&str>,
    in_mcp_context: bool,
    port: u16,
    probe: &impl CommandProbe,
) -> Option<ResolvedCommand> {
    if let Some(raw) = command_override {
        let mut parts = raw.split_whitespace();
        let program = parts.next()?.to_string();
        let args = parts.map(str::to_string).collect();
        return Some(ResolvedCommand { program, args, api_only: false });
    }

    CANDIDATES
        .iter()
        .filter(|candidate| !in_mcp_context || candidate.api_only)
        .map(|candidate| substitute(candidate, port))
        .find(|resolved| probe.probe(&resolved.program))
}

fn substitute(template: &CommandTemplate, port: u16) -> ResolvedCommand {
    let args = template
        .args
        .iter()
        .map(|arg| if *arg == "{port}" { port.to_string() } else { (*arg).to_string() })
        .collect();
    ResolvedCommand { program: template.program.to_string(), args, api_only: template.api_only }
}

#[cfg(test)]
#[path = "command_table_tests.rs"]
mod tests;
