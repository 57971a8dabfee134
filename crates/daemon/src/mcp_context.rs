// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MCP-context detection.
//!
//! True iff an explicit environment marker is set, or any ancestor process
//! up to three levels up looks like an MCP supervisor. Detection errors
//! default to `true`: failing to determine context is the more conservative
//! outcome since it further restricts the launch-command candidate list to
//! API-only invocations.

use sysinfo::{Pid, System};

const ENV_MARKERS: [&str; 3] = ["HEADLESS_PM_FROM_MCP", "MCP_CLIENT_ID", "_MCP_SERVER_RUNNING"];
const SUPERVISOR_PATTERNS: [&str; 2] = ["mcp.server", "mcp_server"];
const MAX_ANCESTRY_DEPTH: usize = 3;

pub fn detect(lookup: impl Fn(&str) -> Option<String>) -> bool {
    if detect_from_env(&lookup) {
        return true;
    }
    match current_ancestry_cmdlines() {
        Some(cmdlines) => matches_any_ancestor(&cmdlines),
        None => true,
    }
}

fn detect_from_env(lookup: &impl Fn(&str) -> Option<String>) -> bool {
    ENV_MARKERS.iter().any(|key| lookup(key).map(|v| !v.is_empty()).unwrap_or(false))
}

fn matches_any_ancestor(cmdlines: &[String]) -> bool {
    cmdlines.iter().any(|line| SUPERVISOR_PATTERNS.iter().any(|pattern| line.contains(pattern)))
}

/// Walks up to [`MAX_ANCESTRY_DEPTH`] parents starting from the current
/// process, returning each ancestor's joined command line. `None` means the
/// current process itself could not be found, treated as a detection
/// error.
fn current_ancestry_cmdlines() -> Option<Vec<String>> {
    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
    let current_pid = sysinfo::get_current_pid().ok()?;

    let mut cmdlines = Vec::new();
    let mut cursor = current_pid;
    for _ in 0..MAX_ANCESTRY_DEPTH {
        let Some(parent) = system.process(cursor).and_then(|p| p.parent()) else {
            break;
        };
        let Some(parent_proc) = system.process(parent) else {
            break;
        };
        cmdlines.push(joined_cmdline(parent_proc));
        cursor = parent;
    }
    Some(cmdlines)
}

fn joined_cmdline(process: &sysinfo::Process) -> String {
    process
        .cmd()
        .iter()
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Command-line substrings that mark a process as (probably) a PM API
/// server. There is no portable socket-to-PID lookup in std/sysinfo, so this
/// is a heuristic: a live process whose command line mentions both the
/// target port and one of these markers.
const API_SERVER_MARKERS: [&str; 3] = ["headless-pm", "headless_pm", "hpm-cli"];

/// Scans live processes for one whose command line indicates a PM API
/// server bound to `port`, for the "connected-to-existing" branch of
/// auto-start and the PID-reuse check of shutdown. Returns
/// `(pid, process_start_time_secs)`.
pub fn find_api_server_on_port(port: u16) -> Option<(Pid, u64)> {
    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
    let port_token = port.to_string();

    system
        .processes()
        .iter()
        .find(|(_, process)| {
            let cmdline = joined_cmdline(process);
            cmdline.contains(&port_token) && API_SERVER_MARKERS.iter().any(|m| cmdline.contains(m))
        })
        .map(|(pid, process)| (*pid, process.start_time()))
}

/// Re-derives `(pid, start_time)` for a specific PID, used during shutdown
/// to verify a recorded server PID has not been reused by an unrelated
/// process.
pub fn process_identity(pid: u32) -> Option<(u64, String)> {
    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
    system
        .process(Pid::from_u32(pid))
        .map(|process| (process.start_time(), joined_cmdline(process)))
}

#[cfg(test)]
#[path = "mcp_context_tests.rs"]
mod tests;
