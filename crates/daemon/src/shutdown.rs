// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown coordinator for the shared PM service.
//!
//! Grounded on `original_source`'s `mcp/server.py::stop` and the PID-reuse
//! guard in `_is_process_our_api` (creation-time + command-line check before
//! ever sending a signal).

use std::time::{Duration, Instant};

use hpm_core::{Clock, ProcessType};
use hpm_storage::ProcessRegistry;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid as NixPid;

use crate::error::DaemonError;
use crate::mcp_context;

const CREATION_TIME_TOLERANCE_SECS: u64 = 1;
const GRACE_PERIOD: Duration = Duration::from_secs(5);
const FORCE_KILL_WAIT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What this client believes it owns, captured from the
/// [`crate::supervisor::Ownership::StartedByUs`] branch at start time.
#[derive(Debug, Clone, Copy)]
pub struct OwnedServer {
    pub pid: u32,
    pub started_at_secs: u64,
}

pub trait ProcessTerminator {
    /// True iff the PID is still alive after this call returns.
    fn is_alive(&self, pid: u32) -> bool;
    fn send_term(&self, pid: u32) -> bool;
    fn send_kill(&self, pid: u32) -> bool;
}

/// Re-derives a PID's creation time and command line, for the PID-reuse
/// check. A trait so the check can be tested without a real second process.
pub trait ProcessIdentity {
    fn lookup(&self, pid: u32) -> Option<(u64, String)>;
}

pub struct SysinfoIdentity;

impl ProcessIdentity for SysinfoIdentity {
    fn lookup(&self, pid: u32) -> Option<(u64, String)> {
        mcp_context::process_identity(pid)
    }
}

pub struct SignalTerminator;

impl ProcessTerminator for SignalTerminator {
    fn is_alive(&self, pid: u32) -> bool {
        signal::kill(NixPid::from_raw(pid as i32), None).is_ok()
    }

    fn send_term(&self, pid: u32) -> bool {
        signal::kill(NixPid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
    }

    fn send_kill(&self, pid: u32) -> bool {
        signal::kill(NixPid::from_raw(pid as i32), Signal::SIGKILL).is_ok()
    }
}

pub struct ShutdownCoordinator<C, T, I> {
    registry: ProcessRegistry,
    clock: C,
    terminator: T,
    identity: I,
    grace_period: Duration,
    force_kill_wait: Duration,
}

impl<C, T, I> ShutdownCoordinator<C, T, I>
where
    C: Clock,
    T: ProcessTerminator,
    I: ProcessIdentity,
{
    pub fn new(registry: ProcessRegistry, clock: C, terminator: T, identity: I) -> Self {
        Self { registry, clock, terminator, identity, grace_period: GRACE_PERIOD, force_kill_wait: FORCE_KILL_WAIT }
    }

    /// Overrides the termination timeouts — the real defaults make tests
    /// that exercise the SIGKILL escalation path take seconds for no reason.
    #[cfg(any(test, feature = "test-support"))]
    pub fn with_timeouts(mut self, grace_period: Duration, force_kill_wait: Duration) -> Self {
        self.grace_period = grace_period;
        self.force_kill_wait = force_kill_wait;
        self
    }

    /// `owned_server` is `Some` only when this client's own `ensure()` call
    /// resulted in `Ownership::StartedByUs` — a connected-to-existing client
    /// never tears the server down, no matter how the registry count comes
    /// out.
    pub fn shutdown(&self, owned_server: Option<OwnedServer>) -> Result<(), DaemonError> {
        let now = self.clock.epoch_secs();
        let no_clients_remain = self.registry.unregister(std::process::id(), ProcessType::McpClient, now)?;

        let Some(owned) = owned_server else {
            return Ok(());
        };
        if !no_clients_remain {
            return Ok(());
        }

        if !self.pid_still_identifies_our_server(owned) {
            return Ok(());
        }

        self.terminate_gracefully(owned.pid);
        Ok(())
    }

    fn pid_still_identifies_our_server(&self, owned: OwnedServer) -> bool {
        let Some((current_start, cmdline)) = self.identity.lookup(owned.pid) else {
            tracing::warn!(pid = owned.pid, "owned server PID no longer exists; nothing to terminate");
            return false;
        };
        if current_start.abs_diff(owned.started_at_secs) > CREATION_TIME_TOLERANCE_SECS {
            tracing::warn!(pid = owned.pid, "PID creation time no longer matches; refusing to terminate a possibly-reused PID");
            return false;
        }
        if !looks_like_api_server(&cmdline) {
            tracing::warn!(pid = owned.pid, "PID command line no longer looks like an API server; refusing to terminate");
            return false;
        }
        true
    }

    fn terminate_gracefully(&self, pid: u32) {
        if !self.terminator.send_term(pid) {
            return;
        }
        if !self.wait_while_alive(pid, self.grace_period) {
            return;
        }
        tracing::warn!(pid, "server did not exit after SIGTERM; sending SIGKILL");
        if !self.terminator.send_kill(pid) {
            return;
        }
        if self.wait_while_alive(pid, self.force_kill_wait) {
            tracing::error!(pid, "server still alive after SIGKILL; giving up");
        }
    }

    /// Returns true if the process is still alive once the deadline passes.
    fn wait_while_alive(&self, pid: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if !self.terminator.is_alive(pid) {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        self.terminator.is_alive(pid)
    }
}

const API_SERVER_MARKERS: [&str; 3] = ["headless-pm", "headless_pm", "uvicorn"];

fn looks_like_api_server(cmdline: &str) -> bool {
    API_SERVER_MARKERS.iter().any(|marker| cmdline.contains(marker))
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use std::collections::{BTreeMap, BTreeSet};

    use parking_lot::Mutex;

    use super::{ProcessIdentity, ProcessTerminator};

    pub struct FakeIdentity {
        known: Mutex<BTreeMap<u32, (u64, String)>>,
    }

    impl FakeIdentity {
        pub fn new() -> Self {
            Self { known: Mutex::new(BTreeMap::new()) }
        }

        pub fn set(&self, pid: u32, started_at_secs: u64, cmdline: impl Into<String>) {
            self.known.lock().insert(pid, (started_at_secs, cmdline.into()));
        }
    }

    impl Default for FakeIdentity {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ProcessIdentity for FakeIdentity {
        fn lookup(&self, pid: u32) -> Option<(u64, String)> {
            self.known.lock().get(&pid).cloned()
        }
    }

    /// A scripted set of PIDs considered alive, with call logs for
    /// assertions. `send_term`/`send_kill` remove the PID after `dies_after`
    /// signals to simulate a process that takes one extra signal to die.
    pub struct FakeTerminator {
        alive: Mutex<BTreeSet<u32>>,
        dies_on_term: Mutex<BTreeSet<u32>>,
        pub term_calls: Mutex<Vec<u32>>,
        pub kill_calls: Mutex<Vec<u32>>,
    }

    impl FakeTerminator {
        pub fn new(alive_pids: &[u32]) -> Self {
            Self {
                alive: Mutex::new(alive_pids.iter().copied().collect()),
                dies_on_term: Mutex::new(BTreeSet::new()),
                term_calls: Mutex::new(Vec::new()),
                kill_calls: Mutex::new(Vec::new()),
            }
        }

        /// Marks a PID as one that exits cleanly once SIGTERM is sent,
        /// rather than needing the SIGKILL escalation.
        pub fn dies_on_term(&self, pid: u32) {
            self.dies_on_term.lock().insert(pid);
        }

        pub fn is_tracked_alive(&self, pid: u32) -> bool {
            self.alive.lock().contains(&pid)
        }
    }

    impl ProcessTerminator for FakeTerminator {
        fn is_alive(&self, pid: u32) -> bool {
            self.alive.lock().contains(&pid)
        }

        fn send_term(&self, pid: u32) -> bool {
            self.term_calls.lock().push(pid);
            if self.dies_on_term.lock().contains(&pid) {
                self.alive.lock().remove(&pid);
            }
            true
        }

        fn send_kill(&self, pid: u32) -> bool {
            self.kill_calls.lock().push(pid);
            self.alive.lock().remove(&pid);
            true
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeIdentity, FakeTerminator};

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
