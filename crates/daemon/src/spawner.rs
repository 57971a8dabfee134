// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process spawning seam for the supervisor.
//!
//! Grounded on the same adapter-trait + fake shape used throughout this
//! tree (`hpm_adapters::executor`): a real spawner that shells out, and a
//! fake for the Supervisor's own tests.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::command_table::ResolvedCommand;
use crate::error::DaemonError;

pub trait SpawnedChild: Send {
    fn pid(&self) -> u32;
    fn try_wait(&mut self) -> std::io::Result<Option<i32>>;
    /// Best-effort stderr drain. Only safe to call once the child has
    /// exited — the pipe will have hit EOF by then.
    fn drain_stderr(&mut self) -> String;
    fn kill(&mut self);
}

pub trait ProcessSpawner {
    fn spawn(
        &self,
        command: &ResolvedCommand,
        dir: Option<&Path>,
        env_set: &[(String, String)],
        env_clear: &[&str],
    ) -> Result<Box<dyn SpawnedChild>, DaemonError>;
}

pub struct StdSpawnedChild {
    child: Child,
}

impl SpawnedChild for StdSpawnedChild {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> std::io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(|status| status.code().unwrap_or(-1)))
    }

    fn drain_stderr(&mut self) -> String {
        let mut buf = String::new();
        if let Some(mut stderr) = self.child.stderr.take() {
            let _ = stderr.read_to_string(&mut buf);
        }
        buf
    }

    fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Shells out via `std::process::Command`. stdout is suppressed (the PM
/// service's own logging goes to stderr, which is retained for diagnostics).
pub struct OsSpawner;

impl ProcessSpawner for OsSpawner {
    fn spawn(
        &self,
        command: &ResolvedCommand,
        dir: Option<&Path>,
        env_set: &[(String, String)],
        env_clear: &[&str],
    ) -> Result<Box<dyn SpawnedChild>, DaemonError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());
        for key in env_clear {
            cmd.env_remove(key);
        }
        for (key, value) in env_set {
            cmd.env(key, value);
        }

        let child = cmd
            .spawn()
            .map_err(|source| DaemonError::Spawn { command: command.program.clone(), source })?;
        Ok(Box::new(StdSpawnedChild { child }))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};

    use parking_lot::Mutex;

    use super::{ProcessSpawner, SpawnedChild};
    use crate::command_table::ResolvedCommand;
    use crate::error::DaemonError;

    /// Scripted lifecycle for a fake spawned child: either it stays alive
    /// until `kill`ed, or it exits immediately with the given code/stderr.
    #[derive(Clone)]
    pub enum ScriptedExit {
        StaysAlive,
        ExitsWith { code: i32, stderr: String },
    }

    pub struct FakeSpawnedChild {
        pid: u32,
        script: ScriptedExit,
        exited: bool,
        killed: bool,
    }

    impl SpawnedChild for FakeSpawnedChild {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn try_wait(&mut self) -> std::io::Result<Option<i32>> {
            match &self.script {
                ScriptedExit::StaysAlive => Ok(None),
                ScriptedExit::ExitsWith { code, .. } => {
                    self.exited = true;
                    Ok(Some(*code))
                }
            }
        }

        fn drain_stderr(&mut self) -> String {
            match &self.script {
                ScriptedExit::ExitsWith { stderr, .. } => stderr.clone(),
                ScriptedExit::StaysAlive => String::new(),
            }
        }

        fn kill(&mut self) {
            self.killed = true;
        }
    }

    pub struct FakeSpawner {
        next_pid: AtomicU32,
        script: Mutex<ScriptedExit>,
        pub spawned: Mutex<Vec<ResolvedCommand>>,
        pub fail_spawn: Mutex<bool>,
    }

    impl FakeSpawner {
        pub fn new(script: ScriptedExit) -> Self {
            Self {
                next_pid: AtomicU32::new(9000),
                script: Mutex::new(script),
                spawned: Mutex::new(Vec::new()),
                fail_spawn: Mutex::new(false),
            }
        }

        pub fn set_script(&self, script: ScriptedExit) {
            *self.script.lock() = script;
        }
    }

    impl ProcessSpawner for FakeSpawner {
        fn spawn(
            &self,
            command: &ResolvedCommand,
            _dir: Option<&Path>,
            _env_set: &[(String, String)],
            _env_clear: &[&str],
        ) -> Result<Box<dyn SpawnedChild>, DaemonError> {
            self.spawned.lock().push(command.clone());
            if *self.fail_spawn.lock() {
                return Err(DaemonError::Spawn {
                    command: command.program.clone(),
                    source: std::io::Error::other("fake spawn failure"),
                });
            }
            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSpawnedChild { pid, script: self.script.lock().clone(), exited: false, killed: false }))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSpawner, ScriptedExit};
