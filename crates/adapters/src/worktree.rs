// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Creates and cleans up per-task git worktrees and branches.
//!
//! Grounded on `original_source`'s `git_worktree.py`: branch/worktree names
//! are `task-<id>`, worktrees live under `<repo>/.worktrees/`, and cleanup
//! retries with `--force` if the plain removal fails.

use std::path::{Path, PathBuf};
use std::process::Command;

use hpm_core::TaskId;

use crate::error::AdapterError;

pub trait WorktreeManager: Send + Sync {
    fn create_branch_for_task(&self, task_id: &TaskId, base_branch: &str) -> Result<String, AdapterError>;
    fn create_for_task(&self, task_id: &TaskId, branch: &str) -> Result<PathBuf, AdapterError>;
    fn cleanup(&self, task_id: &TaskId) -> Result<(), AdapterError>;
    fn is_clean(&self, path: &Path) -> Result<bool, AdapterError>;
    fn worktree_path(&self, task_id: &TaskId) -> PathBuf;
}

pub struct GitWorktreeManager {
    base_path: PathBuf,
}

impl GitWorktreeManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    fn worktrees_dir(&self) -> PathBuf {
        self.base_path.join(".worktrees")
    }

    fn run_git(&self, cwd: &Path, args: &[&str]) -> Result<String, AdapterError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|source| AdapterError::Io { path: cwd.to_path_buf(), source })?;
        if !output.status.success() {
            return Err(AdapterError::GitCommand {
                cwd: cwd.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl WorktreeManager for GitWorktreeManager {
    fn create_branch_for_task(&self, task_id: &TaskId, base_branch: &str) -> Result<String, AdapterError> {
        let branch_name = format!("task-{task_id}");
        let output = Command::new("git")
            .args(["branch", "--list", &branch_name])
            .current_dir(&self.base_path)
            .output()
            .map_err(|source| AdapterError::Io { path: self.base_path.clone(), source })?;
        if !String::from_utf8_lossy(&output.stdout).trim().is_empty() {
            return Ok(branch_name);
        }
        self.run_git(&self.base_path, &["branch", &branch_name, base_branch])?;
        Ok(branch_name)
    }

    fn create_for_task(&self, task_id: &TaskId, branch: &str) -> Result<PathBuf, AdapterError> {
        std::fs::create_dir_all(self.worktrees_dir())
            .map_err(|source| AdapterError::Io { path: self.worktrees_dir(), source })?;
        let path = self.worktree_path(task_id);
        if path.exists() {
            self.cleanup(task_id)?;
        }
        let path_str = path.to_string_lossy().into_owned();
        self.run_git(&self.base_path, &["worktree", "add", &path_str, branch])?;
        Ok(path)
    }

    fn cleanup(&self, task_id: &TaskId) -> Result<(), AdapterError> {
        let path = self.worktree_path(task_id);
        if !path.exists() {
            return Ok(());
        }
        let path_str = path.to_string_lossy().into_owned();
        if self.run_git(&self.base_path, &["worktree", "remove", &path_str]).is_err() {
            self.run_git(&self.base_path, &["worktree", "remove", "--force", &path_str])?;
        }
        Ok(())
    }

    fn is_clean(&self, path: &Path) -> Result<bool, AdapterError> {
        let output = self.run_git(path, &["status", "--porcelain"])?;
        Ok(output.trim().is_empty())
    }

    fn worktree_path(&self, task_id: &TaskId) -> PathBuf {
        self.worktrees_dir().join(format!("task-{task_id}"))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;

    /// In-memory worktree manager: never shells out to `git`. Tracks which
    /// task ids have a "worktree" so `hpm-engine` tests can exercise the
    /// runner without a real repository.
    #[derive(Default)]
    pub struct FakeWorktreeManager {
        base: PathBuf,
        active: Mutex<BTreeSet<String>>,
        pub fail_create: Mutex<bool>,
    }

    impl FakeWorktreeManager {
        pub fn new(base: impl Into<PathBuf>) -> Self {
            Self { base: base.into(), active: Mutex::new(BTreeSet::new()), fail_create: Mutex::new(false) }
        }
    }

    impl WorktreeManager for FakeWorktreeManager {
        fn create_branch_for_task(&self, task_id: &TaskId, _base_branch: &str) -> Result<String, AdapterError> {
            Ok(format!("task-{task_id}"))
        }

        fn create_for_task(&self, task_id: &TaskId, _branch: &str) -> Result<PathBuf, AdapterError> {
            if *self.fail_create.lock() {
                return Err(AdapterError::GitCommand {
                    cwd: self.base.clone(),
                    stderr: "simulated failure".into(),
                });
            }
            self.active.lock().insert(task_id.to_string());
            Ok(self.worktree_path(task_id))
        }

        fn cleanup(&self, task_id: &TaskId) -> Result<(), AdapterError> {
            self.active.lock().remove(&task_id.to_string());
            Ok(())
        }

        fn is_clean(&self, _path: &Path) -> Result<bool, AdapterError> {
            Ok(true)
        }

        fn worktree_path(&self, task_id: &TaskId) -> PathBuf {
            self.base.join(".worktrees").join(format!("task-{task_id}"))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorktreeManager;

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
