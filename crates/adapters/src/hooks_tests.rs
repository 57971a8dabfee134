// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write script");
    path
}

#[test]
fn missing_hook_is_treated_as_success() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = ScriptHookRunner::new(dir.path()).expect("runner");

    let outcome = runner.run_pre_task(&json!({"task_id": "t1"})).expect("run_pre_task");
    assert!(outcome.ok);
}

#[test]
fn pre_task_hook_exit_zero_passes() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_script(dir.path(), "pre_task.sh", "#!/bin/sh\ncat >/dev/null\nexit 0\n");
    let runner = ScriptHookRunner::new(dir.path()).expect("runner");

    let outcome = runner.run_pre_task(&json!({"task_id": "t1"})).expect("run_pre_task");
    assert!(outcome.ok);
    assert_eq!(outcome.message, "pre-task checks passed");
}

#[test]
fn pre_task_hook_nonzero_exit_blocks() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_script(dir.path(), "pre_task.sh", "#!/bin/sh\necho nope >&2\nexit 1\n");
    let runner = ScriptHookRunner::new(dir.path()).expect("runner");

    let outcome = runner.run_pre_task(&json!({"task_id": "t1"})).expect("run_pre_task");
    assert!(!outcome.ok);
    assert!(outcome.message.contains("nope"));
}

#[test]
fn py_extension_is_preferred_over_sh() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_script(dir.path(), "pre_task.py", "#!/bin/sh\nexit 0\n");
    write_script(dir.path(), "pre_task.sh", "#!/bin/sh\nexit 1\n");
    let runner = ScriptHookRunner::new(dir.path()).expect("runner");

    let outcome = runner.run_pre_task(&json!({})).expect("run_pre_task");
    assert!(outcome.ok, "should have picked pre_task.py, not pre_task.sh");
}

#[test]
fn post_task_failures_do_not_propagate() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_script(dir.path(), "post_task.sh", "#!/bin/sh\nexit 1\n");
    let runner = ScriptHookRunner::new(dir.path()).expect("runner");

    runner.run_post_task(&json!({"task_id": "t1", "success": true}));
}

#[test]
fn health_check_surfaces_failure_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_script(dir.path(), "health_check.sh", "#!/bin/sh\necho broken >&2\nexit 1\n");
    let runner = ScriptHookRunner::new(dir.path()).expect("runner");

    let outcome = runner.run_health_check();
    assert!(!outcome.ok);
    assert!(outcome.message.contains("broken"));
}

#[test]
fn non_executable_hook_gets_chmod_and_runs() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_script(dir.path(), "pre_task.sh", "#!/bin/sh\nexit 0\n");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).expect("chmod");

    let runner = ScriptHookRunner::new(dir.path()).expect("runner");
    let outcome = runner.run_pre_task(&json!({})).expect("run_pre_task");
    assert!(outcome.ok);
}

#[test]
fn fake_hook_runner_defaults_to_passing() {
    let runner = fake::FakeHookRunner::new();
    assert!(runner.run_pre_task(&json!({})).expect("pre_task").ok);
    assert!(runner.run_health_check().ok);
    runner.run_post_task(&json!({"a": 1}));
    assert_eq!(runner.post_task_calls.lock().len(), 1);
}

#[test]
fn fake_hook_runner_can_be_configured_to_fail() {
    let runner = fake::FakeHookRunner::new();
    *runner.pre_task_outcome.lock() = Some((false, "blocked by operator policy".to_string()));
    let outcome = runner.run_pre_task(&json!({})).expect("pre_task");
    assert!(!outcome.ok);
    assert_eq!(outcome.message, "blocked by operator policy");
}
