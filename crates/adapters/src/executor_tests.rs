// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hpm_core::{AgentRole, DifficultyLevel, TaskComplexity, TaskId, TaskStatus};
use std::time::Duration;

fn sample_task() -> Task {
    Task {
        id: TaskId::new("t1"),
        title: "demo".to_string(),
        status: TaskStatus::UnderWork,
        complexity: TaskComplexity::Minor,
        skill_level: DifficultyLevel::Senior,
        role: AgentRole::BackendDev,
    }
}

#[test]
fn reports_failure_when_the_worktree_is_missing() {
    let executor = ClaudeExecutor { binary: PathBuf::from("/bin/true") };
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("does-not-exist");
    let instructions = dir.path().join("instructions.md");
    std::fs::write(&instructions, "do the thing").expect("write instructions");

    let outcome = executor
        .execute_task(&sample_task(), &missing, &instructions, Duration::from_secs(5))
        .expect("execute_task should not itself error");
    assert!(!outcome.ok);
    assert!(outcome.message.contains("does not exist"));
}

#[test]
fn reports_failure_when_instructions_are_unreadable() {
    let executor = ClaudeExecutor { binary: PathBuf::from("/bin/true") };
    let dir = tempfile::tempdir().expect("tempdir");
    let missing_instructions = dir.path().join("nope.md");

    let err = executor
        .execute_task(&sample_task(), dir.path(), &missing_instructions, Duration::from_secs(5))
        .expect_err("missing instructions file should be an error");
    assert!(matches!(err, AdapterError::Io { .. }));
}

#[test]
fn succeeds_when_the_subprocess_exits_zero() {
    let executor = ClaudeExecutor { binary: PathBuf::from("/bin/cat") };
    let dir = tempfile::tempdir().expect("tempdir");
    let instructions = dir.path().join("instructions.md");
    std::fs::write(&instructions, "hello").expect("write instructions");

    let outcome = executor
        .execute_task(&sample_task(), dir.path(), &instructions, Duration::from_secs(5))
        .expect("execute_task");
    assert!(outcome.ok);
}

#[test]
fn times_out_a_subprocess_that_never_exits() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    // A script that ignores whatever --model flags get appended and just
    // sleeps, so the timeout path is exercised regardless of argv.
    let script = dir.path().join("slow.sh");
    std::fs::write(&script, "#!/bin/sh\nsleep 5\n").expect("write script");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).expect("chmod");

    let executor = ClaudeExecutor { binary: script };
    let instructions = dir.path().join("instructions.md");
    std::fs::write(&instructions, "hello").expect("write instructions");

    let outcome = executor
        .execute_task(&sample_task(), dir.path(), &instructions, Duration::from_millis(200))
        .expect("execute_task");
    assert!(!outcome.ok);
    assert!(outcome.message.contains("timed out"));
}

#[test]
fn verify_available_is_false_for_a_binary_that_does_not_exist() {
    let executor = ClaudeExecutor { binary: PathBuf::from("/no/such/claude-binary") };
    let err = executor.verify_available().expect_err("spawn should fail");
    assert!(matches!(err, AdapterError::Io { .. }));
}

#[test]
fn expand_home_resolves_tilde_against_home_env() {
    std::env::set_var("HOME", "/home/example");
    assert_eq!(expand_home("~/.claude/bin/claude"), PathBuf::from("/home/example/.claude/bin/claude"));
    assert_eq!(expand_home("/usr/local/bin/claude"), PathBuf::from("/usr/local/bin/claude"));
}

#[test]
fn fake_executor_records_calls_and_returns_configured_outcome() {
    let fake = fake::FakeExecutor::new();
    fake.outcome.lock().ok = false;
    fake.outcome.lock().message = "boom".to_string();

    let outcome = fake
        .execute_task(&sample_task(), Path::new("/tmp"), Path::new("/tmp/i.md"), Duration::from_secs(1))
        .expect("fake never errors");
    assert!(!outcome.ok);
    assert_eq!(outcome.message, "boom");
    assert_eq!(fake.calls().len(), 1);
    assert_eq!(fake.calls()[0].task_id, "t1");
}
