// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_lease_has_no_worktree_or_branch() {
    let lease = TaskLease::new(
        TaskId::new("42"),
        "Fix thing".into(),
        AgentId::new("agent-1"),
        1_000,
        serde_json::json!({"id": "42"}),
    );
    assert!(lease.worktree_path.is_none());
    assert!(lease.branch_name.is_none());
}

#[test]
fn roundtrips_through_json() {
    let lease = TaskLease::new(
        TaskId::new("42"),
        "Fix thing".into(),
        AgentId::new("agent-1"),
        1_000,
        serde_json::json!({"id": "42"}),
    );
    let json = serde_json::to_string(&lease).expect("serialize");
    let back: TaskLease = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.task_id, lease.task_id);
    assert_eq!(back.agent_id, lease.agent_id);
}
