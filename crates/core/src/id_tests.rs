// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn displays_as_inner_string() {
    let id = TaskId::new("42");
    assert_eq!(id.to_string(), "42");
    assert_eq!(id, "42");
}

#[test]
fn roundtrips_through_serde() {
    let id = AgentId::from("agent-7");
    let json = serde_json::to_string(&id).expect("serialize");
    assert_eq!(json, "\"agent-7\"");
    let back: AgentId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, id);
}

#[test]
fn distinct_id_types_do_not_compare() {
    let task = TaskId::new("1");
    let client = ClientId::new("1");
    assert_eq!(task.as_str(), client.as_str());
}
