// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn env_override_wins_when_parseable() {
    let port = allocate(6969, None, Some("7100"));
    assert_eq!(port, 7100);
}

#[test]
fn falls_back_to_requested_when_override_unparseable() {
    let port = allocate(6969, None, Some("not-a-port"));
    // With no instance id either, target == requested, and it should be free
    // on a throwaway port in the ephemeral-adjacent range during tests.
    assert!(port >= 6969);
}

#[test]
fn hash_of_instance_id_is_deterministic() {
    let a = hash_mod("instance-a", 1000);
    let b = hash_mod("instance-a", 1000);
    assert_eq!(a, b);
}

#[test]
fn scans_upward_when_base_port_is_taken() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral");
    let taken_port = listener.local_addr().expect("addr").port();
    let allocated = allocate(taken_port, None, None);
    assert_ne!(allocated, taken_port);
    drop(listener);
}
