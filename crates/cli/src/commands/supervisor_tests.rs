// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hpm_core::Config;

fn cleanup(port: u16) {
    let _ = std::fs::remove_file(ledger_path(port));
    let _ = std::fs::remove_file(ledger_path(port).with_extension("json.lock"));
}

#[test]
fn ownership_round_trips_through_the_ledger() {
    let port = 58_101;
    cleanup(port);

    record_ownership(port, "client-a", 4242, 1_700_000_000).expect("record");
    let taken = take_ownership(port, "client-a").expect("take").expect("present");
    assert_eq!(taken.pid, 4242);
    assert_eq!(taken.started_at_secs, 1_700_000_000);

    cleanup(port);
}

#[test]
fn taking_ownership_removes_the_entry_so_it_cannot_be_reused() {
    let port = 58_102;
    cleanup(port);

    record_ownership(port, "client-b", 1, 1_700_000_000).expect("record");
    assert!(take_ownership(port, "client-b").expect("take").is_some());
    assert!(take_ownership(port, "client-b").expect("take").is_none());

    cleanup(port);
}

#[test]
fn absent_entry_defaults_to_did_not_start_it() {
    let port = 58_103;
    cleanup(port);

    assert!(take_ownership(port, "never-recorded").expect("take").is_none());
}

#[test]
fn entries_are_scoped_by_client_id() {
    let port = 58_104;
    cleanup(port);

    record_ownership(port, "client-c", 7, 1_700_000_000).expect("record");
    assert!(take_ownership(port, "someone-else").expect("take").is_none());
    assert!(take_ownership(port, "client-c").expect("take").is_some());

    cleanup(port);
}

#[test]
fn resolve_port_falls_back_to_config_when_no_override_given() {
    let config = Config::from_lookup(|_| None);
    let port = resolve_port(None, &config, "some-client");
    // With no instance hash collision forcing a scan, the requested port
    // (the default 6969, almost certainly free in a test sandbox) is kept.
    assert!(port >= config.service_port);
}

#[test]
fn resolve_port_prefers_the_explicit_override() {
    let config = Config::from_lookup(|_| None);
    let port = resolve_port(Some(9_500), &config, "some-client");
    assert!(port >= 9_500);
}
