// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn always_release_never_retries() {
    let gate = AlwaysRelease;
    assert_eq!(gate.decide("boom"), GateDecision::Release);
    assert_eq!(gate.decide("boom again"), GateDecision::Release);
}

#[test]
fn retry_once_then_release_flips_after_first_call() {
    let gate = RetryOnceThenRelease::new();
    assert_eq!(gate.decide("boom"), GateDecision::Retry);
    assert_eq!(gate.decide("boom"), GateDecision::Release);
    assert_eq!(gate.decide("boom"), GateDecision::Release);
}
