// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn admits_up_to_three_attempts_in_window() {
    let dir = tempfile::tempdir().expect("tempdir");
    let limiter = RateLimiter::new(dir.path().join("registry.json"));
    assert!(limiter.check_startup(6969, 1000).expect("1"));
    assert!(limiter.check_startup(6969, 1001).expect("2"));
    assert!(limiter.check_startup(6969, 1002).expect("3"));
}

#[test]
fn fourth_attempt_within_window_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let limiter = RateLimiter::new(dir.path().join("registry.json"));
    limiter.check_startup(6969, 1000).expect("1");
    limiter.check_startup(6969, 1001).expect("2");
    limiter.check_startup(6969, 1002).expect("3");
    assert!(!limiter.check_startup(6969, 1003).expect("4"));
}

#[test]
fn rejected_attempt_is_not_recorded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let limiter = RateLimiter::new(dir.path().join("registry.json"));
    limiter.check_startup(6969, 1000).expect("1");
    limiter.check_startup(6969, 1001).expect("2");
    limiter.check_startup(6969, 1002).expect("3");
    limiter.check_startup(6969, 1002).expect("rejected");
    // Once the window passes, only the 3 genuine attempts should count.
    assert!(limiter.check_startup(6969, 1010).expect("after window"));
}

#[test]
fn window_resets_after_five_seconds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let limiter = RateLimiter::new(dir.path().join("registry.json"));
    limiter.check_startup(6969, 1000).expect("1");
    limiter.check_startup(6969, 1000).expect("2");
    limiter.check_startup(6969, 1000).expect("3");
    assert!(!limiter.check_startup(6969, 1001).expect("still within window"));
    assert!(limiter.check_startup(6969, 1006).expect("window elapsed"));
}

#[test]
fn different_ports_have_independent_windows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let limiter = RateLimiter::new(dir.path().join("registry.json"));
    limiter.check_startup(6969, 1000).expect("1");
    limiter.check_startup(6969, 1000).expect("2");
    limiter.check_startup(6969, 1000).expect("3");
    assert!(limiter.check_startup(7000, 1000).expect("different port"));
}
