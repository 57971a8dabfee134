// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::health_probe::HealthProbe;
use crate::spawner::fake::{FakeSpawner, ScriptedExit};
use hpm_core::FakeClock;
use parking_lot::Mutex;

struct AlwaysTrueProbe;
impl CommandProbe for AlwaysTrueProbe {
    fn probe(&self, _program: &str) -> bool {
        true
    }
}

/// Returns `false` for the first `flips_after` calls, then `true` forever.
struct SequenceHealth {
    calls: Mutex<usize>,
    flips_after: usize,
}

impl SequenceHealth {
    fn new(flips_after: usize) -> Self {
        Self { calls: Mutex::new(0), flips_after }
    }
}

impl HealthProbe for SequenceHealth {
    fn check(&self) -> bool {
        let mut calls = self.calls.lock();
        *calls += 1;
        *calls > self.flips_after
    }
}

fn base_config(registry_path: &std::path::Path) -> (SupervisorConfig, ProcessRegistry, RateLimiter) {
    let config = SupervisorConfig {
        port: 6969,
        client_id: hpm_core::ClientId::new("client-1"),
        no_autostart: false,
        command_override: Some("fake-server --flag".to_string()),
        spawn_dir: None,
    };
    let registry = ProcessRegistry::new(registry_path.to_path_buf());
    let rate_limiter = RateLimiter::new(registry_path.to_path_buf());
    (config, registry, rate_limiter)
}

#[test]
fn connects_to_an_already_healthy_server() {
    let dir = tempfile::tempdir().expect("dir");
    let (config, registry, rate_limiter) = base_config(&dir.path().join("registry.json"));

    let supervisor = Supervisor::new(
        config,
        registry,
        rate_limiter,
        FakeClock::new(),
        FakeSpawner::new(ScriptedExit::StaysAlive),
        AlwaysTrueProbe,
        crate::health_probe::FakeHealthProbe::new(true),
    );

    let outcome = supervisor.ensure().expect("ensure");
    assert!(matches!(outcome.ownership, Ownership::ConnectedToExisting { .. }));
    assert!(supervisor.spawner.spawned.lock().is_empty(), "must not spawn when already healthy");
}

#[test]
fn waits_for_a_peer_that_is_already_starting_the_server() {
    let dir = tempfile::tempdir().expect("dir");
    let (config, registry, rate_limiter) = base_config(&dir.path().join("registry.json"));
    let now = 1_700_000_000;

    // Simulate a peer that has already claimed ownership of starting the API.
    registry.register_api_server(4242, "repo", now).expect("pre-register api server");

    let supervisor = Supervisor::new(
        config,
        registry,
        rate_limiter,
        FakeClock::new(),
        FakeSpawner::new(ScriptedExit::StaysAlive),
        AlwaysTrueProbe,
        SequenceHealth::new(1),
    );

    let outcome = supervisor.ensure().expect("ensure");
    assert!(matches!(outcome.ownership, Ownership::ConnectedToExisting { .. }));
    assert!(supervisor.spawner.spawned.lock().is_empty());
}

#[test]
fn respects_auto_start_disabled() {
    let dir = tempfile::tempdir().expect("dir");
    let (mut config, registry, rate_limiter) = base_config(&dir.path().join("registry.json"));
    config.no_autostart = true;

    let supervisor = Supervisor::new(
        config,
        registry,
        rate_limiter,
        FakeClock::new(),
        FakeSpawner::new(ScriptedExit::StaysAlive),
        AlwaysTrueProbe,
        crate::health_probe::FakeHealthProbe::new(false),
    );

    let err = supervisor.ensure().expect_err("should refuse to start");
    assert!(matches!(err, DaemonError::AutoStartDisabled));
}

#[test]
fn rejects_startup_once_rate_limited() {
    let dir = tempfile::tempdir().expect("dir");
    let path = dir.path().join("registry.json");
    let (config, registry, rate_limiter) = base_config(&path);
    let now = 1_700_000_000;

    for _ in 0..3 {
        assert!(rate_limiter.check_startup(config.port, now).expect("check"));
    }

    let supervisor = Supervisor::new(
        config,
        registry,
        rate_limiter,
        FakeClock::new(),
        FakeSpawner::new(ScriptedExit::StaysAlive),
        AlwaysTrueProbe,
        crate::health_probe::FakeHealthProbe::new(false),
    );

    let err = supervisor.ensure().expect_err("should be rate limited");
    assert!(matches!(err, DaemonError::RateLimited));
}

#[test]
fn surfaces_a_spawn_failure() {
    let dir = tempfile::tempdir().expect("dir");
    let (config, registry, rate_limiter) = base_config(&dir.path().join("registry.json"));
    let spawner = FakeSpawner::new(ScriptedExit::StaysAlive);
    *spawner.fail_spawn.lock() = true;

    let supervisor = Supervisor::new(
        config,
        registry,
        rate_limiter,
        FakeClock::new(),
        spawner,
        AlwaysTrueProbe,
        crate::health_probe::FakeHealthProbe::new(false),
    );

    let err = supervisor.ensure().expect_err("should surface spawn error");
    assert!(matches!(err, DaemonError::Spawn { .. }));
}

#[test]
fn surfaces_an_early_exit_with_captured_stderr() {
    let dir = tempfile::tempdir().expect("dir");
    let (config, registry, rate_limiter) = base_config(&dir.path().join("registry.json"));
    let spawner = FakeSpawner::new(ScriptedExit::ExitsWith { code: 1, stderr: "boom".to_string() });

    let supervisor = Supervisor::new(
        config,
        registry,
        rate_limiter,
        FakeClock::new(),
        spawner,
        AlwaysTrueProbe,
        crate::health_probe::FakeHealthProbe::new(false),
    );

    let err = supervisor.ensure().expect_err("should surface early exit");
    match err {
        DaemonError::SpawnedProcessExited(message) => assert!(message.contains("boom")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn spawns_and_reports_readiness() {
    let dir = tempfile::tempdir().expect("dir");
    let (config, registry, rate_limiter) = base_config(&dir.path().join("registry.json"));

    let supervisor = Supervisor::new(
        config,
        registry,
        rate_limiter,
        FakeClock::new(),
        FakeSpawner::new(ScriptedExit::StaysAlive),
        AlwaysTrueProbe,
        SequenceHealth::new(1),
    );

    let outcome = supervisor.ensure().expect("ensure");
    assert!(matches!(outcome.ownership, Ownership::StartedByUs { .. }));
    assert_eq!(supervisor.spawner.spawned.lock().len(), 1);
}
