// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hpm-daemon: the supervisor/auto-start and shutdown coordinator that
//! make a shared PM HTTP server safe to start and stop from arbitrarily
//! many concurrent clients.

pub mod command_table;
pub mod error;
pub mod health_probe;
pub mod mcp_context;
pub mod shutdown;
pub mod spawner;
pub mod supervisor;

pub use command_table::{CommandProbe, SpawnProbe};
pub use error::DaemonError;
pub use health_probe::HealthProbe;
pub use shutdown::{OwnedServer, ProcessIdentity, ProcessTerminator, ShutdownCoordinator, SignalTerminator, SysinfoIdentity};
pub use spawner::{OsSpawner, ProcessSpawner, SpawnedChild};
pub use supervisor::{EnsureOutcome, Ownership, Supervisor, SupervisorConfig};

#[cfg(any(test, feature = "test-support"))]
pub use health_probe::FakeHealthProbe;
#[cfg(any(test, feature = "test-support"))]
pub use shutdown::{FakeIdentity, FakeTerminator};
#[cfg(any(test, feature = "test-support"))]
pub use spawner::{FakeSpawner, ScriptedExit};
