// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("auto-start is disabled (HEADLESS_PM_NO_AUTOSTART set) and no server is reachable on the configured port")]
    AutoStartDisabled,
    #[error("startup rejected by the rate limiter; too many recent spawn attempts on this port")]
    RateLimited,
    #[error("no usable launch command found for this context")]
    NoLaunchCommand,
    #[error("preflight check failed: {0}")]
    PreflightFailed(String),
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("spawned server exited before becoming ready: {0}")]
    SpawnedProcessExited(String),
    #[error("server did not become ready within the startup window")]
    ReadyTimeout,
    #[error(transparent)]
    Storage(#[from] hpm_storage::StorageError),
}
