// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("git command failed in {cwd}: {stderr}")]
    GitCommand { cwd: PathBuf, stderr: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("subprocess timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("subprocess exited with code {code}: {message}")]
    NonZeroExit { code: i32, message: String },
    #[error("no executable found for {name}")]
    BinaryNotFound { name: String },
}
