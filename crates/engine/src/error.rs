// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("PM service error: {0}")]
    Pm(#[from] hpm_net::PmError),
    #[error(transparent)]
    Storage(#[from] hpm_storage::StorageError),
    #[error(transparent)]
    Adapter(#[from] hpm_adapters::AdapterError),
    #[error("no instructions found for role {role:?}")]
    MissingInstructions { role: hpm_core::AgentRole },
    #[error("configuration invalid: {0}")]
    Config(String),
}
