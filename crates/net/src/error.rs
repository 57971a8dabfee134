// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PmError {
    #[error("transport error talking to PM service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("PM service returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl PmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            PmError::Status { status, .. } => Some(*status),
            PmError::Transport(_) => None,
        }
    }
}
