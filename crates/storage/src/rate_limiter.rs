// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter: the sole fork-bomb gate in the
//! supervisor startup path. Shares the registry document's file rather than
//! a separate one.

use std::path::PathBuf;

use hpm_core::RegistryDocument;

use crate::atomic;
use crate::error::StorageError;
use crate::process_registry::migrate_legacy;

const WINDOW_SECS: u64 = 5;
const PRUNE_AFTER_SECS: u64 = 300;
const MAX_ATTEMPTS_PER_WINDOW: usize = 3;

pub struct RateLimiter {
    path: PathBuf,
}

impl RateLimiter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns true iff this startup attempt is admitted. On rejection, the
    /// attempt is *not* recorded.
    pub fn check_startup(&self, port: u16, now: u64) -> Result<bool, StorageError> {
        let admitted = std::cell::Cell::new(false);
        atomic::update(&self.path, RegistryDocument::default(), |doc| {
            let mut doc = migrate_legacy(doc);
            let key = port.to_string();
            let mut window = doc.rate_limits.remove(&key).unwrap_or_default();

            window.attempts.retain(|&t| now.saturating_sub(t) <= PRUNE_AFTER_SECS);
            let recent = window
                .attempts
                .iter()
                .filter(|&&t| now.saturating_sub(t) <= WINDOW_SECS)
                .count();

            if recent >= MAX_ATTEMPTS_PER_WINDOW {
                admitted.set(false);
            } else {
                admitted.set(true);
                window.attempts.push(now);
            }

            doc.rate_limits.insert(key, window);
            doc
        })?;
        Ok(admitted.get())
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
