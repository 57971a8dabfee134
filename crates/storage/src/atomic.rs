// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic, advisory-locked file store shared by the registry and rate limiter.
//!
//! Grounded on the fs2 advisory-lock pattern in the teacher's
//! `daemon/src/lifecycle/startup.rs` (`try_lock_exclusive` on a sibling lock
//! file) and on the original Python's `atomic_file_ops.py`
//! (`fasteners.InterProcessLock` + tempfile-in-same-dir + `fsync` + rename).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Reads, transforms, and atomically rewrites a JSON document guarded by a
/// sibling `.lock` file. A reader of `path` always observes either the
/// pre-image or the post-image, never a partial write.
pub fn update<T, F>(path: &Path, default: T, f: F) -> Result<T, StorageError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(T) -> T,
{
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let lock_path = lock_path_for(path);
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|source| StorageError::Lock { path: lock_path.clone(), source })?;

    // Blocking acquire: the OS releases this automatically if our process
    // crashes while holding it, so there is no crash-safety gap to cover.
    lock_file
        .lock_exclusive()
        .map_err(|source| StorageError::Lock { path: lock_path.clone(), source })?;

    let result = (|| {
        let current = read_json_safe(path, default);
        let updated = f(current);
        write_json_atomic(path, &updated)?;
        Ok(updated)
    })();

    let _ = fs2::FileExt::unlock(&lock_file);
    result
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn read_json_safe<T: DeserializeOwned>(path: &Path, default: T) -> T {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            tracing::warn!(?path, %err, "registry document corrupt, falling back to default");
            default
        }),
        Err(_) => default,
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
        "{}.{}.tmp",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("registry"),
        std::process::id()
    ));

    let write_result = (|| -> Result<(), StorageError> {
        let mut tmp = File::create(&tmp_path)
            .map_err(|source| StorageError::Write { path: tmp_path.clone(), source })?;
        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|err| StorageError::Write {
                path: tmp_path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
            })?;
        tmp.write_all(&bytes)
            .map_err(|source| StorageError::Write { path: tmp_path.clone(), source })?;
        tmp.sync_all()
            .map_err(|source| StorageError::Write { path: tmp_path.clone(), source })?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        StorageError::Rename { path: path.to_path_buf(), source }
    })
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
