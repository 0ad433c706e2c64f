// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process advisory locking for ledger files.
//!
//! Each ledger file `<op>.json` has a sibling `<op>.json.lock` that carries
//! the exclusive advisory lock. The lock file itself holds no data and is
//! never deleted; its presence is immaterial.

use crate::error::StoreError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::trace;

/// Default total time to wait for the lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval inside the bounded retry loop.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sibling lock-file path for a ledger file.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_owned();
    os.push(".lock");
    PathBuf::from(os)
}

/// An exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Acquire the lock for `target`, retrying with cooperative sleeps
    /// until `timeout` elapses.
    ///
    /// Contention past the deadline surfaces as [`StoreError::LockTimeout`].
    pub async fn acquire(target: &Path, timeout: Duration) -> Result<Self, StoreError> {
        let lock_path = lock_path_for(target);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    trace!(path = %lock_path.display(), "lock acquired");
                    return Ok(Self {
                        file,
                        path: lock_path,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                return Err(StoreError::LockTimeout(target.to_owned()));
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    /// Path of the lock file this guard holds.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            trace!(path = %self.path.display(), error = %e, "unlock failed");
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
