// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic whole-file storage under cross-process mutual exclusion.
//!
//! Writes go to a sibling temp file, are fsync'd, then renamed over the
//! destination. The rename is the commit point: readers that do not hold
//! the lock observe either the pre- or post-rename content, never a torn
//! file. Every committed write leaves a timestamped copy in `backups/`.

use crate::error::StoreError;
use crate::lock::{LockGuard, DEFAULT_LOCK_TIMEOUT};
use chrono::Utc;
use dl_core::format_ts;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Observer notified after each committed backup.
pub trait BackupListener: Send + Sync {
    fn backup_created(&self, ledger_path: &Path, backup_path: &Path);
}

/// Listener that ignores backup events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackupListener;

impl BackupListener for NoopBackupListener {
    fn backup_created(&self, _ledger_path: &Path, _backup_path: &Path) {}
}

/// What a transaction closure decided to do with the file.
pub enum TxnOutcome {
    /// Replace the file with these bytes.
    Write(Vec<u8>),
    /// Remove the file.
    Delete,
    /// Leave the file as it was.
    Unchanged,
}

/// Durable single-file storage with exclusive locking and backups.
pub struct FileStore {
    lock_timeout: Duration,
    listener: Arc<dyn BackupListener>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    pub fn new() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            listener: Arc::new(NoopBackupListener),
        }
    }

    /// Install a backup observer.
    pub fn with_listener(mut self, listener: Arc<dyn BackupListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Override the total lock-acquisition bound.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Read the file under the lock.
    pub async fn read_locked(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        let _guard = LockGuard::acquire(path, self.lock_timeout).await?;
        read_existing(path)
    }

    /// Replace the file under the lock: temp write, fsync, rename, backup.
    pub async fn atomic_replace(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let _guard = LockGuard::acquire(path, self.lock_timeout).await?;
        self.replace_locked(path, bytes)
    }

    /// Read-modify-write as one critical section.
    ///
    /// The closure receives the current bytes (`None` when the file does not
    /// exist) and decides the outcome. `Write` goes through the same
    /// rename-and-backup path as [`FileStore::atomic_replace`].
    pub async fn transact<T, E, F>(&self, path: &Path, f: F) -> Result<T, E>
    where
        F: FnOnce(Option<Vec<u8>>) -> Result<(TxnOutcome, T), E>,
        E: From<StoreError>,
    {
        let _guard = LockGuard::acquire(path, self.lock_timeout)
            .await
            .map_err(E::from)?;

        let current = match read_existing(path) {
            Ok(bytes) => Some(bytes),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(E::from(e)),
        };

        let (outcome, value) = f(current)?;
        match outcome {
            TxnOutcome::Write(bytes) => self.replace_locked(path, &bytes).map_err(E::from)?,
            TxnOutcome::Delete => match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "ledger file deleted"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(E::from(StoreError::Io(e))),
            },
            TxnOutcome::Unchanged => {}
        }
        Ok(value)
    }

    /// Commit bytes while already holding the lock.
    fn replace_locked(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let tmp_path = path.with_extension("tmp");

        // Write to temp file and sync
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }

        // Atomic rename: the commit point
        fs::rename(&tmp_path, path)?;

        let backup_path = self.write_backup(path, bytes)?;
        self.listener.backup_created(path, &backup_path);
        Ok(())
    }

    /// Append a timestamped copy to the sibling `backups/` directory.
    ///
    /// Backups are append-only; retention is an external janitor's job.
    fn write_backup(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let dir = path.parent().unwrap_or(Path::new(".")).join("backups");
        fs::create_dir_all(&dir)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        let ts = format_ts(&Utc::now());

        // Sub-millisecond successive writes would collide; uniquify.
        let mut backup = dir.join(format!("{}.{}.json", stem, ts));
        let mut n = 1u32;
        while backup.exists() {
            backup = dir.join(format!("{}.{}.{}.json", stem, ts, n));
            n += 1;
        }

        fs::write(&backup, bytes)?;
        Ok(backup)
    }
}

fn read_existing(path: &Path) -> Result<Vec<u8>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(StoreError::NotFound(path.to_owned()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
