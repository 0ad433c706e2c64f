// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage-layer errors and their mapping into the shared taxonomy.

use dl_core::LedgerError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in file store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ledger file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("timed out acquiring lock for {}", .0.display())]
    LockTimeout(PathBuf),

    #[error("malformed ledger document: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => LedgerError::NotFound,
            StoreError::LockTimeout(_) => LedgerError::LockTimeout,
            StoreError::Malformed(msg) => LedgerError::Malformed(msg),
            StoreError::Io(io) => LedgerError::from(io),
        }
    }
}
