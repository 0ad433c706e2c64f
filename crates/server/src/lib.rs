// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dl-server: HTTP projection of the ledger engine.
//!
//! The server is stateless: each request carries the participant identity
//! in its body, the handler calls the engine, and the engine's result goes
//! back verbatim. Engine errors map to status codes through
//! [`dl_core::LedgerError::http_status`].

pub mod api;

use dl_engine::LocalLedger;
use dl_storage::BackupListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub use api::router;

/// Default listen port for the ledger server; clients assume the same.
pub const DEFAULT_PORT: u16 = 19880;

/// Service name reported by `/status`, used by discovery probes.
pub const SERVICE_NAME: &str = "ledger_server";

/// Default ledger directory: `$HOME/.tom/distributed_ledger`.
pub fn default_base_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tom")
        .join("distributed_ledger")
}

/// Shared context for all request handlers.
pub struct ServerState {
    pub ledger: Arc<LocalLedger>,
    pub port: u16,
    pub base_path: PathBuf,
    pub started: Instant,
}

impl ServerState {
    pub fn new(ledger: Arc<LocalLedger>, port: u16, base_path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            port,
            base_path,
            started: Instant::now(),
        })
    }
}

/// Logs each committed ledger backup.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBackupListener;

impl BackupListener for TracingBackupListener {
    fn backup_created(&self, ledger_path: &Path, backup_path: &Path) {
        debug!(
            ledger = %ledger_path.display(),
            backup = %backup_path.display(),
            "backup created"
        );
    }
}
