//! Shared fixtures for the spec suite.

use dl_core::FakeClock;
use dl_engine::{LedgerConfig, LocalLedger};
use dl_server::{router, ServerState};
use std::future::IntoFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A ledger engine over a throwaway directory with a controllable clock.
pub struct Ledger {
    pub dir: tempfile::TempDir,
    pub clock: FakeClock,
    pub engine: Arc<LocalLedger<FakeClock>>,
}

pub fn ledger() -> Ledger {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let config = LedgerConfig::new(dir.path())
        .with_lock_timeout(Duration::from_secs(5))
        .with_stale_timeout(Duration::from_secs(10));
    let engine = Arc::new(LocalLedger::with_clock(config, clock.clone()));
    Ledger { dir, clock, engine }
}

/// Serve a ledger directory over HTTP on an ephemeral port; returns the
/// base URL.
pub async fn spawn_server(dir: &Path) -> String {
    let engine = Arc::new(LocalLedger::new(LedgerConfig::new(dir)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ServerState::new(engine, addr.port(), dir.to_owned());
    tokio::spawn(axum::serve(listener, router(state)).into_future());
    format!("http://{}", addr)
}
