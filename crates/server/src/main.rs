// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed Processing Ledger server (dld)
//!
//! Serves one ledger directory over HTTP so that remote participants can
//! observe and mutate operations they do not host locally.

use clap::Parser;
use dl_engine::{LedgerConfig, LocalLedger};
use dl_server::{router, ServerState, TracingBackupListener, DEFAULT_PORT};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "dld",
    version,
    about = "Distributed Processing Ledger server",
    long_about = "Serves a ledger directory over HTTP. Participants on other\n\
                  machines use the same operation verbs as local ones; the\n\
                  server simply projects the ledger engine onto stateless\n\
                  requests."
)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Ledger directory (default: $HOME/.tom/distributed_ledger)
    #[arg(long)]
    path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();
    let args = Args::parse();

    let base_path = args.path.unwrap_or_else(dl_server::default_base_path);
    std::fs::create_dir_all(&base_path)?;

    let ledger = Arc::new(
        LocalLedger::new(LedgerConfig::new(&base_path))
            .with_backup_listener(Arc::new(TracingBackupListener)),
    );
    let state = ServerState::new(ledger, args.port, base_path.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!(
        port = args.port,
        path = %base_path.display(),
        "ledger server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ledger server stopped");
    Ok(())
}

/// Resolves on SIGTERM or SIGINT.
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(_) => return std::future::pending().await,
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(_) => return std::future::pending().await,
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
