//! Remote participation: the same verbs through a real HTTP server.

use crate::prelude::*;
use dl_client::RemoteLedger;
use dl_core::{HeartbeatResult, LedgerError, OperationId, OperationState, ParticipantId};
use dl_engine::{HeartbeatEvents, LedgerOps, OperationHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn op(id: &str) -> OperationId {
    OperationId::new(id)
}

#[derive(Default)]
struct AbortWatch {
    aborts: AtomicUsize,
}

impl HeartbeatEvents for AbortWatch {
    fn on_abort(&self, _result: &HeartbeatResult) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn remote_participant_runs_the_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = spawn_server(dir.path()).await;

    let remote = Arc::new(RemoteLedger::new(&base_url, "worker").unwrap());
    remote
        .create_operation(&op("op1"), &ParticipantId::new("worker"), None)
        .await
        .unwrap();

    let handle = OperationHandle::new(Arc::clone(&remote), "op1", "worker");
    handle.push_stack_frame("c1", true, None).await.unwrap();
    handle.register_resource("c1", "/tmp/remote-x").await.unwrap();

    let beat = handle.heartbeat().await.unwrap();
    assert!(beat.ledger_exists);
    assert!(beat.heartbeat_updated);
    assert_eq!(beat.temp_resource_count, 1);

    handle.release_resource("/tmp/remote-x").await.unwrap();
    handle.pop_stack_frame("c1").await.unwrap();
    let done = handle.complete().await.unwrap();
    assert_eq!(done.operation_state, OperationState::Completed);

    assert_eq!(
        handle.read_state().await.unwrap_err(),
        LedgerError::NotFound
    );
}

#[tokio::test]
async fn local_and_remote_participants_share_one_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = spawn_server(dir.path()).await;

    let initiator = Arc::new(RemoteLedger::new(&base_url, "cli").unwrap());
    let joiner = Arc::new(RemoteLedger::new(&base_url, "worker").unwrap());

    initiator
        .create_operation(&op("op1"), &ParticipantId::new("cli"), None)
        .await
        .unwrap();

    let cli = OperationHandle::new(initiator, "op1", "cli");
    let worker = OperationHandle::new(joiner, "op1", "worker");

    cli.push_stack_frame("c1", true, None).await.unwrap();
    let data = worker.push_stack_frame("c2", false, None).await.unwrap();
    assert_eq!(data.call_frames.len(), 2);
    assert_eq!(data.participants().len(), 2);

    worker.pop_stack_frame("c2").await.unwrap();
    cli.pop_stack_frame("c1").await.unwrap();
    cli.complete().await.unwrap();
}

#[tokio::test]
async fn abort_from_one_side_stops_the_other_sides_heartbeat() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = spawn_server(dir.path()).await;

    let remote = Arc::new(RemoteLedger::new(&base_url, "worker").unwrap());
    remote
        .create_operation(&op("op2"), &ParticipantId::new("worker"), None)
        .await
        .unwrap();

    let handle = OperationHandle::new(Arc::clone(&remote), "op2", "worker");
    handle.push_stack_frame("c1", true, None).await.unwrap();

    let watch = Arc::new(AbortWatch::default());
    handle.start_heartbeat_every(Duration::from_millis(50), watch.clone());

    // Another participant pulls the plug
    let other = RemoteLedger::new(&base_url, "cli").unwrap();
    other.abort(&op("op2"), "operator request").await.unwrap();

    // The scheduler observes the flag and fires on_abort exactly once
    for _ in 0..50 {
        if watch.aborts.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(watch.aborts.load(Ordering::SeqCst), 1);

    handle.stop_heartbeat().await;
}

#[tokio::test]
async fn definitive_outcomes_surface_without_retries() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = spawn_server(dir.path()).await;
    let remote = RemoteLedger::new(&base_url, "cli").unwrap();

    remote
        .create_operation(&op("op5"), &ParticipantId::new("a"), None)
        .await
        .unwrap();

    // AlreadyExists comes back immediately; the 62 s schedule would make
    // this test time out if the client retried it.
    let started = std::time::Instant::now();
    let err = remote
        .create_operation(&op("op5"), &ParticipantId::new("b"), None)
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::AlreadyExists);
    assert!(started.elapsed() < Duration::from_secs(2));
}
