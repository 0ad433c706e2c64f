//! Operation lifecycle: create, push, heartbeat, pop, complete, abort.

use crate::prelude::*;
use dl_core::{CallId, LedgerError, OperationId, OperationState, ParticipantId};
use dl_engine::{FrameSpec, LedgerOps, OperationHandle};
use std::sync::Arc;

fn op(id: &str) -> OperationId {
    OperationId::new(id)
}

fn who(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

#[tokio::test]
async fn happy_path_ends_with_a_deleted_ledger() {
    let l = ledger();

    l.engine
        .create_operation(&op("op1"), &who("cli"), None)
        .await
        .unwrap();
    l.engine
        .push_call_frame(&op("op1"), FrameSpec::new("cli", "c1", 1234))
        .await
        .unwrap();

    let beat = l.engine.heartbeat(&op("op1"), &who("cli")).await.unwrap();
    assert!(!beat.abort_flag);
    assert_eq!(beat.call_frame_count, 1);

    l.engine
        .pop_call_frame(&op("op1"), &CallId::new("c1"))
        .await
        .unwrap();
    let done = l.engine.complete(&op("op1")).await.unwrap();
    assert_eq!(done.operation_state, OperationState::Completed);

    assert_eq!(
        l.engine.read_state(&op("op1")).await.unwrap_err(),
        LedgerError::NotFound
    );
    // The ledger file itself is gone; only lock and backups remain
    assert!(!l.dir.path().join("op1.json").exists());
}

#[tokio::test]
async fn abort_reaches_other_participants_and_blocks_pushes() {
    let l = ledger();

    l.engine
        .create_operation(&op("op2"), &who("cli"), None)
        .await
        .unwrap();
    l.engine
        .push_call_frame(&op("op2"), FrameSpec::new("cli", "c1", 1))
        .await
        .unwrap();

    l.engine.abort(&op("op2"), "user").await.unwrap();

    let beat = l.engine.heartbeat(&op("op2"), &who("cli")).await.unwrap();
    assert!(beat.abort_flag);

    assert_eq!(
        l.engine
            .push_call_frame(&op("op2"), FrameSpec::new("cli", "c2", 1))
            .await
            .unwrap_err(),
        LedgerError::Aborted
    );
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let l = ledger();

    l.engine
        .create_operation(&op("op5"), &who("a"), None)
        .await
        .unwrap();
    assert_eq!(
        l.engine
            .create_operation(&op("op5"), &who("b"), None)
            .await
            .unwrap_err(),
        LedgerError::AlreadyExists
    );

    // The first writer's record is untouched
    let data = l.engine.read_state(&op("op5")).await.unwrap();
    assert_eq!(data.initiator_id, "a");
}

#[tokio::test]
async fn nested_frames_unwind_in_lifo_order() {
    let l = ledger();
    let engine = Arc::clone(&l.engine);

    l.engine
        .create_operation(&op("op1"), &who("cli"), None)
        .await
        .unwrap();

    let cli = OperationHandle::new(Arc::clone(&engine), "op1", "cli");
    let worker = OperationHandle::new(engine, "op1", "worker");

    cli.push_stack_frame("c1", true, None).await.unwrap();
    worker
        .push_stack_frame("c2", true, Some("nested call".into()))
        .await
        .unwrap();

    assert_eq!(
        cli.pop_stack_frame("c1").await.unwrap_err(),
        LedgerError::NotTop
    );
    worker.pop_stack_frame("c2").await.unwrap();
    cli.pop_stack_frame("c1").await.unwrap();

    let done = cli.complete().await.unwrap();
    assert_eq!(done.operation_state, OperationState::Completed);
}

#[tokio::test]
async fn resources_are_contained_until_release_or_pop() {
    let l = ledger();

    l.engine
        .create_operation(&op("op1"), &who("cli"), Some(serde_json::json!({"k": "v"})))
        .await
        .unwrap();
    l.engine
        .push_call_frame(&op("op1"), FrameSpec::new("cli", "c1", 9))
        .await
        .unwrap();
    l.engine
        .register_resource(&op("op1"), &CallId::new("c1"), "/tmp/a")
        .await
        .unwrap();

    let data = l.engine.read_state(&op("op1")).await.unwrap();
    assert!(data.resource("/tmp/a").is_some());
    assert!(data
        .frame(&CallId::new("c1"))
        .unwrap()
        .resources
        .contains(&"/tmp/a".to_string()));

    let data = l
        .engine
        .pop_call_frame(&op("op1"), &CallId::new("c1"))
        .await
        .unwrap();
    assert!(data.temp_resources.is_empty());
}
