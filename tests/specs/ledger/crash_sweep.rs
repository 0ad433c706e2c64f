//! Staleness detection and crash cleanup.

use crate::prelude::*;
use dl_core::{CallId, FrameState, LedgerError, OperationId, OperationState, ParticipantId};
use dl_engine::{FrameSpec, LedgerOps};
use std::time::Duration;

fn op(id: &str) -> OperationId {
    OperationId::new(id)
}

#[tokio::test]
async fn fatal_crash_puts_the_operation_into_cleanup() {
    let l = ledger();

    l.engine
        .create_operation(&op("op3"), &ParticipantId::new("cli"), None)
        .await
        .unwrap();
    l.engine
        .push_call_frame(&op("op3"), FrameSpec::new("cli", "c1", 1).fail_on_crash(true))
        .await
        .unwrap();

    // 15 s of silence against a 10 s timeout
    l.clock.advance(Duration::from_secs(15));
    l.engine.sweep_stale(&op("op3"), 10_000).await.unwrap();

    let data = l.engine.read_state(&op("op3")).await.unwrap();
    assert_eq!(data.operation_state, OperationState::Cleanup);
    assert_eq!(
        data.frame(&CallId::new("c1")).unwrap().state,
        FrameState::Crashed
    );
    assert!(data.detection_timestamp.is_some());
}

#[tokio::test]
async fn contained_crash_is_silently_removed() {
    let l = ledger();

    l.engine
        .create_operation(&op("op4"), &ParticipantId::new("cli"), None)
        .await
        .unwrap();
    l.engine
        .push_call_frame(
            &op("op4"),
            FrameSpec::new("child", "c1", 2).fail_on_crash(false),
        )
        .await
        .unwrap();

    l.clock.advance(Duration::from_secs(15));
    l.engine.sweep_stale(&op("op4"), 10_000).await.unwrap();

    let data = l.engine.read_state(&op("op4")).await.unwrap();
    assert_eq!(data.operation_state, OperationState::Running);
    assert!(data.call_frames.is_empty());
    assert!(data.detection_timestamp.is_none());
}

#[tokio::test]
async fn cleanup_drains_the_crashed_stack_and_fails_the_operation() {
    let l = ledger();

    l.engine
        .create_operation(&op("op3"), &ParticipantId::new("cli"), None)
        .await
        .unwrap();
    l.engine
        .push_call_frame(&op("op3"), FrameSpec::new("cli", "c1", 1))
        .await
        .unwrap();
    l.engine
        .register_resource(&op("op3"), &CallId::new("c1"), "/tmp/crash-scratch")
        .await
        .unwrap();

    l.clock.advance(Duration::from_secs(15));

    // Detection, claim, cleanup, removal: one step per sweep
    l.engine.sweep_stale(&op("op3"), 10_000).await.unwrap();
    l.engine.sweep_stale(&op("op3"), 10_000).await.unwrap();
    let mid = l.engine.read_state(&op("op3")).await.unwrap();
    assert_eq!(
        mid.frame(&CallId::new("c1")).unwrap().state,
        FrameState::CleaningUp
    );

    l.engine.sweep_stale(&op("op3"), 10_000).await.unwrap();
    let swept = l.engine.sweep_stale(&op("op3"), 10_000).await.unwrap();
    assert_eq!(swept.operation_state, OperationState::Failed);
    assert!(swept.temp_resources.is_empty());
    assert!(swept.removal_timestamp.is_some());

    // Empty and terminal: the file is deleted
    assert_eq!(
        l.engine.read_state(&op("op3")).await.unwrap_err(),
        LedgerError::NotFound
    );
}

#[tokio::test]
async fn heartbeats_keep_a_frame_out_of_the_sweep() {
    let l = ledger();

    l.engine
        .create_operation(&op("op1"), &ParticipantId::new("cli"), None)
        .await
        .unwrap();
    l.engine
        .push_call_frame(&op("op1"), FrameSpec::new("cli", "c1", 1))
        .await
        .unwrap();

    // Beat every 6 s; never crosses the 10 s threshold
    for _ in 0..3 {
        l.clock.advance(Duration::from_secs(6));
        l.engine
            .heartbeat(&op("op1"), &ParticipantId::new("cli"))
            .await
            .unwrap();
    }
    l.engine.sweep_stale(&op("op1"), 10_000).await.unwrap();

    let data = l.engine.read_state(&op("op1")).await.unwrap();
    assert_eq!(data.operation_state, OperationState::Running);
    assert_eq!(
        data.frame(&CallId::new("c1")).unwrap().state,
        FrameState::Active
    );
}
