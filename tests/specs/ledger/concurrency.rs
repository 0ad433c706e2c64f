//! Cross-writer atomicity: concurrent mutators serialize via the file lock.

use crate::prelude::*;
use dl_core::{CallId, OperationId, ParticipantId};
use dl_engine::{FrameSpec, LedgerConfig, LedgerOps, LocalLedger};
use std::sync::Arc;
use std::time::Duration;

fn op(id: &str) -> OperationId {
    OperationId::new(id)
}

#[tokio::test]
async fn simultaneous_pushes_both_land() {
    let l = ledger();
    let config = LedgerConfig::new(l.dir.path()).with_lock_timeout(Duration::from_secs(5));
    let other = LocalLedger::with_clock(config, l.clock.clone());

    l.engine
        .create_operation(&op("op6"), &ParticipantId::new("cli"), None)
        .await
        .unwrap();

    let op6 = op("op6");
    let (a, b) = tokio::join!(
        l.engine.push_call_frame(&op6, FrameSpec::new("cli", "c1", 1)),
        other.push_call_frame(&op6, FrameSpec::new("worker", "c2", 2)),
    );
    a.unwrap();
    b.unwrap();

    let data = l.engine.read_state(&op("op6")).await.unwrap();
    assert_eq!(data.call_frames.len(), 2);
    let ids: Vec<&str> = data
        .call_frames
        .iter()
        .map(|f| f.call_id.as_str())
        .collect();
    assert!(ids.contains(&"c1"));
    assert!(ids.contains(&"c2"));
}

#[tokio::test]
async fn interleaved_writers_lose_no_frames() {
    let l = ledger();
    let engine_a = Arc::clone(&l.engine);
    let config = LedgerConfig::new(l.dir.path()).with_lock_timeout(Duration::from_secs(5));
    let engine_b = Arc::new(LocalLedger::with_clock(config, l.clock.clone()));

    l.engine
        .create_operation(&op("op6"), &ParticipantId::new("cli"), None)
        .await
        .unwrap();

    let task_a = tokio::spawn({
        let engine = Arc::clone(&engine_a);
        async move {
            for i in 0..10 {
                engine
                    .push_call_frame(&op("op6"), FrameSpec::new("a", format!("a{i}"), 1))
                    .await
                    .unwrap();
            }
        }
    });
    let task_b = tokio::spawn({
        let engine = Arc::clone(&engine_b);
        async move {
            for i in 0..10 {
                engine
                    .push_call_frame(&op("op6"), FrameSpec::new("b", format!("b{i}"), 2))
                    .await
                    .unwrap();
            }
        }
    });
    task_a.await.unwrap();
    task_b.await.unwrap();

    let data = l.engine.read_state(&op("op6")).await.unwrap();
    assert_eq!(data.call_frames.len(), 20);

    // Per-writer order is preserved even though the interleaving is free
    let a_frames: Vec<&str> = data
        .call_frames
        .iter()
        .filter(|f| f.participant_id == "a")
        .map(|f| f.call_id.as_str())
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("a{i}")).collect();
    assert_eq!(a_frames, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn concurrent_heartbeats_and_pushes_serialize() {
    let l = ledger();
    let engine = Arc::clone(&l.engine);

    l.engine
        .create_operation(&op("op6"), &ParticipantId::new("cli"), None)
        .await
        .unwrap();
    l.engine
        .push_call_frame(&op("op6"), FrameSpec::new("cli", "c0", 1))
        .await
        .unwrap();

    let beats = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move {
            for _ in 0..10 {
                engine
                    .heartbeat(&op("op6"), &ParticipantId::new("cli"))
                    .await
                    .unwrap();
            }
        }
    });
    let pushes = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move {
            for i in 1..=5 {
                engine
                    .push_call_frame(&op("op6"), FrameSpec::new("worker", format!("c{i}"), 2))
                    .await
                    .unwrap();
            }
        }
    });
    beats.await.unwrap();
    pushes.await.unwrap();

    let data = l.engine.read_state(&op("op6")).await.unwrap();
    assert_eq!(data.call_frames.len(), 6);

    // Unwind in LIFO order
    for i in (1..=5).rev() {
        l.engine
            .pop_call_frame(&op("op6"), &CallId::new(format!("c{i}")))
            .await
            .unwrap();
    }
    l.engine
        .pop_call_frame(&op("op6"), &CallId::new("c0"))
        .await
        .unwrap();
    l.engine.complete(&op("op6")).await.unwrap();
}
