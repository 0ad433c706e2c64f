// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-participant operation façade.
//!
//! The handle caches `(operation_id, participant_id, pid)` so call sites
//! pass nothing redundant, and owns the participant's heartbeat task. It
//! delegates to whatever [`LedgerOps`] it was built over: the local engine
//! or a remote client.

use crate::heartbeat::{HeartbeatEvents, HeartbeatTask, DEFAULT_HEARTBEAT_INTERVAL};
use crate::ops::{FrameSpec, LedgerOps};
use chrono::{DateTime, Utc};
use dl_core::{
    format_elapsed_since, CallId, HeartbeatResult, LedgerData, LedgerError, OperationId,
    ParticipantId,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// One participant's view of one operation.
pub struct OperationHandle<L: LedgerOps + ?Sized + 'static> {
    ledger: Arc<L>,
    operation_id: OperationId,
    participant_id: ParticipantId,
    pid: u32,
    opened_at: DateTime<Utc>,
    heartbeat: Mutex<Option<HeartbeatTask>>,
}

impl<L: LedgerOps + ?Sized + 'static> OperationHandle<L> {
    pub fn new(
        ledger: Arc<L>,
        operation_id: impl Into<OperationId>,
        participant_id: impl Into<ParticipantId>,
    ) -> Self {
        Self {
            ledger,
            operation_id: operation_id.into(),
            participant_id: participant_id.into(),
            pid: std::process::id(),
            opened_at: Utc::now(),
            heartbeat: Mutex::new(None),
        }
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Human-readable time since this handle was opened.
    pub fn elapsed(&self) -> String {
        format_elapsed_since(self.opened_at, Utc::now())
    }

    /// Push a frame for this participant's current call.
    pub async fn push_stack_frame(
        &self,
        call_id: impl Into<CallId>,
        fail_on_crash: bool,
        description: Option<String>,
    ) -> Result<LedgerData, LedgerError> {
        let spec = FrameSpec {
            participant_id: self.participant_id.clone(),
            call_id: call_id.into(),
            pid: self.pid,
            fail_on_crash,
            description,
        };
        self.ledger.push_call_frame(&self.operation_id, spec).await
    }

    pub async fn pop_stack_frame(
        &self,
        call_id: impl Into<CallId>,
    ) -> Result<LedgerData, LedgerError> {
        self.ledger
            .pop_call_frame(&self.operation_id, &call_id.into())
            .await
    }

    pub async fn register_resource(
        &self,
        call_id: impl Into<CallId>,
        path: &str,
    ) -> Result<LedgerData, LedgerError> {
        self.ledger
            .register_resource(&self.operation_id, &call_id.into(), path)
            .await
    }

    pub async fn release_resource(&self, path: &str) -> Result<LedgerData, LedgerError> {
        self.ledger
            .release_resource(&self.operation_id, path)
            .await
    }

    pub async fn abort(&self, reason: &str) -> Result<LedgerData, LedgerError> {
        self.ledger.abort(&self.operation_id, reason).await
    }

    pub async fn complete(&self) -> Result<LedgerData, LedgerError> {
        self.ledger.complete(&self.operation_id).await
    }

    pub async fn read_state(&self) -> Result<LedgerData, LedgerError> {
        self.ledger.read_state(&self.operation_id).await
    }

    /// One immediate heartbeat, outside the periodic task.
    pub async fn heartbeat(&self) -> Result<HeartbeatResult, LedgerError> {
        self.ledger
            .heartbeat(&self.operation_id, &self.participant_id)
            .await
    }

    /// Start the periodic heartbeat at the default cadence.
    ///
    /// A previously running task is cancelled first.
    pub fn start_heartbeat(&self, events: Arc<dyn HeartbeatEvents>) {
        self.start_heartbeat_every(DEFAULT_HEARTBEAT_INTERVAL, events);
    }

    /// Start the periodic heartbeat at a custom cadence.
    pub fn start_heartbeat_every(&self, interval: Duration, events: Arc<dyn HeartbeatEvents>) {
        let task = HeartbeatTask::spawn(
            Arc::clone(&self.ledger),
            self.operation_id.clone(),
            self.participant_id.clone(),
            interval,
            events,
        );
        if let Some(previous) = self.heartbeat.lock().replace(task) {
            previous.cancel();
        }
    }

    /// Stop the periodic heartbeat. After this returns, no further
    /// callbacks fire; a tick in flight completes with its callbacks
    /// suppressed.
    pub async fn stop_heartbeat(&self) {
        let task = self.heartbeat.lock().take();
        if let Some(task) = task {
            task.stop().await;
        }
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
