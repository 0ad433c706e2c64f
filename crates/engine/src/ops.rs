// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ledger capability: one verb set, two implementations.
//!
//! [`LocalLedger`](crate::LocalLedger) serves a ledger directory on this
//! machine; the remote client in `dl-client` projects the same verbs over
//! HTTP. [`OperationHandle`](crate::OperationHandle) depends only on this
//! trait and is blind to which one it holds.

use async_trait::async_trait;
use dl_core::{CallId, HeartbeatResult, LedgerData, LedgerError, OperationId, ParticipantId};

/// Everything needed to push one call frame.
#[derive(Debug, Clone)]
pub struct FrameSpec {
    pub participant_id: ParticipantId,
    pub call_id: CallId,
    pub pid: u32,
    pub fail_on_crash: bool,
    pub description: Option<String>,
}

impl FrameSpec {
    /// A fail-on-crash frame with no description.
    pub fn new(
        participant_id: impl Into<ParticipantId>,
        call_id: impl Into<CallId>,
        pid: u32,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            call_id: call_id.into(),
            pid,
            fail_on_crash: true,
            description: None,
        }
    }

    pub fn fail_on_crash(mut self, fail_on_crash: bool) -> Self {
        self.fail_on_crash = fail_on_crash;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The operation verbs shared by the local engine and the remote client.
///
/// Every mutating verb returns the post-mutation ledger snapshot so callers
/// can act on abort and staleness signals without a second read.
#[async_trait]
pub trait LedgerOps: Send + Sync {
    /// Write a fresh running ledger. Fails if the file already exists.
    async fn create_operation(
        &self,
        operation_id: &OperationId,
        initiator_id: &ParticipantId,
        metadata: Option<serde_json::Value>,
    ) -> Result<LedgerData, LedgerError>;

    /// Append a new active frame to the call stack.
    async fn push_call_frame(
        &self,
        operation_id: &OperationId,
        spec: FrameSpec,
    ) -> Result<LedgerData, LedgerError>;

    /// Remove the top frame iff its call id matches, releasing any
    /// resources it still holds.
    async fn pop_call_frame(
        &self,
        operation_id: &OperationId,
        call_id: &CallId,
    ) -> Result<LedgerData, LedgerError>;

    /// Refresh the participant's frame heartbeats and report liveness.
    ///
    /// A missing ledger is a legitimate outcome, reported through
    /// [`HeartbeatResult::no_ledger`] rather than an error.
    async fn heartbeat(
        &self,
        operation_id: &OperationId,
        participant_id: &ParticipantId,
    ) -> Result<HeartbeatResult, LedgerError>;

    /// Register a temporary path owned by the given call frame.
    async fn register_resource(
        &self,
        operation_id: &OperationId,
        call_id: &CallId,
        path: &str,
    ) -> Result<LedgerData, LedgerError>;

    /// Release a previously registered path.
    async fn release_resource(
        &self,
        operation_id: &OperationId,
        path: &str,
    ) -> Result<LedgerData, LedgerError>;

    /// Set the abort flag. Idempotent.
    async fn abort(
        &self,
        operation_id: &OperationId,
        reason: &str,
    ) -> Result<LedgerData, LedgerError>;

    /// Finish the operation. Requires an empty call stack; deletes the
    /// ledger file once it is empty and terminal.
    async fn complete(&self, operation_id: &OperationId) -> Result<LedgerData, LedgerError>;

    /// Pure read of the current snapshot.
    async fn read_state(&self, operation_id: &OperationId) -> Result<LedgerData, LedgerError>;

    /// Mark frames whose heartbeat is older than `timeout_ms` as crashed
    /// and drive crash cleanup.
    async fn sweep_stale(
        &self,
        operation_id: &OperationId,
        timeout_ms: u64,
    ) -> Result<LedgerData, LedgerError>;
}
