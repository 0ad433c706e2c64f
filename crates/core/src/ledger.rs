// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ledger document: one operation's record of participants, call frames,
//! and temporary resources.
//!
//! One ledger file holds one [`LedgerData`]. Field names here mirror the
//! on-disk document (camelCase on the wire); the `stack` alias keeps ledgers
//! written by older releases readable.

use crate::id::{CallId, OperationId, ParticipantId};
use crate::time_fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operation-wide lifecycle state.
///
/// Legal transitions: running → cleanup → failed, or running → completed.
/// Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    #[default]
    Running,
    Cleanup,
    Failed,
    Completed,
}

impl OperationState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Failed | OperationState::Completed)
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationState::Running => write!(f, "running"),
            OperationState::Cleanup => write!(f, "cleanup"),
            OperationState::Failed => write!(f, "failed"),
            OperationState::Completed => write!(f, "completed"),
        }
    }
}

/// Per-frame lifecycle state.
///
/// active → crashed (stale sweep) → cleaningup → cleanedup → removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameState {
    #[default]
    Active,
    Crashed,
    CleaningUp,
    CleanedUp,
}

impl std::fmt::Display for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameState::Active => write!(f, "active"),
            FrameState::Crashed => write!(f, "crashed"),
            FrameState::CleaningUp => write!(f, "cleaningup"),
            FrameState::CleanedUp => write!(f, "cleanedup"),
        }
    }
}

/// One active nested invocation by one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub participant_id: ParticipantId,
    /// Unique within the operation; pops must match the top frame's id.
    pub call_id: CallId,
    pub pid: u32,
    #[serde(with = "time_fmt::ts_ms")]
    pub start_time: DateTime<Utc>,
    /// Authoritative liveness signal for this participant.
    #[serde(with = "time_fmt::ts_ms")]
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default)]
    pub state: FrameState,
    /// A crash of this frame's process fails the whole operation when true;
    /// when false the crash is contained and the frame is silently removed.
    #[serde(default)]
    pub fail_on_crash: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Paths this call registered, in registration order.
    #[serde(default)]
    pub resources: Vec<String>,
}

impl CallFrame {
    /// Age of the frame's heartbeat at `now`, in milliseconds.
    ///
    /// Clock skew can put `last_heartbeat` ahead of `now`; that clamps to 0.
    pub fn heartbeat_age_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.last_heartbeat).num_milliseconds().max(0) as u64
    }
}

/// A filesystem path owned by the operation that must be cleaned up when the
/// operation ends or fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempResource {
    /// Unique key within the operation.
    pub path: String,
    /// Pid of the registering process.
    pub owner: u32,
    #[serde(with = "time_fmt::ts_ms")]
    pub registered_at: DateTime<Utc>,
}

/// The operation record: one ledger file per operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerData {
    pub operation_id: OperationId,
    /// The participant that created the record.
    pub initiator_id: ParticipantId,
    /// Wall-clock creation instant; used only for elapsed-time reporting.
    #[serde(with = "time_fmt::ts_ms")]
    pub start_time: DateTime<Utc>,
    /// Monotonic: once true, never cleared.
    #[serde(default)]
    pub aborted: bool,
    #[serde(default)]
    pub operation_state: OperationState,
    /// Coarse global heartbeat, refreshed on any write. Retained for
    /// backward compatibility; per-frame heartbeats are authoritative.
    #[serde(with = "time_fmt::ts_ms")]
    pub last_heartbeat: DateTime<Utc>,
    /// The call stack, newest frame last. Insertion order is significant.
    #[serde(default, alias = "stack")]
    pub call_frames: Vec<CallFrame>,
    /// Unique by `path`; insertion order irrelevant.
    #[serde(default)]
    pub temp_resources: Vec<TempResource>,
    /// When a stale sweep first detected a fatal crash.
    #[serde(
        default,
        with = "time_fmt::ts_ms::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub detection_timestamp: Option<DateTime<Utc>>,
    /// When cleanup finished draining the stack.
    #[serde(
        default,
        with = "time_fmt::ts_ms::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub removal_timestamp: Option<DateTime<Utc>>,
    /// Opaque caller-supplied metadata from createOperation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl LedgerData {
    /// A fresh running record with an empty stack and no resources.
    pub fn new(
        operation_id: OperationId,
        initiator_id: ParticipantId,
        now: DateTime<Utc>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            operation_id,
            initiator_id,
            start_time: now,
            aborted: false,
            operation_state: OperationState::Running,
            last_heartbeat: now,
            call_frames: Vec::new(),
            temp_resources: Vec::new(),
            detection_timestamp: None,
            removal_timestamp: None,
            metadata,
        }
    }

    /// The newest frame, if any.
    pub fn top_frame(&self) -> Option<&CallFrame> {
        self.call_frames.last()
    }

    /// Find a frame by call id.
    pub fn frame(&self, call_id: &CallId) -> Option<&CallFrame> {
        self.call_frames.iter().find(|f| f.call_id == *call_id)
    }

    /// Mutable lookup by call id.
    pub fn frame_mut(&mut self, call_id: &CallId) -> Option<&mut CallFrame> {
        self.call_frames.iter_mut().find(|f| f.call_id == *call_id)
    }

    /// Find a registered resource by path.
    pub fn resource(&self, path: &str) -> Option<&TempResource> {
        self.temp_resources.iter().find(|r| r.path == path)
    }

    /// Whether new frames and resources are accepted.
    ///
    /// Once the abort flag is set or the operation leaves running, nothing
    /// new may be added.
    pub fn accepts_work(&self) -> bool {
        !self.aborted && self.operation_state == OperationState::Running
    }

    /// Participants with at least one frame on the stack, in stack order,
    /// deduplicated.
    pub fn participants(&self) -> Vec<ParticipantId> {
        let mut out: Vec<ParticipantId> = Vec::new();
        for frame in &self.call_frames {
            if !out.contains(&frame.participant_id) {
                out.push(frame.participant_id.clone());
            }
        }
        out
    }

    /// Whether the ledger file is eligible for deletion: empty stack, no
    /// resources, and a terminal state.
    pub fn deletable(&self) -> bool {
        self.call_frames.is_empty()
            && self.temp_resources.is_empty()
            && self.operation_state.is_terminal()
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
