// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The heartbeat verb's result document.
//!
//! This is the single mechanism by which a participant learns that it should
//! abort: the scheduler inspects `abort_flag` and `stale_participants` on
//! every tick.

use crate::id::ParticipantId;
use crate::ledger::LedgerData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything a participant learns from one heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResult {
    /// True when the operation is aborted or already unwinding; the
    /// participant is expected to stop and clean up.
    pub abort_flag: bool,
    /// False when no ledger file exists for the operation (it finished, or
    /// was never created).
    pub ledger_exists: bool,
    /// Whether this participant had a frame whose heartbeat was refreshed.
    pub heartbeat_updated: bool,
    pub call_frame_count: usize,
    pub temp_resource_count: usize,
    /// Age of the coarse global heartbeat before this beat, if a ledger exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_age_ms: Option<u64>,
    /// Whether the global heartbeat age exceeded the staleness timeout.
    pub is_stale: bool,
    /// Participants with frames on the stack, in stack order.
    pub participants: Vec<ParticipantId>,
    /// Most recent per-participant heartbeat ages, after this beat.
    pub participant_heartbeat_ages: HashMap<ParticipantId, u64>,
    /// Participants whose age exceeds the staleness timeout.
    pub stale_participants: Vec<ParticipantId>,
    /// Ledger snapshot before the beat was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_before: Option<LedgerData>,
    /// Ledger snapshot after the beat was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_after: Option<LedgerData>,
}

impl HeartbeatResult {
    /// Result for a heartbeat against an operation with no ledger file.
    ///
    /// Not an error: the operation may simply have completed and been
    /// deleted by another participant.
    pub fn no_ledger() -> Self {
        Self {
            abort_flag: false,
            ledger_exists: false,
            heartbeat_updated: false,
            call_frame_count: 0,
            temp_resource_count: 0,
            heartbeat_age_ms: None,
            is_stale: false,
            participants: Vec::new(),
            participant_heartbeat_ages: HashMap::new(),
            stale_participants: Vec::new(),
            data_before: None,
            data_after: None,
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
