// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared builders for ledger documents in tests.
//!
//! Gated behind the `test-support` feature so other crates can build
//! realistic fixtures without repeating field soup.

use crate::clock::{Clock, FakeClock};
use crate::id::{CallId, OperationId, ParticipantId};
use crate::ledger::{CallFrame, FrameState, LedgerData, TempResource};
use chrono::{DateTime, Utc};

/// Build a running ledger with no frames.
pub fn ledger(op: &str, initiator: &str) -> LedgerData {
    ledger_at(op, initiator, FakeClock::new().now_utc())
}

/// Build a running ledger with an explicit creation time.
pub fn ledger_at(op: &str, initiator: &str, now: DateTime<Utc>) -> LedgerData {
    LedgerData::new(
        OperationId::new(op),
        ParticipantId::new(initiator),
        now,
        None,
    )
}

/// Build an active frame heartbeating at `now`.
pub fn frame(participant: &str, call: &str, pid: u32, now: DateTime<Utc>) -> CallFrame {
    CallFrame {
        participant_id: ParticipantId::new(participant),
        call_id: CallId::new(call),
        pid,
        start_time: now,
        last_heartbeat: now,
        state: FrameState::Active,
        fail_on_crash: true,
        description: None,
        resources: Vec::new(),
    }
}

/// Build a registered resource owned by `pid`.
pub fn resource(path: &str, pid: u32, now: DateTime<Utc>) -> TempResource {
    TempResource {
        path: path.to_string(),
        owner: pid,
        registered_at: now,
    }
}
