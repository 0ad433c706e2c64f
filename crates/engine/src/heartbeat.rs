// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic heartbeat driver.
//!
//! A [`HeartbeatTask`] beats one participant's frames at a fixed cadence
//! for as long as the participant is active, reporting each outcome to an
//! injected [`HeartbeatEvents`] listener. The task stops itself when the
//! operation signals abort; other failures are reported and the beat
//! continues.

use crate::ops::LedgerOps;
use dl_core::{HeartbeatResult, LedgerError, OperationId, ParticipantId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Default beat cadence.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Listener for heartbeat outcomes.
///
/// All methods default to no-ops so implementors subscribe only to what
/// they need. Callbacks run on the heartbeat task and must not re-enter
/// the engine.
pub trait HeartbeatEvents: Send + Sync {
    /// The participant's frame heartbeat was refreshed.
    fn on_success(&self, _result: &HeartbeatResult) {}

    /// An engine or transport failure; the task keeps beating.
    fn on_error(&self, _error: &LedgerError) {}

    /// The operation is aborted or unwinding; fired once, then the task
    /// stops itself.
    fn on_abort(&self, _result: &HeartbeatResult) {}

    /// Other participants have stale heartbeats.
    fn on_stale(&self, _result: &HeartbeatResult) {}
}

/// A running heartbeat loop for one participant in one operation.
pub struct HeartbeatTask {
    suppress: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl HeartbeatTask {
    /// Spawn the beat loop. The first beat fires immediately.
    pub fn spawn<L: LedgerOps + ?Sized + 'static>(
        ledger: Arc<L>,
        operation_id: OperationId,
        participant_id: ParticipantId,
        interval: Duration,
        events: Arc<dyn HeartbeatEvents>,
    ) -> Self {
        let suppress = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&suppress);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let beat = ledger.heartbeat(&operation_id, &participant_id).await;

                // stop() was called while the beat was in flight; the tick
                // completed but its callbacks are suppressed.
                if flag.load(Ordering::Acquire) {
                    return;
                }

                match beat {
                    Ok(result) => {
                        if result.abort_flag {
                            debug!(
                                operation = %operation_id,
                                participant = %participant_id,
                                "abort observed, heartbeat stopping"
                            );
                            events.on_abort(&result);
                            return;
                        }
                        if !result.stale_participants.is_empty() {
                            events.on_stale(&result);
                        }
                        if result.heartbeat_updated {
                            events.on_success(&result);
                        }
                    }
                    Err(e) => events.on_error(&e),
                }
            }
        });

        Self { suppress, handle }
    }

    /// Synchronously bar any further callbacks and cancel the loop.
    pub fn cancel(&self) {
        self.suppress.store(true, Ordering::Release);
        self.handle.abort();
    }

    /// Stop the loop. After this returns, no callback will fire.
    pub async fn stop(self) {
        self.cancel();
        let _ = self.handle.await;
    }

    /// Whether the loop has exited (stopped itself on abort, or cancelled).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
