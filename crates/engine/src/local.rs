// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local ledger engine.
//!
//! Every public verb is a single [`FileStore::transact`] on the operation's
//! ledger file, so each mutation is all-or-nothing under the cross-process
//! lock. No in-memory state is authoritative; disk is truth.

use crate::ops::{FrameSpec, LedgerOps};
use async_trait::async_trait;
use dl_core::{
    CallFrame, CallId, Clock, FrameState, HeartbeatResult, LedgerData, LedgerError, OperationId,
    OperationState, ParticipantId, SystemClock,
};
use dl_storage::{codec, BackupListener, FileStore, TxnOutcome};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default heartbeat age past which a frame counts as crashed.
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Directory holding `<operationId>.json` ledger files.
    pub base_dir: PathBuf,
    /// Total bound on advisory lock acquisition.
    pub lock_timeout: Duration,
    /// Staleness threshold used by the heartbeat verb.
    pub stale_timeout: Duration,
}

impl LedgerConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            lock_timeout: dl_storage::DEFAULT_LOCK_TIMEOUT,
            stale_timeout: DEFAULT_STALE_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout = timeout;
        self
    }
}

/// The ledger state machine over a local directory.
pub struct LocalLedger<C: Clock = SystemClock> {
    config: LedgerConfig,
    store: FileStore,
    clock: C,
}

impl LocalLedger<SystemClock> {
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> LocalLedger<C> {
    /// Build an engine with an injected clock (tests use [`dl_core::FakeClock`]).
    pub fn with_clock(config: LedgerConfig, clock: C) -> Self {
        let store = FileStore::new().with_lock_timeout(config.lock_timeout);
        Self {
            config,
            store,
            clock,
        }
    }

    /// Install a backup observer on the underlying store.
    pub fn with_backup_listener(mut self, listener: Arc<dyn BackupListener>) -> Self {
        self.store = FileStore::new()
            .with_lock_timeout(self.config.lock_timeout)
            .with_listener(listener);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }

    /// Path of the ledger file for an operation.
    pub fn ledger_path(&self, operation_id: &OperationId) -> PathBuf {
        self.config.base_dir.join(format!("{}.json", operation_id))
    }
}

/// Decode the transaction's current bytes, requiring the file to exist.
fn decode_required(current: Option<Vec<u8>>) -> Result<LedgerData, LedgerError> {
    match current {
        Some(bytes) => Ok(codec::decode(&bytes)?),
        None => Err(LedgerError::NotFound),
    }
}

/// Remove a frame and any resources it still holds.
fn remove_frame(data: &mut LedgerData, call_id: &CallId) {
    if let Some(pos) = data.call_frames.iter().position(|f| f.call_id == *call_id) {
        let frame = data.call_frames.remove(pos);
        data.temp_resources
            .retain(|r| !frame.resources.contains(&r.path));
    }
}

/// Release the resources registered by a frame, clearing its back-references.
fn release_frame_resources(data: &mut LedgerData, call_id: &CallId) {
    let paths = match data.frame_mut(call_id) {
        Some(frame) => std::mem::take(&mut frame.resources),
        None => return,
    };
    data.temp_resources.retain(|r| !paths.contains(&r.path));
}

/// Write-or-delete outcome for a mutated document.
fn commit(data: LedgerData) -> Result<(TxnOutcome, LedgerData), LedgerError> {
    if data.deletable() {
        Ok((TxnOutcome::Delete, data))
    } else {
        Ok((TxnOutcome::Write(codec::encode(&data)?), data))
    }
}

#[async_trait]
impl<C: Clock> LedgerOps for LocalLedger<C> {
    async fn create_operation(
        &self,
        operation_id: &OperationId,
        initiator_id: &ParticipantId,
        metadata: Option<serde_json::Value>,
    ) -> Result<LedgerData, LedgerError> {
        std::fs::create_dir_all(&self.config.base_dir)?;
        let now = self.clock.now_utc();
        let data = LedgerData::new(
            operation_id.clone(),
            initiator_id.clone(),
            now,
            metadata,
        );

        let path = self.ledger_path(operation_id);
        let created = self
            .store
            .transact(&path, move |current| {
                if current.is_some() {
                    return Err(LedgerError::AlreadyExists);
                }
                Ok((TxnOutcome::Write(codec::encode(&data)?), data))
            })
            .await?;

        info!(operation = %operation_id, initiator = %initiator_id, "operation created");
        Ok(created)
    }

    async fn push_call_frame(
        &self,
        operation_id: &OperationId,
        spec: FrameSpec,
    ) -> Result<LedgerData, LedgerError> {
        let now = self.clock.now_utc();
        let path = self.ledger_path(operation_id);

        let data = self
            .store
            .transact(&path, move |current| {
                let mut data = decode_required(current)?;
                if data.aborted {
                    return Err(LedgerError::Aborted);
                }
                if data.operation_state != OperationState::Running {
                    return Err(LedgerError::NotRunning);
                }
                if data.frame(&spec.call_id).is_some() {
                    return Err(LedgerError::DuplicateCallId);
                }

                data.call_frames.push(CallFrame {
                    participant_id: spec.participant_id,
                    call_id: spec.call_id,
                    pid: spec.pid,
                    start_time: now,
                    last_heartbeat: now,
                    state: FrameState::Active,
                    fail_on_crash: spec.fail_on_crash,
                    description: spec.description,
                    resources: Vec::new(),
                });
                data.last_heartbeat = now;
                Ok((TxnOutcome::Write(codec::encode(&data)?), data))
            })
            .await?;

        debug!(operation = %operation_id, frames = data.call_frames.len(), "frame pushed");
        Ok(data)
    }

    async fn pop_call_frame(
        &self,
        operation_id: &OperationId,
        call_id: &CallId,
    ) -> Result<LedgerData, LedgerError> {
        let now = self.clock.now_utc();
        let path = self.ledger_path(operation_id);
        let call_id = call_id.clone();

        let data = self
            .store
            .transact(&path, move |current| {
                let mut data = decode_required(current)?;
                if data.frame(&call_id).is_none() {
                    return Err(LedgerError::UnknownCallId);
                }
                match data.top_frame() {
                    Some(top) if top.call_id == call_id => {}
                    _ => return Err(LedgerError::NotTop),
                }

                remove_frame(&mut data, &call_id);
                data.last_heartbeat = now;
                Ok((TxnOutcome::Write(codec::encode(&data)?), data))
            })
            .await?;

        debug!(operation = %operation_id, frames = data.call_frames.len(), "frame popped");
        Ok(data)
    }

    async fn heartbeat(
        &self,
        operation_id: &OperationId,
        participant_id: &ParticipantId,
    ) -> Result<HeartbeatResult, LedgerError> {
        let now = self.clock.now_utc();
        let stale_ms = self.config.stale_timeout.as_millis() as u64;
        let path = self.ledger_path(operation_id);
        let participant_id = participant_id.clone();

        self.store
            .transact(&path, move |current| {
                let Some(bytes) = current else {
                    return Ok((TxnOutcome::Unchanged, HeartbeatResult::no_ledger()));
                };
                let mut data = codec::decode(&bytes).map_err(LedgerError::from)?;
                let before = data.clone();

                let global_age = (now - data.last_heartbeat).num_milliseconds().max(0) as u64;

                let mut heartbeat_updated = false;
                for frame in data
                    .call_frames
                    .iter_mut()
                    .filter(|f| f.participant_id == participant_id)
                {
                    frame.last_heartbeat = now;
                    heartbeat_updated = true;
                }
                data.last_heartbeat = now;

                let participants = data.participants();
                let mut participant_heartbeat_ages = HashMap::new();
                let mut stale_participants = Vec::new();
                for p in &participants {
                    // A participant's age is its freshest frame's age;
                    // ties resolve by stack insertion order.
                    let age = data
                        .call_frames
                        .iter()
                        .filter(|f| f.participant_id == *p)
                        .map(|f| f.heartbeat_age_ms(now))
                        .min()
                        .unwrap_or(0);
                    if age > stale_ms {
                        stale_participants.push(p.clone());
                    }
                    participant_heartbeat_ages.insert(p.clone(), age);
                }

                let result = HeartbeatResult {
                    abort_flag: data.aborted
                        || matches!(
                            data.operation_state,
                            OperationState::Cleanup | OperationState::Failed
                        ),
                    ledger_exists: true,
                    heartbeat_updated,
                    call_frame_count: data.call_frames.len(),
                    temp_resource_count: data.temp_resources.len(),
                    heartbeat_age_ms: Some(global_age),
                    is_stale: global_age > stale_ms,
                    participants,
                    participant_heartbeat_ages,
                    stale_participants,
                    data_before: Some(before),
                    data_after: Some(data.clone()),
                };
                Ok((TxnOutcome::Write(codec::encode(&data)?), result))
            })
            .await
    }

    async fn register_resource(
        &self,
        operation_id: &OperationId,
        call_id: &CallId,
        path: &str,
    ) -> Result<LedgerData, LedgerError> {
        let now = self.clock.now_utc();
        let ledger_path = self.ledger_path(operation_id);
        let call_id = call_id.clone();
        let resource_path = path.to_string();

        let data = self
            .store
            .transact(&ledger_path, move |current| {
                let mut data = decode_required(current)?;
                if data.aborted {
                    return Err(LedgerError::Aborted);
                }
                if data.operation_state != OperationState::Running {
                    return Err(LedgerError::NotRunning);
                }
                if data.resource(&resource_path).is_some() {
                    return Err(LedgerError::Duplicate);
                }
                let Some(frame) = data.frame_mut(&call_id) else {
                    return Err(LedgerError::UnknownCallId);
                };

                let owner = frame.pid;
                frame.resources.push(resource_path.clone());
                data.temp_resources.push(dl_core::TempResource {
                    path: resource_path,
                    owner,
                    registered_at: now,
                });
                data.last_heartbeat = now;
                Ok((TxnOutcome::Write(codec::encode(&data)?), data))
            })
            .await?;

        debug!(operation = %operation_id, resources = data.temp_resources.len(), "resource registered");
        Ok(data)
    }

    async fn release_resource(
        &self,
        operation_id: &OperationId,
        path: &str,
    ) -> Result<LedgerData, LedgerError> {
        let now = self.clock.now_utc();
        let ledger_path = self.ledger_path(operation_id);
        let resource_path = path.to_string();

        let data = self
            .store
            .transact(&ledger_path, move |current| {
                let mut data = decode_required(current)?;
                if data.resource(&resource_path).is_none() {
                    return Err(LedgerError::Unknown);
                }

                data.temp_resources.retain(|r| r.path != resource_path);
                for frame in data.call_frames.iter_mut() {
                    frame.resources.retain(|p| *p != resource_path);
                }
                data.last_heartbeat = now;
                Ok((TxnOutcome::Write(codec::encode(&data)?), data))
            })
            .await?;

        debug!(operation = %operation_id, resources = data.temp_resources.len(), "resource released");
        Ok(data)
    }

    async fn abort(
        &self,
        operation_id: &OperationId,
        reason: &str,
    ) -> Result<LedgerData, LedgerError> {
        let now = self.clock.now_utc();
        let path = self.ledger_path(operation_id);

        let data = self
            .store
            .transact(&path, move |current| {
                let mut data = decode_required(current)?;
                if data.aborted {
                    return Ok::<_, LedgerError>((TxnOutcome::Unchanged, data));
                }

                data.aborted = true;
                if data.operation_state == OperationState::Running {
                    data.operation_state = OperationState::Cleanup;
                    if data.detection_timestamp.is_none() {
                        data.detection_timestamp = Some(now);
                    }
                }
                data.last_heartbeat = now;
                Ok((TxnOutcome::Write(codec::encode(&data)?), data))
            })
            .await?;

        info!(operation = %operation_id, reason, "operation aborted");
        Ok(data)
    }

    async fn complete(&self, operation_id: &OperationId) -> Result<LedgerData, LedgerError> {
        let now = self.clock.now_utc();
        let path = self.ledger_path(operation_id);

        let data = self
            .store
            .transact(&path, move |current| {
                let mut data = decode_required(current)?;
                if !data.call_frames.is_empty() {
                    return Err(LedgerError::NonEmptyStack);
                }

                match data.operation_state {
                    OperationState::Running => {
                        data.operation_state = OperationState::Completed;
                    }
                    OperationState::Cleanup => {
                        // The only legal edge out of cleanup
                        data.operation_state = OperationState::Failed;
                        data.removal_timestamp = Some(now);
                    }
                    OperationState::Failed | OperationState::Completed => {}
                }
                data.last_heartbeat = now;
                commit(data)
            })
            .await?;

        info!(operation = %operation_id, state = %data.operation_state, "operation completed");
        Ok(data)
    }

    async fn read_state(&self, operation_id: &OperationId) -> Result<LedgerData, LedgerError> {
        let path = self.ledger_path(operation_id);
        let bytes = self.store.read_locked(&path).await?;
        Ok(codec::decode(&bytes)?)
    }

    async fn sweep_stale(
        &self,
        operation_id: &OperationId,
        timeout_ms: u64,
    ) -> Result<LedgerData, LedgerError> {
        let now = self.clock.now_utc();
        let path = self.ledger_path(operation_id);
        let op = operation_id.clone();

        self.store
            .transact(&path, move |current| {
                let mut data = decode_required(current)?;
                let mut changed = false;

                // Mark over-age active frames as crashed.
                let mut fatal_crash = false;
                let mut newly_crashed: Vec<CallId> = Vec::new();
                for frame in data.call_frames.iter_mut() {
                    if frame.state == FrameState::Active
                        && frame.heartbeat_age_ms(now) > timeout_ms
                    {
                        warn!(
                            operation = %op,
                            call = %frame.call_id,
                            participant = %frame.participant_id,
                            age_ms = frame.heartbeat_age_ms(now),
                            fail_on_crash = frame.fail_on_crash,
                            "stale frame marked crashed"
                        );
                        frame.state = FrameState::Crashed;
                        newly_crashed.push(frame.call_id.clone());
                        if frame.fail_on_crash {
                            fatal_crash = true;
                        }
                        changed = true;
                    }
                }

                if fatal_crash && data.operation_state == OperationState::Running {
                    data.operation_state = OperationState::Cleanup;
                    if data.detection_timestamp.is_none() {
                        data.detection_timestamp = Some(now);
                    }
                    changed = true;
                }

                match data.operation_state {
                    OperationState::Running => {
                        // Contained crashes: silently drop the frame and its
                        // resources.
                        let crashed: Vec<CallId> = data
                            .call_frames
                            .iter()
                            .filter(|f| f.state == FrameState::Crashed)
                            .map(|f| f.call_id.clone())
                            .collect();
                        for call_id in crashed {
                            remove_frame(&mut data, &call_id);
                            changed = true;
                        }
                    }
                    OperationState::Cleanup => {
                        // Re-elect the cleanup coordinator on every sweep:
                        // first frame in stack order still active.
                        if let Some(coordinator) = data
                            .call_frames
                            .iter()
                            .find(|f| f.state == FrameState::Active)
                        {
                            debug!(
                                operation = %op,
                                coordinator = %coordinator.call_id,
                                "cleanup coordinator"
                            );
                        }

                        // Advance each crashed frame one step per sweep so
                        // intermediate states stay observable between sweeps.
                        let steps: Vec<(CallId, FrameState)> = data
                            .call_frames
                            .iter()
                            .filter(|f| !newly_crashed.contains(&f.call_id))
                            .map(|f| (f.call_id.clone(), f.state))
                            .collect();
                        for (call_id, state) in steps {
                            match state {
                                FrameState::Crashed => {
                                    if let Some(frame) = data.frame_mut(&call_id) {
                                        frame.state = FrameState::CleaningUp;
                                    }
                                    changed = true;
                                }
                                FrameState::CleaningUp => {
                                    release_frame_resources(&mut data, &call_id);
                                    if let Some(frame) = data.frame_mut(&call_id) {
                                        frame.state = FrameState::CleanedUp;
                                    }
                                    changed = true;
                                }
                                FrameState::CleanedUp => {
                                    remove_frame(&mut data, &call_id);
                                    changed = true;
                                }
                                FrameState::Active => {}
                            }
                        }

                        if data.call_frames.is_empty() {
                            data.operation_state = OperationState::Failed;
                            if data.removal_timestamp.is_none() {
                                data.removal_timestamp = Some(now);
                            }
                            changed = true;
                        }
                    }
                    OperationState::Failed | OperationState::Completed => {}
                }

                if !changed {
                    return Ok((TxnOutcome::Unchanged, data));
                }
                commit(data)
            })
            .await
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
