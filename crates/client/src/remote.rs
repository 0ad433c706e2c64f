// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP counterpart of the local ledger engine.

use crate::discover;
use crate::retry::{self, AttemptError, RetryPolicy};
use async_trait::async_trait;
use dl_core::{CallId, HeartbeatResult, LedgerData, LedgerError, OperationId, ParticipantId};
use dl_engine::{FrameSpec, LedgerOps};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Per-request timeout; distinct from the retry schedule's backoff.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    kind: String,
    message: String,
}

/// A ledger served by a remote `dld`, speaking the same verbs as
/// [`dl_engine::LocalLedger`].
#[derive(Debug, Clone)]
pub struct RemoteLedger {
    base_url: String,
    participant_id: ParticipantId,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl RemoteLedger {
    /// Connect to an explicit base URL, e.g. `http://10.0.0.7:19880`.
    pub fn new(
        base_url: impl Into<String>,
        participant_id: impl Into<ParticipantId>,
    ) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            base_url,
            participant_id: participant_id.into(),
            http,
            retry: RetryPolicy::default(),
        })
    }

    /// Scan the local network for a ledger server and connect to the first
    /// one found.
    pub async fn discover(
        participant_id: impl Into<ParticipantId>,
        port: u16,
    ) -> Result<Self, LedgerError> {
        let base_url = discover::discover_server(port, None).await?;
        Self::new(base_url, participant_id)
    }

    /// Override the retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    fn operation_url(&self, operation_id: &OperationId) -> String {
        format!("{}/operations/{}", self.base_url, operation_id)
    }

    /// POST an action body to an operation, retrying transient failures.
    async fn post_action<T: DeserializeOwned>(
        &self,
        operation_id: &OperationId,
        body: serde_json::Value,
    ) -> Result<T, LedgerError> {
        let url = self.operation_url(operation_id);
        retry::retry(&self.retry, || async {
            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(classify_transport)?;
            decode_response(response).await
        })
        .await
    }
}

/// Classify a reqwest failure for the retry engine.
fn classify_transport(e: reqwest::Error) -> AttemptError {
    let retryable = e.is_connect() || e.is_timeout() || e.is_request();
    let error = LedgerError::Transport(e.to_string());
    if retryable {
        AttemptError::Retryable(error)
    } else {
        AttemptError::Fatal(error)
    }
}

/// Map a response to the engine result or a classified error.
async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AttemptError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| AttemptError::Fatal(LedgerError::Malformed(e.to_string())));
    }

    let retryable = status.as_u16() == 408 || status.as_u16() == 429 || status.is_server_error();
    let error = match response.json::<ErrorBody>().await {
        Ok(body) => LedgerError::from_wire(&body.error.kind, &body.error.message),
        Err(_) => LedgerError::Transport(format!("http status {}", status)),
    };

    if retryable {
        Err(AttemptError::Retryable(error))
    } else {
        Err(AttemptError::Fatal(error))
    }
}

#[async_trait]
impl LedgerOps for RemoteLedger {
    async fn create_operation(
        &self,
        operation_id: &OperationId,
        initiator_id: &ParticipantId,
        metadata: Option<serde_json::Value>,
    ) -> Result<LedgerData, LedgerError> {
        let url = format!("{}/operations", self.base_url);
        let body = json!({
            "participantId": initiator_id,
            "operationId": operation_id,
            "metadata": metadata,
        });
        retry::retry(&self.retry, || async {
            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(classify_transport)?;
            decode_response(response).await
        })
        .await
    }

    async fn push_call_frame(
        &self,
        operation_id: &OperationId,
        spec: FrameSpec,
    ) -> Result<LedgerData, LedgerError> {
        self.post_action(
            operation_id,
            json!({
                "participantId": spec.participant_id,
                "action": "pushFrame",
                "callId": spec.call_id,
                "pid": spec.pid,
                "failOnCrash": spec.fail_on_crash,
                "description": spec.description,
            }),
        )
        .await
    }

    async fn pop_call_frame(
        &self,
        operation_id: &OperationId,
        call_id: &CallId,
    ) -> Result<LedgerData, LedgerError> {
        self.post_action(
            operation_id,
            json!({
                "participantId": self.participant_id,
                "action": "popFrame",
                "callId": call_id,
            }),
        )
        .await
    }

    async fn heartbeat(
        &self,
        operation_id: &OperationId,
        participant_id: &ParticipantId,
    ) -> Result<HeartbeatResult, LedgerError> {
        self.post_action(
            operation_id,
            json!({
                "participantId": participant_id,
                "action": "heartbeat",
            }),
        )
        .await
    }

    async fn register_resource(
        &self,
        operation_id: &OperationId,
        call_id: &CallId,
        path: &str,
    ) -> Result<LedgerData, LedgerError> {
        self.post_action(
            operation_id,
            json!({
                "participantId": self.participant_id,
                "action": "registerResource",
                "callId": call_id,
                "path": path,
            }),
        )
        .await
    }

    async fn release_resource(
        &self,
        operation_id: &OperationId,
        path: &str,
    ) -> Result<LedgerData, LedgerError> {
        self.post_action(
            operation_id,
            json!({
                "participantId": self.participant_id,
                "action": "releaseResource",
                "path": path,
            }),
        )
        .await
    }

    async fn abort(
        &self,
        operation_id: &OperationId,
        reason: &str,
    ) -> Result<LedgerData, LedgerError> {
        self.post_action(
            operation_id,
            json!({
                "participantId": self.participant_id,
                "action": "abort",
                "reason": reason,
            }),
        )
        .await
    }

    async fn complete(&self, operation_id: &OperationId) -> Result<LedgerData, LedgerError> {
        self.post_action(
            operation_id,
            json!({
                "participantId": self.participant_id,
                "action": "complete",
            }),
        )
        .await
    }

    async fn read_state(&self, operation_id: &OperationId) -> Result<LedgerData, LedgerError> {
        let url = self.operation_url(operation_id);
        retry::retry(&self.retry, || async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(classify_transport)?;
            decode_response(response).await
        })
        .await
    }

    async fn sweep_stale(
        &self,
        operation_id: &OperationId,
        timeout_ms: u64,
    ) -> Result<LedgerData, LedgerError> {
        self.post_action(
            operation_id,
            json!({
                "participantId": self.participant_id,
                "action": "sweepStale",
                "timeoutMs": timeout_ms,
            }),
        )
        .await
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
