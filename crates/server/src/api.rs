// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route handlers: the engine's verbs over stateless HTTP.
//!
//! | Route                | Method | Maps to                         |
//! |----------------------|--------|---------------------------------|
//! | `/status`            | GET    | server health for discovery     |
//! | `/operations`        | POST   | createOperation                 |
//! | `/operations/{id}`   | GET    | readState                       |
//! | `/operations/{id}`   | POST   | dispatch on the `action` field  |

use crate::{ServerState, SERVICE_NAME};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dl_core::{CallId, LedgerError, OperationId, ParticipantId};
use dl_engine::{FrameSpec, LedgerOps};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Build the router over shared server state.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/operations", post(create_operation))
        .route("/operations/{id}", get(read_operation).post(dispatch_action))
        .with_state(state)
}

/// Engine error carried out of a handler.
///
/// Serialized as `{ "error": { "kind", "message" } }` with the taxonomy's
/// status code.
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "error": { "kind": self.0.kind(), "message": self.0.to_string() }
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    service: &'static str,
    version: &'static str,
    port: u16,
    base_path: String,
    uptime_ms: u64,
}

async fn status(State(state): State<Arc<ServerState>>) -> Json<StatusBody> {
    Json(StatusBody {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        port: state.port,
        base_path: state.base_path.display().to_string(),
        uptime_ms: state.started.elapsed().as_millis() as u64,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    participant_id: ParticipantId,
    operation_id: OperationId,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Body of `POST /operations/{id}`, dispatched on the `action` field.
///
/// Every body also carries `participantId`; variants that do not need it
/// simply ignore the extra field.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum ActionRequest {
    PushFrame {
        participant_id: ParticipantId,
        call_id: CallId,
        pid: u32,
        #[serde(default)]
        fail_on_crash: bool,
        #[serde(default)]
        description: Option<String>,
    },
    PopFrame {
        call_id: CallId,
    },
    Heartbeat {
        participant_id: ParticipantId,
    },
    RegisterResource {
        call_id: CallId,
        path: String,
    },
    ReleaseResource {
        path: String,
    },
    Abort {
        #[serde(default)]
        reason: Option<String>,
    },
    Complete,
    SweepStale {
        timeout_ms: u64,
    },
}

/// Parse a request body, surfacing failures as `Malformed` (HTTP 400)
/// instead of axum's default rejection.
fn parse_body<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError(LedgerError::Malformed(e.to_string())))
}

async fn create_operation(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let req: CreateRequest = parse_body(body)?;
    let data = state
        .ledger
        .create_operation(&req.operation_id, &req.participant_id, req.metadata)
        .await?;
    Ok(Json(data).into_response())
}

async fn read_operation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.ledger.read_state(&OperationId::new(id)).await?;
    Ok(Json(data).into_response())
}

async fn dispatch_action(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let operation_id = OperationId::new(id);
    let action: ActionRequest = parse_body(body)?;
    debug!(operation = %operation_id, ?action, "dispatching action");

    let ledger = &state.ledger;
    let response = match action {
        ActionRequest::PushFrame {
            participant_id,
            call_id,
            pid,
            fail_on_crash,
            description,
        } => {
            let spec = FrameSpec {
                participant_id,
                call_id,
                pid,
                fail_on_crash,
                description,
            };
            Json(ledger.push_call_frame(&operation_id, spec).await?).into_response()
        }
        ActionRequest::PopFrame { call_id } => {
            Json(ledger.pop_call_frame(&operation_id, &call_id).await?).into_response()
        }
        ActionRequest::Heartbeat { participant_id } => {
            Json(ledger.heartbeat(&operation_id, &participant_id).await?).into_response()
        }
        ActionRequest::RegisterResource { call_id, path } => Json(
            ledger
                .register_resource(&operation_id, &call_id, &path)
                .await?,
        )
        .into_response(),
        ActionRequest::ReleaseResource { path } => {
            Json(ledger.release_resource(&operation_id, &path).await?).into_response()
        }
        ActionRequest::Abort { reason } => Json(
            ledger
                .abort(&operation_id, reason.as_deref().unwrap_or("unspecified"))
                .await?,
        )
        .into_response(),
        ActionRequest::Complete => {
            Json(ledger.complete(&operation_id).await?).into_response()
        }
        ActionRequest::SweepStale { timeout_ms } => {
            Json(ledger.sweep_stale(&operation_id, timeout_ms).await?).into_response()
        }
    };
    Ok(response)
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
