// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy shared by the engine, the HTTP server, and the remote
//! client.
//!
//! Every kind has a stable wire name (`kind()`) so the server can serialize
//! an error as `{ "error": { "kind", "message" } }` and the client can
//! reconstruct the same variant with [`LedgerError::from_wire`].

use thiserror::Error;

/// Named failure kinds for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No ledger file exists for the operation.
    #[error("operation not found")]
    NotFound,

    /// createOperation raced an existing ledger file.
    #[error("operation already exists")]
    AlreadyExists,

    /// The operation carries the abort flag; no new work is accepted.
    #[error("operation has been aborted")]
    Aborted,

    /// The operation left the running state; no new work is accepted.
    #[error("operation is not running")]
    NotRunning,

    /// complete was called while call frames remain on the stack.
    #[error("call stack is not empty")]
    NonEmptyStack,

    /// pushCallFrame reused a call id already on the stack.
    #[error("duplicate call id")]
    DuplicateCallId,

    /// popCallFrame named a frame that is not the top of the stack.
    #[error("call frame is not the top of the stack")]
    NotTop,

    /// The named call id does not exist in this operation.
    #[error("unknown call id")]
    UnknownCallId,

    /// registerResource named a path that is already registered.
    #[error("resource is already registered")]
    Duplicate,

    /// releaseResource named a path that was never registered.
    #[error("unknown resource path")]
    Unknown,

    /// The ledger document on disk (or on the wire) does not parse.
    #[error("malformed ledger document: {0}")]
    Malformed(String),

    /// The advisory file lock could not be acquired within the bound.
    #[error("timed out acquiring ledger lock")]
    LockTimeout,

    /// The ledger file or its directory is not accessible.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The retry engine gave up; carries the last error text and attempt count.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: String },

    /// Server auto-discovery found no responding ledger server.
    #[error("no ledger server found")]
    DiscoveryFailed,

    /// Network-level failure talking to a remote ledger.
    #[error("transport error: {0}")]
    Transport(String),

    /// Local I/O failure outside the taxonomy above.
    #[error("I/O error: {0}")]
    Io(String),
}

impl LedgerError {
    /// Stable wire name for this kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotFound => "NotFound",
            LedgerError::AlreadyExists => "AlreadyExists",
            LedgerError::Aborted => "Aborted",
            LedgerError::NotRunning => "NotRunning",
            LedgerError::NonEmptyStack => "NonEmptyStack",
            LedgerError::DuplicateCallId => "DuplicateCallId",
            LedgerError::NotTop => "NotTop",
            LedgerError::UnknownCallId => "UnknownCallId",
            LedgerError::Duplicate => "Duplicate",
            LedgerError::Unknown => "Unknown",
            LedgerError::Malformed(_) => "Malformed",
            LedgerError::LockTimeout => "LockTimeout",
            LedgerError::PermissionDenied(_) => "PermissionDenied",
            LedgerError::RetryExhausted { .. } => "RetryExhausted",
            LedgerError::DiscoveryFailed => "DiscoveryFailed",
            LedgerError::Transport(_) => "Transport",
            LedgerError::Io(_) => "Io",
        }
    }

    /// Reconstruct an error from its wire representation.
    ///
    /// Unrecognized kinds come back as [`LedgerError::Transport`] so a newer
    /// server never crashes an older client.
    pub fn from_wire(kind: &str, message: &str) -> Self {
        match kind {
            "NotFound" => LedgerError::NotFound,
            "AlreadyExists" => LedgerError::AlreadyExists,
            "Aborted" => LedgerError::Aborted,
            "NotRunning" => LedgerError::NotRunning,
            "NonEmptyStack" => LedgerError::NonEmptyStack,
            "DuplicateCallId" => LedgerError::DuplicateCallId,
            "NotTop" => LedgerError::NotTop,
            "UnknownCallId" => LedgerError::UnknownCallId,
            "Duplicate" => LedgerError::Duplicate,
            "Unknown" => LedgerError::Unknown,
            "Malformed" => LedgerError::Malformed(message.to_string()),
            "LockTimeout" => LedgerError::LockTimeout,
            "PermissionDenied" => LedgerError::PermissionDenied(message.to_string()),
            "DiscoveryFailed" => LedgerError::DiscoveryFailed,
            "Io" => LedgerError::Io(message.to_string()),
            other => LedgerError::Transport(format!("{}: {}", other, message)),
        }
    }

    /// HTTP status code for this kind.
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::NotFound => 404,
            LedgerError::AlreadyExists
            | LedgerError::Aborted
            | LedgerError::NotRunning
            | LedgerError::NonEmptyStack
            | LedgerError::DuplicateCallId
            | LedgerError::NotTop
            | LedgerError::UnknownCallId
            | LedgerError::Duplicate
            | LedgerError::Unknown => 409,
            LedgerError::Malformed(_) => 400,
            LedgerError::LockTimeout => 503,
            LedgerError::PermissionDenied(_) => 403,
            _ => 500,
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            LedgerError::PermissionDenied(e.to_string())
        } else {
            LedgerError::Io(e.to_string())
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
