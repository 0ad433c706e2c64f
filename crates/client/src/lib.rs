// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dl-client: the remote ledger.
//!
//! [`RemoteLedger`] mirrors the engine's verbs over HTTP so an
//! [`OperationHandle`](dl_engine::OperationHandle) is indifferent to whether
//! the ledger directory is local or served by a `dld` on another machine.
//! Every call goes through the retry engine; servers are found either by
//! explicit base URL or by [`discover`] scanning the local /24 subnets.

pub mod discover;
pub mod remote;
pub mod retry;

pub use discover::{discover_server, ServerStatus};
pub use remote::RemoteLedger;
pub use retry::{AttemptError, RetryPolicy};
