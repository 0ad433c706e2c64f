// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger document codec.
//!
//! The on-disk format is a self-describing JSON object (see
//! [`dl_core::LedgerData`] for the field set). Decoding tolerates schema
//! drift: absent optional fields take their documented defaults and the
//! legacy `stack` key is accepted for `callFrames`. Anything that is not a
//! ledger object is rejected as malformed rather than coerced.

use crate::error::StoreError;
use dl_core::LedgerData;

/// Encode a ledger document. Always emits current key names.
pub fn encode(data: &LedgerData) -> Result<Vec<u8>, StoreError> {
    let mut bytes =
        serde_json::to_vec_pretty(data).map_err(|e| StoreError::Malformed(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode a ledger document.
pub fn decode(bytes: &[u8]) -> Result<LedgerData, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Malformed(e.to_string()))
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
