// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential-backoff retry engine.
//!
//! The delay schedule is explicit rather than computed: 2, 4, 8, 16, 32
//! seconds, for at most five retries (six attempts, ≤ 62 s of waiting).
//! Attempts classify their own failures; a fatal error short-circuits the
//! schedule immediately.

use dl_core::LedgerError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Default backoff schedule between attempts.
pub const DEFAULT_RETRY_DELAYS: [Duration; 5] = [
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
    Duration::from_secs(16),
    Duration::from_secs(32),
];

/// One attempt's failure, tagged with whether the schedule should continue.
#[derive(Debug)]
pub enum AttemptError {
    /// Transient: connection refusals, socket errors, timeouts, HTTP
    /// 408/429/5xx.
    Retryable(LedgerError),
    /// Definitive: malformed requests and engine outcomes; surfaces
    /// immediately.
    Fatal(LedgerError),
}

impl AttemptError {
    pub fn into_inner(self) -> LedgerError {
        match self {
            AttemptError::Retryable(e) | AttemptError::Fatal(e) => e,
        }
    }
}

/// A retry schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: DEFAULT_RETRY_DELAYS.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// No retries: every failure surfaces after the first attempt.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// Total number of attempts the schedule allows.
    pub fn max_attempts(&self) -> u32 {
        self.delays.len() as u32 + 1
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

/// Run `op` under the policy.
///
/// Returns the first success, the first fatal error, or
/// [`LedgerError::RetryExhausted`] once the schedule runs out.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(e)) => return Err(e),
            Err(AttemptError::Retryable(e)) => e,
        };

        let Some(delay) = policy.delays.get(attempts as usize - 1) else {
            return Err(LedgerError::RetryExhausted {
                attempts,
                last: error.to_string(),
            });
        };

        debug!(
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "transient failure, backing off"
        );
        tokio::time::sleep(*delay).await;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
