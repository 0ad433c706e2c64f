// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger server auto-discovery.
//!
//! Probes `/status` on localhost, every local IPv4 interface address, and
//! every /24 peer of those addresses (skipping .0, .255, and the local
//! address itself). Probes run concurrently with a short timeout; the
//! first responder whose status document passes validation wins.

use dl_core::LedgerError;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, trace};

/// Per-candidate probe timeout.
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Service name a probe must report to count as a ledger server.
const EXPECTED_SERVICE: &str = "ledger_server";

/// The `/status` document of a ledger server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub service: String,
    pub version: String,
    pub port: u16,
    pub base_path: String,
    pub uptime_ms: u64,
}

/// Predicate applied to a responding server's status document.
pub type Validator = dyn Fn(&ServerStatus) -> bool + Send + Sync;

/// Find a ledger server on the LAN; returns its base URL.
///
/// With no validator, any responding ledger server is accepted.
pub async fn discover_server(
    port: u16,
    validator: Option<Arc<Validator>>,
) -> Result<String, LedgerError> {
    let local = local_ipv4_addrs();
    let candidates = candidate_addrs(&local);
    debug!(candidates = candidates.len(), port, "scanning for ledger server");

    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| LedgerError::Transport(e.to_string()))?;

    let mut probes = JoinSet::new();
    for addr in candidates {
        let client = client.clone();
        let validator = validator.clone();
        probes.spawn(async move {
            let base_url = format!("http://{}:{}", addr, port);
            let status = probe(&client, &base_url).await?;
            if status.service != EXPECTED_SERVICE {
                return None;
            }
            if let Some(validator) = validator {
                if !validator(&status) {
                    return None;
                }
            }
            Some(base_url)
        });
    }

    while let Some(result) = probes.join_next().await {
        if let Ok(Some(base_url)) = result {
            debug!(%base_url, "ledger server found");
            probes.abort_all();
            return Ok(base_url);
        }
    }

    Err(LedgerError::DiscoveryFailed)
}

async fn probe(client: &reqwest::Client, base_url: &str) -> Option<ServerStatus> {
    let response = match client.get(format!("{}/status", base_url)).send().await {
        Ok(r) => r,
        Err(e) => {
            trace!(%base_url, error = %e, "probe failed");
            return None;
        }
    };
    response.json().await.ok()
}

/// Non-loopback IPv4 addresses of this host's interfaces.
fn local_ipv4_addrs() -> Vec<Ipv4Addr> {
    let mut out = Vec::new();
    let Ok(ifaddrs) = nix::ifaddrs::getifaddrs() else {
        return out;
    };
    for ifaddr in ifaddrs {
        let Some(storage) = ifaddr.address else {
            continue;
        };
        if let Some(sin) = storage.as_sockaddr_in() {
            let ip = Ipv4Addr::from(sin.ip());
            if !ip.is_loopback() && !out.contains(&ip) {
                out.push(ip);
            }
        }
    }
    out
}

/// Probe order: localhost, the interface addresses themselves, then their
/// /24 peers (skipping .0, .255, and the address itself).
fn candidate_addrs(local: &[Ipv4Addr]) -> Vec<Ipv4Addr> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |addr: Ipv4Addr, out: &mut Vec<Ipv4Addr>| {
        if seen.insert(addr) {
            out.push(addr);
        }
    };

    push(Ipv4Addr::LOCALHOST, &mut out);
    for addr in local {
        push(*addr, &mut out);
    }
    for addr in local {
        let [a, b, c, _] = addr.octets();
        for host in 1..255u8 {
            let candidate = Ipv4Addr::new(a, b, c, host);
            if candidate != *addr {
                push(candidate, &mut out);
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "discover_tests.rs"]
mod tests;
