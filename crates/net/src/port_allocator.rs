// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic port allocation for multi-client startup coordination.

use std::net::{SocketAddr, TcpListener};

const SCAN_WINDOW: u16 = 50;
const HASH_MODULUS: u16 = 1000;

/// Picks the target TCP port, preferring (a) an explicit override, then
/// (b) a deterministic offset from an instance identifier, then (c) the
/// bare requested port, and probes upward from there for availability.
/// Never fails: falls back to the original request if nothing frees up.
pub fn allocate(requested: u16, instance_id: Option<&str>, env_override: Option<&str>) -> u16 {
    let target = env_override
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or_else(|| match instance_id {
            Some(id) => requested.saturating_add(hash_mod(id, HASH_MODULUS)),
            None => requested,
        });

    if is_available(target) {
        return target;
    }

    for offset in 1..=SCAN_WINDOW {
        let candidate = target.saturating_add(offset);
        if candidate == 0 {
            continue;
        }
        if is_available(candidate) {
            return candidate;
        }
    }

    requested
}

fn hash_mod(id: &str, modulus: u16) -> u16 {
    let mut hash: u32 = 2166136261; // FNV-1a offset basis
    for byte in id.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    (hash % modulus as u32) as u16
}

fn is_available(port: u16) -> bool {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    TcpListener::bind(addr).is_ok()
}

/// Public wrapper for callers that just need a socket-probe availability
/// check (the Supervisor's preflight step), not full allocation.
pub fn is_free(port: u16) -> bool {
    is_available(port)
}

#[cfg(test)]
#[path = "port_allocator_tests.rs"]
mod tests;
