//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Admission control and anomaly detection
//!
//! The governor bounds total resource consumption: global and per-address
//! connection ceilings, a sliding-window rate limit on connection attempts,
//! packet-level sanity checks ahead of the codec, and a periodic sweep that
//! evicts idle and stalled connections. It is constructed once at startup and
//! passed by `Arc` to the acceptor and every connection; there is no ambient
//! static state.

use crate::config::Configuration;
use crate::error::{DenyReason, DisconnectReason, ProtocolViolation};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Minimum size at which a single-byte-value packet counts as a flood
const FLOOD_MIN_LEN: usize = 256;

/// Tunable admission and packet limits
#[derive(Debug, Clone)]
pub struct GovernorLimits {
    pub max_connections: usize,
    pub max_per_address: usize,
    pub rate_window: Duration,
    pub rate_max_attempts: usize,
    pub max_packet_size: usize,
    pub idle_playing: Duration,
    pub idle_preauth: Duration,
    pub budget_gc: Duration,
}

impl GovernorLimits {
    /// Build limits from the loaded configuration
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            max_connections: config.limits.max_connections,
            max_per_address: config.limits.max_per_address,
            rate_window: Duration::seconds(config.limits.rate_window_seconds as i64),
            rate_max_attempts: config.limits.rate_max_attempts,
            max_packet_size: config.limits.max_packet_size,
            idle_playing: Duration::seconds(config.timeouts.idle_playing_seconds as i64),
            idle_preauth: Duration::seconds(config.timeouts.idle_preauth_seconds as i64),
            budget_gc: Duration::seconds(config.timeouts.budget_gc_seconds as i64),
        }
    }
}

impl Default for GovernorLimits {
    fn default() -> Self {
        Self::from_config(&Configuration::default())
    }
}

/// Per-source-address counters
#[derive(Debug, Default)]
struct AddressBudget {
    /// Currently open connections from this address
    open: usize,

    /// Timestamps of recent connection attempts, oldest first
    attempts: VecDeque<DateTime<Utc>>,
}

impl AddressBudget {
    fn prune(&mut self, horizon: DateTime<Utc>) {
        while let Some(oldest) = self.attempts.front() {
            if *oldest < horizon {
                self.attempts.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Liveness record for one open connection
///
/// The reader task touches it on input; the sweep reads it to find stalled
/// connections and cancels the token to force a disconnect.
pub struct ConnectionWatch {
    id: Uuid,
    remote: IpAddr,
    opened_at: DateTime<Utc>,
    last_activity_ms: AtomicI64,
    authenticated: AtomicBool,
    eviction: Mutex<Option<DisconnectReason>>,
    token: CancellationToken,
}

impl ConnectionWatch {
    fn new(id: Uuid, remote: IpAddr, now: DateTime<Utc>) -> Self {
        Self {
            id,
            remote,
            opened_at: now,
            last_activity_ms: AtomicI64::new(now.timestamp_millis()),
            authenticated: AtomicBool::new(false),
            eviction: Mutex::new(None),
            token: CancellationToken::new(),
        }
    }

    /// Connection id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Source address
    pub fn remote(&self) -> IpAddr {
        self.remote
    }

    /// Cancellation token observed by the reader and writer tasks
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Record activity on the connection
    pub fn touch(&self, now: DateTime<Utc>) {
        self.last_activity_ms
            .store(now.timestamp_millis(), Ordering::Relaxed);
    }

    /// Mark the login handshake as completed
    pub fn mark_authenticated(&self) {
        self.authenticated.store(true, Ordering::Relaxed);
    }

    /// Force this connection to disconnect with the given reason
    ///
    /// The first reason wins; later evictions are no-ops.
    pub fn evict(&self, reason: DisconnectReason) {
        if let Ok(mut slot) = self.eviction.lock() {
            slot.get_or_insert(reason);
        }
        self.token.cancel();
    }

    /// Why this connection was evicted, if it was
    pub fn eviction_reason(&self) -> Option<DisconnectReason> {
        self.eviction.lock().ok().and_then(|slot| *slot)
    }

    fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity_ms.load(Ordering::Relaxed))
            .unwrap_or(self.opened_at)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }
}

/// Counts from one stale-connection sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections evicted for idling past the threshold
    pub idle: usize,
    /// Pre-authentication connections evicted for stalling the handshake
    pub slow: usize,
    /// Per-address budgets garbage-collected
    pub budgets_dropped: usize,
}

/// Admission control, packet validation, and stale-connection eviction
pub struct ResourceGovernor {
    limits: GovernorLimits,
    open_total: AtomicUsize,
    addresses: DashMap<IpAddr, AddressBudget>,
    watches: DashMap<Uuid, Arc<ConnectionWatch>>,
}

impl ResourceGovernor {
    /// Create a governor with the given limits
    pub fn new(limits: GovernorLimits) -> Self {
        Self {
            limits,
            open_total: AtomicUsize::new(0),
            addresses: DashMap::new(),
            watches: DashMap::new(),
        }
    }

    /// Admission limits in force
    pub fn limits(&self) -> &GovernorLimits {
        &self.limits
    }

    /// Decide whether to accept a connection attempt from an address
    ///
    /// On admission the caller owes exactly one `release` for this address
    /// when the connection terminates.
    pub fn admit(&self, addr: IpAddr) -> Result<(), DenyReason> {
        self.admit_at(addr, Utc::now())
    }

    /// `admit` with an injected clock, for tests and the sweep
    pub fn admit_at(&self, addr: IpAddr, now: DateTime<Utc>) -> Result<(), DenyReason> {
        let mut budget = self.addresses.entry(addr).or_default();

        // Denied attempts count against the window too
        budget.prune(now - self.limits.rate_window);
        budget.attempts.push_back(now);
        if budget.attempts.len() > self.limits.rate_max_attempts {
            return Err(DenyReason::RateLimited);
        }

        if budget.open >= self.limits.max_per_address {
            return Err(DenyReason::AddressCeiling);
        }

        // Claim the global slot atomically; concurrent admits from other
        // addresses must not overshoot the ceiling
        let max_connections = self.limits.max_connections;
        let claimed = self
            .open_total
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                if open >= max_connections {
                    None
                } else {
                    Some(open + 1)
                }
            })
            .is_ok();
        if !claimed {
            return Err(DenyReason::Capacity);
        }

        budget.open += 1;
        Ok(())
    }

    /// Release one admitted connection for an address
    ///
    /// Saturates at zero, so a stray double release never drives the
    /// counters negative.
    pub fn release(&self, addr: IpAddr) {
        let released = match self.addresses.get_mut(&addr) {
            Some(mut budget) => {
                if budget.open > 0 {
                    budget.open -= 1;
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if released {
            let _ = self
                .open_total
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                    Some(v.saturating_sub(1))
                });
        } else {
            tracing::warn!("release for {} without a matching admit", addr);
        }
    }

    /// Total open connections across all addresses
    pub fn open_connections(&self) -> usize {
        self.open_total.load(Ordering::Acquire)
    }

    /// Open connections from one address
    pub fn open_from(&self, addr: IpAddr) -> usize {
        self.addresses.get(&addr).map(|b| b.open).unwrap_or(0)
    }

    /// Reject malformed or hostile raw chunks before they reach the codec
    pub fn validate_packet(&self, chunk: &[u8]) -> Result<(), ProtocolViolation> {
        if chunk.is_empty() {
            return Err(ProtocolViolation::EmptyPacket);
        }
        if chunk.len() > self.limits.max_packet_size {
            return Err(ProtocolViolation::OversizedPacket {
                len: chunk.len(),
                limit: self.limits.max_packet_size,
            });
        }
        // A large buffer of one repeated byte value is a flood signature
        if chunk.len() >= FLOOD_MIN_LEN && chunk.iter().all(|&b| b == chunk[0]) {
            return Err(ProtocolViolation::FloodPattern {
                byte: chunk[0],
                len: chunk.len(),
            });
        }
        // Clients have no business sending raw ANSI control sequences
        if chunk.windows(2).any(|w| w == [0x1b, b'[']) {
            return Err(ProtocolViolation::ForbiddenSequence);
        }
        Ok(())
    }

    /// Register a watch for a newly admitted connection
    pub fn register(&self, id: Uuid, remote: IpAddr) -> Arc<ConnectionWatch> {
        let watch = Arc::new(ConnectionWatch::new(id, remote, Utc::now()));
        self.watches.insert(id, Arc::clone(&watch));
        watch
    }

    /// Remove a connection's watch
    ///
    /// Returns true only for the first call per id; connection teardown uses
    /// this as its exactly-once gate around `release`.
    pub fn unregister(&self, id: Uuid) -> bool {
        self.watches.remove(&id).is_some()
    }

    /// Evict every open connection, e.g. at server shutdown
    pub fn evict_all(&self, reason: DisconnectReason) -> usize {
        let mut evicted = 0;
        for entry in self.watches.iter() {
            entry.value().evict(reason);
            evicted += 1;
        }
        evicted
    }

    /// Evict stalled connections and drop cold address budgets
    ///
    /// Invoked periodically. Idle playing sessions get the idle threshold;
    /// connections still short of authentication get the much shorter
    /// slow-lure threshold, so a peer cannot hold a slot by never finishing
    /// the handshake.
    pub fn sweep_stale(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for entry in self.watches.iter() {
            let watch = entry.value();
            if watch.eviction_reason().is_some() {
                continue;
            }
            if watch.is_authenticated() {
                if now - watch.last_activity() > self.limits.idle_playing {
                    tracing::info!(
                        connection = %watch.id(),
                        remote = %watch.remote(),
                        "evicting connection: idle timeout"
                    );
                    watch.evict(DisconnectReason::IdleTimeout);
                    report.idle += 1;
                }
            } else if now - watch.opened_at > self.limits.idle_preauth {
                tracing::info!(
                    connection = %watch.id(),
                    remote = %watch.remote(),
                    "evicting connection: slow connection"
                );
                watch.evict(DisconnectReason::SlowConnection);
                report.slow += 1;
            }
        }

        let horizon = now - self.limits.budget_gc;
        let before = self.addresses.len();
        self.addresses.retain(|_, budget| {
            budget.open > 0 || budget.attempts.back().is_some_and(|t| *t >= horizon)
        });
        report.budgets_dropped = before.saturating_sub(self.addresses.len());

        report
    }
}
