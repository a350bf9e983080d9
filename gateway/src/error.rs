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

//! Gateway error taxonomy
//!
//! Per-connection failures are isolated: everything except a bind failure at
//! startup is caught at the connection task boundary, logged with the
//! connection id and remote address, and resolved into a `Closing` transition.

use std::net::SocketAddr;
use thiserror::Error;

/// Why the governor refused a connection attempt
///
/// Rejected peers observe only a closed socket; the reason is for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Global open-connection ceiling reached
    Capacity,
    /// Per-address open-connection ceiling reached
    AddressCeiling,
    /// Too many attempts from this address within the rate window
    RateLimited,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::Capacity => write!(f, "server at capacity"),
            DenyReason::AddressCeiling => write!(f, "per-address connection ceiling"),
            DenyReason::RateLimited => write!(f, "connection rate limit"),
        }
    }
}

/// Malformed or hostile input, recoverable per connection
///
/// The offending bytes are discarded, the player is notified, and the
/// connection survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("input line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("empty packet")]
    EmptyPacket,

    #[error("packet of {len} bytes exceeds the {limit} byte read limit")]
    OversizedPacket { len: usize, limit: usize },

    #[error("degenerate packet: {len} repeats of byte {byte:#04x}")]
    FloodPattern { byte: u8, len: usize },

    #[error("forbidden control sequence in input")]
    ForbiddenSequence,
}

/// Why a connection was (or is being) torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The player or the engine asked for the session to end
    Quit,
    /// Idle past the configured threshold while playing
    IdleTimeout,
    /// Never completed the login handshake in time
    SlowConnection,
    /// The peer closed the transport
    PeerClosed,
    /// Read or write against the transport failed
    TransportError,
    /// Bounded authentication retries exhausted
    AuthenticationFailed,
    /// Unexpected failure during command processing
    Internal,
    /// Server-wide shutdown
    ServerShutdown,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::Quit => write!(f, "quit"),
            DisconnectReason::IdleTimeout => write!(f, "idle timeout"),
            DisconnectReason::SlowConnection => write!(f, "slow connection"),
            DisconnectReason::PeerClosed => write!(f, "peer closed"),
            DisconnectReason::TransportError => write!(f, "transport error"),
            DisconnectReason::AuthenticationFailed => write!(f, "authentication failed"),
            DisconnectReason::Internal => write!(f, "internal error"),
            DisconnectReason::ServerShutdown => write!(f, "server shutdown"),
        }
    }
}

/// Top-level gateway error
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Startup-time listener failure; the only error fatal to the process
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("connection denied: {0}")]
    AdmissionDenied(DenyReason),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("authentication failed for '{login}'")]
    Authentication { login: String },

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
