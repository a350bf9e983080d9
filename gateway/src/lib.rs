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

//! Thornvale Gateway Library
//!
//! The connection and protocol core of the Thornvale server: it accepts raw
//! TCP connections, speaks the legacy telnet line protocol (option
//! negotiation, inline `&`-color markup, line buffering), drives each
//! connection through the login/session state machine, and defends the
//! process against resource exhaustion and malformed input. Game mechanics
//! live behind the collaborator traits in `thornvale-common`.

pub mod banner;
pub mod config;
pub mod connection;
pub mod context;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod governor;
pub mod server;
pub mod session;
pub mod shell;
pub mod telnet;

// Re-export commonly used types
pub use context::ServerContext;
pub use error::{DenyReason, DisconnectReason, GatewayError, ProtocolViolation};
pub use governor::{GovernorLimits, ResourceGovernor};
pub use server::TelnetServer;
pub use session::{Session, SessionState};
