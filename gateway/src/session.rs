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

//! Gateway session state
//!
//! A session is the protocol/application state bound to one connection. It is
//! created with the connection, mutated only by that connection's reader
//! task, and discarded when the connection dies. State transitions are
//! strictly sequential; the one shortcut allowed from every state is the
//! explicit move to `Closing`.

pub mod handler;

use chrono::{DateTime, Utc};
use std::mem::discriminant;
use std::net::SocketAddr;
use thornvale_common::{Account, PlayerRef};
use uuid::Uuid;

/// Bounded password retries before the connection is closed
pub const MAX_PASSWORD_ATTEMPTS: u8 = 3;

/// Options negotiated with the client
#[derive(Debug, Clone, Default)]
pub struct NegotiatedOptions {
    /// We claimed the echo option, so the client stopped local echo
    pub echo_suppressed: bool,

    /// Suppress-go-ahead active on our side
    pub suppress_go_ahead: bool,

    /// Terminal type reported by the client
    pub terminal_type: Option<String>,

    /// Window size (width, height) reported via NAWS
    pub window_size: Option<(u16, u16)>,
}

/// Session state machine
///
/// Each state knows its entry prompt; how the next complete line is
/// interpreted lives in [`handler::SessionHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Prompting for the account name
    AwaitingName,

    /// Prompting for a password; `existing` distinguishes login from
    /// account creation
    AwaitingPassword {
        login: String,
        existing: bool,
        attempts: u8,
    },

    /// New account: the password must be re-entered and match byte-for-byte
    AwaitingConfirmation { login: String, first: String },

    /// Character creation dialogue, delegated to the world side
    AwaitingCharacterSetup { account: Account },

    /// In play; every line goes verbatim to the command engine
    Playing { player: PlayerRef },

    /// Terminal; flush output, release resources, destroy the connection
    Closing,
}

impl SessionState {
    /// Short state name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::AwaitingName => "awaiting-name",
            SessionState::AwaitingPassword { .. } => "awaiting-password",
            SessionState::AwaitingConfirmation { .. } => "awaiting-confirmation",
            SessionState::AwaitingCharacterSetup { .. } => "awaiting-character-setup",
            SessionState::Playing { .. } => "playing",
            SessionState::Closing => "closing",
        }
    }

    /// True once credentials have been established
    ///
    /// The governor's short slow-lure eviction threshold applies until this
    /// turns true; afterwards the long idle threshold takes over.
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingCharacterSetup { .. } | SessionState::Playing { .. }
        )
    }

    /// The prompt sent on entering this state, where one is fixed
    ///
    /// Character setup prompts come from the forge; `Closing` prompts
    /// nothing.
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            SessionState::AwaitingName => Some("By what name are you known? "),
            SessionState::AwaitingPassword { existing: true, .. } => Some("Password: "),
            SessionState::AwaitingPassword {
                existing: false, ..
            } => Some("New account. Choose a password: "),
            SessionState::AwaitingConfirmation { .. } => Some("Retype password to confirm: "),
            SessionState::AwaitingCharacterSetup { .. } => None,
            SessionState::Playing { .. } => Some("> "),
            SessionState::Closing => None,
        }
    }

    /// Whether the machine may move from this state to `next`
    ///
    /// Re-entering the same state is always legal (re-prompts); `Closing` is
    /// reachable from everywhere and leads nowhere.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;

        if matches!(self, Closing) {
            return false;
        }
        if matches!(next, Closing) || discriminant(self) == discriminant(next) {
            return true;
        }

        matches!(
            (self, next),
            (AwaitingName, AwaitingPassword { .. })
                | (AwaitingPassword { .. }, AwaitingConfirmation { .. })
                | (AwaitingPassword { .. }, AwaitingCharacterSetup { .. })
                | (AwaitingConfirmation { .. }, AwaitingPassword { .. })
                | (AwaitingConfirmation { .. }, AwaitingCharacterSetup { .. })
                | (AwaitingConfirmation { .. }, AwaitingName)
                | (AwaitingCharacterSetup { .. }, Playing { .. })
        )
    }
}

/// Protocol/application state for one connection
#[derive(Debug, Clone)]
pub struct Session {
    /// Connection id this session is bound to
    pub id: Uuid,

    /// Remote peer address
    pub remote: SocketAddr,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Current machine state
    pub state: SessionState,

    /// Negotiated client options
    pub options: NegotiatedOptions,
}

impl Session {
    /// Create a session for a freshly accepted connection
    pub fn new(id: Uuid, remote: SocketAddr) -> Self {
        Self {
            id,
            remote,
            created_at: Utc::now(),
            state: SessionState::AwaitingName,
            options: NegotiatedOptions::default(),
        }
    }

    /// Move to a new state, enforcing the transition table
    pub fn transition(&mut self, next: SessionState) -> Result<(), String> {
        if !self.state.can_transition_to(&next) {
            return Err(format!(
                "invalid state transition from {} to {}",
                self.state.name(),
                next.name()
            ));
        }
        tracing::debug!(
            session = %self.id,
            from = self.state.name(),
            to = next.name(),
            "session transition"
        );
        self.state = next;
        Ok(())
    }
}
