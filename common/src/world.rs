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

//! Collaborator traits the gateway drives during login and play
//!
//! The gateway owns the wire protocol and the session state machine; accounts,
//! character creation, and command handling belong to the world side and are
//! reached through these traits. Failures surface to the player as re-prompts,
//! never as protocol errors.

use crate::account::{Account, AccountLookup};
use crate::player::PlayerRef;
use async_trait::async_trait;

/// Error from a world-side collaborator
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The request was understood but refused, with a message for the player
    #[error("{0}")]
    Rejected(String),
    /// The collaborator itself failed
    #[error("world backend unavailable: {0}")]
    Unavailable(String),
}

/// Account lookup, verification, and creation
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Check whether a login name belongs to an existing account
    async fn lookup(&self, login: &str) -> Result<AccountLookup, WorldError>;

    /// Verify a password attempt against the stored credentials
    async fn verify_password(&self, login: &str, attempt: &str) -> Result<bool, WorldError>;

    /// Create a new account with the given credentials
    async fn create_account(&self, login: &str, password: &str) -> Result<Account, WorldError>;

    /// Fetch an existing account by login name
    async fn account(&self, login: &str) -> Result<Account, WorldError>;
}

/// One step of the interactive character setup dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupStep {
    /// Send this prompt and wait for the next line
    Prompt(String),
    /// Setup finished; the session enters play with this entity
    Complete(PlayerRef),
}

/// Interactive character creation
///
/// The gateway feeds the forge one line at a time and relays its prompts until
/// it yields a completed player entity.
#[async_trait]
pub trait CharacterForge: Send + Sync {
    /// Start the setup dialogue for an account
    async fn begin(&self, account: &Account) -> Result<SetupStep, WorldError>;

    /// Advance the dialogue with the player's next input line
    async fn advance(&self, account: &Account, line: &str) -> Result<SetupStep, WorldError>;
}

/// Output of one dispatched command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Markup-tagged text to render back to the player
    pub text: String,

    /// The engine wants this session to end (player quit, ban, shutdown)
    pub terminate: bool,
}

impl EngineOutput {
    /// Plain response text, session continues
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminate: false,
        }
    }

    /// Final response text, then terminate the session
    pub fn terminate(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminate: true,
        }
    }
}

/// The game engine boundary
///
/// Receives every complete input line of a playing session, verbatim after
/// codec decoding. The gateway does not parse or validate command syntax
/// beyond line framing.
#[async_trait]
pub trait CommandEngine: Send + Sync {
    /// Dispatch one input line for a player
    async fn dispatch(&self, player: &PlayerRef, line: &str) -> Result<EngineOutput, WorldError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_output_constructors() {
        let out = EngineOutput::text("You see nothing special.");
        assert!(!out.terminate);

        let out = EngineOutput::terminate("Goodbye!");
        assert!(out.terminate);
        assert_eq!(out.text, "Goodbye!");
    }

    #[test]
    fn test_world_error_display() {
        let err = WorldError::Rejected("That name is taken.".to_string());
        assert_eq!(err.to_string(), "That name is taken.");
    }
}
