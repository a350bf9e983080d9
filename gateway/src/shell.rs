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

//! Built-in stand-ins for the world side
//!
//! The gateway binary can run without a world server attached; these minimal
//! collaborators make that useful for protocol testing and demos. A real
//! deployment swaps them for implementations that reach the game engine.

use async_trait::async_trait;
use thornvale_common::{
    Account, CharacterForge, CommandEngine, EngineOutput, PlayerRef, SetupStep, WorldError,
};

/// Single-question character creation: a name makes a character
pub struct NameForge;

#[async_trait]
impl CharacterForge for NameForge {
    async fn begin(&self, _account: &Account) -> Result<SetupStep, WorldError> {
        Ok(SetupStep::Prompt("Name your character: ".to_string()))
    }

    async fn advance(&self, account: &Account, line: &str) -> Result<SetupStep, WorldError> {
        let name = line.trim();
        if name.is_empty() {
            return Err(WorldError::Rejected("A character needs a name.".to_string()));
        }
        if name.len() > 30 || !name.chars().all(|c| c.is_alphabetic()) {
            return Err(WorldError::Rejected(
                "Names are a single word of letters, thirty at most.".to_string(),
            ));
        }
        Ok(SetupStep::Complete(PlayerRef::new(
            name.to_string(),
            account.id,
        )))
    }
}

/// Echoing command engine honouring `quit`
pub struct EchoShell;

#[async_trait]
impl CommandEngine for EchoShell {
    async fn dispatch(&self, player: &PlayerRef, line: &str) -> Result<EngineOutput, WorldError> {
        let trimmed = line.trim();
        match trimmed {
            "" => Ok(EngineOutput::default()),
            "quit" | "exit" => Ok(EngineOutput::terminate(format!(
                "&yFarewell, {}. The thornwood will remember you.&n",
                player.name
            ))),
            "look" => Ok(EngineOutput::text(
                "&gBriars crowd a muddy track. Somewhere ahead, a lantern gutters.&n",
            )),
            _ => Ok(EngineOutput::text(format!(
                "You say, \"&c{}&n\"",
                trimmed
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forge_accepts_a_name() {
        let forge = NameForge;
        let account = Account::new("alice".to_string());

        let step = forge.begin(&account).await.unwrap();
        assert!(matches!(step, SetupStep::Prompt(_)));

        match forge.advance(&account, "Thorn").await.unwrap() {
            SetupStep::Complete(player) => {
                assert_eq!(player.name, "Thorn");
                assert_eq!(player.account_id, account.id);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forge_rejects_bad_names() {
        let forge = NameForge;
        let account = Account::new("alice".to_string());

        assert!(forge.advance(&account, "").await.is_err());
        assert!(forge.advance(&account, "Thorn the Third").await.is_err());
        assert!(forge.advance(&account, "x9").await.is_err());
    }

    #[tokio::test]
    async fn test_shell_quit_terminates() {
        let shell = EchoShell;
        let player = PlayerRef::new("Thorn".to_string(), uuid::Uuid::new_v4());

        let output = shell.dispatch(&player, "quit").await.unwrap();
        assert!(output.terminate);
        assert!(output.text.contains("Thorn"));
    }

    #[tokio::test]
    async fn test_shell_echoes() {
        let shell = EchoShell;
        let player = PlayerRef::new("Thorn".to_string(), uuid::Uuid::new_v4());

        let output = shell.dispatch(&player, "hello there").await.unwrap();
        assert!(!output.terminate);
        assert!(output.text.contains("hello there"));
    }
}
