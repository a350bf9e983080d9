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

//! Session input handling
//!
//! Interprets each complete input line according to the current session
//! state, drives the login flow against the world-side collaborators, and
//! answers telnet negotiation events. All output goes through the
//! connection's outbound queue, so ordering follows enqueue order exactly.

use crate::context::ServerContext;
use crate::dispatcher::OutboundQueue;
use crate::error::{DisconnectReason, ProtocolViolation};
use crate::session::{Session, SessionState, MAX_PASSWORD_ATTEMPTS};
use crate::telnet::codec::TelnetEvent;
use crate::telnet::color;
use crate::telnet::protocol::{self, NegotiationVerb, TelnetOption};
use std::sync::Arc;
use thornvale_common::account::{validate_login, validate_password};
use thornvale_common::{Account, AccountLookup, PlayerRef, SetupStep, WorldError};

/// What the read loop should do after handling one input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading
    Continue,
    /// Transition to `Closing` with this reason
    Close(DisconnectReason),
}

/// Drives one session's state machine
pub struct SessionHandler {
    session: Session,
    context: ServerContext,
    queue: Arc<OutboundQueue>,
}

impl SessionHandler {
    /// Create a handler for a freshly admitted connection
    pub fn new(session: Session, context: ServerContext, queue: Arc<OutboundQueue>) -> Self {
        Self {
            session,
            context,
            queue,
        }
    }

    /// The session being driven
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Greet a new connection: initial negotiation, banner, first prompt
    pub fn on_connect(&mut self) {
        self.send_raw(protocol::build_negotiation(
            NegotiationVerb::Will,
            TelnetOption::SuppressGoAhead.to_byte(),
        ));
        self.send_raw(protocol::build_negotiation(
            NegotiationVerb::Do,
            TelnetOption::NAWS.to_byte(),
        ));
        self.send_raw(protocol::build_negotiation(
            NegotiationVerb::Do,
            TelnetOption::TerminalType.to_byte(),
        ));

        self.send_text(&self.context.banners().welcome.clone());
        self.prompt();
    }

    /// Handle one complete input line
    pub async fn on_line(&mut self, line: String) -> Flow {
        match self.session.state.clone() {
            SessionState::AwaitingName => self.handle_name(&line).await,
            SessionState::AwaitingPassword {
                login,
                existing,
                attempts,
            } => self.handle_password(login, existing, attempts, line).await,
            SessionState::AwaitingConfirmation { login, first } => {
                self.handle_confirmation(login, first, line).await
            }
            SessionState::AwaitingCharacterSetup { account } => {
                self.handle_setup(account, &line).await
            }
            SessionState::Playing { player } => self.handle_playing(player, &line).await,
            SessionState::Closing => Flow::Close(DisconnectReason::Quit),
        }
    }

    /// Handle a control event extracted by the codec
    pub fn on_event(&mut self, event: TelnetEvent) -> Flow {
        match event {
            TelnetEvent::Negotiate { verb, option } => {
                self.handle_negotiation(verb, option);
            }
            TelnetEvent::WindowSize { width, height } => {
                tracing::debug!(
                    session = %self.session.id,
                    "client window size {}x{}",
                    width,
                    height
                );
                self.session.options.window_size = Some((width, height));
            }
            TelnetEvent::TerminalType(name) => {
                tracing::debug!(session = %self.session.id, "client terminal type {}", name);
                self.session.options.terminal_type = Some(name);
            }
            TelnetEvent::LineOverflow => {
                tracing::warn!(
                    session = %self.session.id,
                    remote = %self.session.remote,
                    "input line over the length ceiling, discarded"
                );
                self.send_text("&RLine too long; input discarded.&n");
                self.prompt();
            }
        }
        Flow::Continue
    }

    /// Last words before the transport closes, where the reason earns any
    ///
    /// Capacity rejections never reach a session; transport failures have
    /// nobody left to talk to.
    pub fn notify_disconnect(&mut self, reason: DisconnectReason) {
        match reason {
            DisconnectReason::IdleTimeout => {
                self.send_text("&yYou have been idle too long. The mists take you.&n");
            }
            DisconnectReason::SlowConnection => {
                self.send_text("&yConnection timed out.&n");
            }
            DisconnectReason::ServerShutdown => {
                self.send_text("&yThe world is closing its eyes. Come back soon.&n");
            }
            DisconnectReason::Quit
            | DisconnectReason::AuthenticationFailed
            | DisconnectReason::Internal
            | DisconnectReason::PeerClosed
            | DisconnectReason::TransportError => {}
        }
        let _ = self.session.transition(SessionState::Closing);
    }

    /// Tell the player about a rejected packet; the bytes were discarded
    pub fn notify_violation(&mut self, violation: &ProtocolViolation) {
        tracing::warn!(
            session = %self.session.id,
            remote = %self.session.remote,
            "packet rejected: {}",
            violation
        );
        self.send_text("&RSuspicious input discarded.&n");
        self.prompt();
    }

    async fn handle_name(&mut self, line: &str) -> Flow {
        let name = line.trim();
        if name.is_empty() {
            self.prompt();
            return Flow::Continue;
        }

        match self.context.directory().lookup(name).await {
            Ok(AccountLookup::Existing) => self.to_password(name.to_string(), true),
            Ok(AccountLookup::Unknown) => {
                if let Err(message) = validate_login(name) {
                    self.send_text(&format!("&R{}&n", message));
                    self.prompt();
                    return Flow::Continue;
                }
                self.send_text(&format!(
                    "&yNo account is known by the name '{}'. Creating one.&n",
                    name
                ));
                self.to_password(name.to_string(), false)
            }
            Err(error) => {
                tracing::error!(
                    session = %self.session.id,
                    "account lookup failed: {}",
                    error
                );
                self.send_text("&RThe account registry is unavailable. Try again.&n");
                self.prompt();
                Flow::Continue
            }
        }
    }

    /// Enter a password state, suppressing local echo first
    fn to_password(&mut self, login: String, existing: bool) -> Flow {
        if let Err(error) = self.session.transition(SessionState::AwaitingPassword {
            login,
            existing,
            attempts: 0,
        }) {
            return self.internal_error(&error);
        }
        // The echo-suppress command must precede the password prompt
        self.send_raw(protocol::suppress_echo());
        self.session.options.echo_suppressed = true;
        self.prompt();
        Flow::Continue
    }

    /// Re-enable local echo after masked entry
    fn end_masked_input(&mut self) {
        if self.session.options.echo_suppressed {
            self.send_raw(protocol::restore_echo());
            self.session.options.echo_suppressed = false;
        }
    }

    async fn handle_password(
        &mut self,
        login: String,
        existing: bool,
        attempts: u8,
        line: String,
    ) -> Flow {
        // The client did not locally echo the newline it sent
        self.send_raw(b"\r\n".to_vec());

        if !existing {
            if let Err(message) = validate_password(&line) {
                self.send_text(&format!("&R{}&n", message));
                self.prompt();
                return Flow::Continue;
            }
            if let Err(error) = self.session.transition(SessionState::AwaitingConfirmation {
                login,
                first: line,
            }) {
                return self.internal_error(&error);
            }
            self.prompt();
            return Flow::Continue;
        }

        match self.context.directory().verify_password(&login, &line).await {
            Ok(true) => {
                self.end_masked_input();
                let account = match self.context.directory().account(&login).await {
                    Ok(account) => account,
                    Err(error) => {
                        tracing::error!(
                            session = %self.session.id,
                            "account fetch failed after verification: {}",
                            error
                        );
                        return self.internal_error("account fetch failed");
                    }
                };
                self.send_text(&self.context.banners().motd.clone());
                self.begin_setup(account).await
            }
            Ok(false) => {
                let attempts = attempts + 1;
                if attempts >= MAX_PASSWORD_ATTEMPTS {
                    tracing::info!(
                        session = %self.session.id,
                        remote = %self.session.remote,
                        login = %login,
                        "too many failed password attempts"
                    );
                    self.end_masked_input();
                    self.send_text("&RToo many failed attempts.&n");
                    return self.close(DisconnectReason::AuthenticationFailed);
                }
                self.send_text("&RWrong password.&n");
                if let Err(error) = self.session.transition(SessionState::AwaitingPassword {
                    login,
                    existing,
                    attempts,
                }) {
                    return self.internal_error(&error);
                }
                self.prompt();
                Flow::Continue
            }
            Err(error) => {
                tracing::error!(
                    session = %self.session.id,
                    "password verification failed: {}",
                    error
                );
                self.send_text("&RThe account registry is unavailable. Try again.&n");
                self.prompt();
                Flow::Continue
            }
        }
    }

    async fn handle_confirmation(&mut self, login: String, first: String, line: String) -> Flow {
        self.send_raw(b"\r\n".to_vec());

        if line != first {
            self.send_text("&RPasswords do not match.&n");
            if let Err(error) = self.session.transition(SessionState::AwaitingPassword {
                login,
                existing: false,
                attempts: 0,
            }) {
                return self.internal_error(&error);
            }
            self.prompt();
            return Flow::Continue;
        }

        match self.context.directory().create_account(&login, &first).await {
            Ok(account) => {
                self.end_masked_input();
                tracing::info!(
                    session = %self.session.id,
                    login = %account.login,
                    "account created"
                );
                self.send_text("&GAccount created.&n");
                self.send_text(&self.context.banners().motd.clone());
                self.begin_setup(account).await
            }
            Err(WorldError::Rejected(message)) => {
                self.end_masked_input();
                self.send_text(&format!("&R{}&n", message));
                if let Err(error) = self.session.transition(SessionState::AwaitingName) {
                    return self.internal_error(&error);
                }
                self.prompt();
                Flow::Continue
            }
            Err(error) => {
                tracing::error!(
                    session = %self.session.id,
                    "account creation failed: {}",
                    error
                );
                self.end_masked_input();
                self.send_text("&RThe account registry is unavailable. Try again.&n");
                if let Err(error) = self.session.transition(SessionState::AwaitingName) {
                    return self.internal_error(&error);
                }
                self.prompt();
                Flow::Continue
            }
        }
    }

    /// Start the character setup dialogue for an authenticated account
    async fn begin_setup(&mut self, account: Account) -> Flow {
        if let Err(error) = self.session.transition(SessionState::AwaitingCharacterSetup {
            account: account.clone(),
        }) {
            return self.internal_error(&error);
        }
        match self.context.forge().begin(&account).await {
            Ok(SetupStep::Prompt(prompt)) => {
                self.send_prompt_text(&prompt);
                Flow::Continue
            }
            Ok(SetupStep::Complete(player)) => self.enter_play(player),
            Err(error) => {
                tracing::error!(
                    session = %self.session.id,
                    "character setup failed to start: {}",
                    error
                );
                self.internal_error("character setup unavailable")
            }
        }
    }

    async fn handle_setup(&mut self, account: Account, line: &str) -> Flow {
        match self.context.forge().advance(&account, line.trim()).await {
            Ok(SetupStep::Prompt(prompt)) => {
                self.send_prompt_text(&prompt);
                Flow::Continue
            }
            Ok(SetupStep::Complete(player)) => self.enter_play(player),
            Err(WorldError::Rejected(message)) => {
                self.send_text(&format!("&R{}&n", message));
                // Re-ask from the top of the dialogue
                match self.context.forge().begin(&account).await {
                    Ok(SetupStep::Prompt(prompt)) => {
                        self.send_prompt_text(&prompt);
                        Flow::Continue
                    }
                    Ok(SetupStep::Complete(player)) => self.enter_play(player),
                    Err(error) => {
                        tracing::error!(
                            session = %self.session.id,
                            "character setup failed: {}",
                            error
                        );
                        self.internal_error("character setup unavailable")
                    }
                }
            }
            Err(error) => {
                tracing::error!(
                    session = %self.session.id,
                    "character setup failed: {}",
                    error
                );
                self.internal_error("character setup unavailable")
            }
        }
    }

    fn enter_play(&mut self, player: PlayerRef) -> Flow {
        let name = player.name.clone();
        if let Err(error) = self.session.transition(SessionState::Playing { player }) {
            return self.internal_error(&error);
        }
        tracing::info!(
            session = %self.session.id,
            remote = %self.session.remote,
            player = %name,
            "session entered play"
        );
        self.send_text(&format!("&GWelcome, {}.&n", name));
        self.prompt();
        Flow::Continue
    }

    async fn handle_playing(&mut self, player: PlayerRef, line: &str) -> Flow {
        match self.context.engine().dispatch(&player, line).await {
            Ok(output) => {
                if !output.text.is_empty() {
                    self.send_text(&output.text);
                }
                if output.terminate {
                    return self.close(DisconnectReason::Quit);
                }
                self.prompt();
                Flow::Continue
            }
            Err(WorldError::Rejected(message)) => {
                self.send_text(&message);
                self.prompt();
                Flow::Continue
            }
            Err(error) => {
                tracing::error!(
                    session = %self.session.id,
                    player = %player.name,
                    "command dispatch failed: {}",
                    error
                );
                self.send_text("&RSomething went wrong deep in the world.&n");
                self.close(DisconnectReason::Internal)
            }
        }
    }

    fn handle_negotiation(&mut self, verb: NegotiationVerb, option: u8) -> Flow {
        match (verb, TelnetOption::from_byte(option)) {
            // Client acknowledging our echo claim during masked input
            (NegotiationVerb::Do, Some(TelnetOption::Echo)) => {}
            (NegotiationVerb::Dont, Some(TelnetOption::Echo)) => {
                if self.session.options.echo_suppressed {
                    self.send_raw(protocol::restore_echo());
                    self.session.options.echo_suppressed = false;
                }
            }
            (NegotiationVerb::Do, Some(TelnetOption::SuppressGoAhead)) => {
                if !self.session.options.suppress_go_ahead {
                    self.session.options.suppress_go_ahead = true;
                    self.send_raw(protocol::build_negotiation(
                        NegotiationVerb::Will,
                        TelnetOption::SuppressGoAhead.to_byte(),
                    ));
                }
            }
            (NegotiationVerb::Will, Some(TelnetOption::SuppressGoAhead)) => {
                self.send_raw(protocol::build_negotiation(
                    NegotiationVerb::Do,
                    TelnetOption::SuppressGoAhead.to_byte(),
                ));
            }
            // Answer to the DO NAWS we sent at connect; sizes follow by
            // subnegotiation
            (NegotiationVerb::Will, Some(TelnetOption::NAWS)) => {}
            (NegotiationVerb::Will, Some(TelnetOption::TerminalType)) => {
                self.send_raw(protocol::request_terminal_type());
            }
            (NegotiationVerb::Wont, _) | (NegotiationVerb::Dont, _) => {}
            // Refuse anything else the client offers or requests
            (NegotiationVerb::Will, _) => {
                self.send_raw(protocol::build_negotiation(NegotiationVerb::Dont, option));
            }
            (NegotiationVerb::Do, _) => {
                self.send_raw(protocol::build_negotiation(NegotiationVerb::Wont, option));
            }
        }
        Flow::Continue
    }

    fn close(&mut self, reason: DisconnectReason) -> Flow {
        let _ = self.session.transition(SessionState::Closing);
        Flow::Close(reason)
    }

    fn internal_error(&mut self, detail: &str) -> Flow {
        tracing::error!(session = %self.session.id, "internal error: {}", detail);
        self.send_text("&RAn internal error occurred. You are being disconnected.&n");
        self.close(DisconnectReason::Internal)
    }

    /// Send the current state's fixed prompt, if it has one
    fn prompt(&mut self) {
        if let Some(prompt) = self.session.state.prompt() {
            self.send_prompt_text(prompt);
        }
    }

    /// Render markup and enqueue without a trailing line break
    fn send_prompt_text(&mut self, markup: &str) {
        self.queue.enqueue(color::render(markup).into_bytes());
    }

    /// Render markup and enqueue as a full line
    fn send_text(&mut self, markup: &str) {
        let mut rendered = color::render(markup);
        rendered.push_str("\r\n");
        self.queue.enqueue(rendered.into_bytes());
    }

    /// Enqueue raw protocol bytes
    fn send_raw(&mut self, bytes: Vec<u8>) {
        self.queue.enqueue(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banner::BannerSet;
    use crate::config::Configuration;
    use crate::governor::{GovernorLimits, ResourceGovernor};
    use async_trait::async_trait;
    use mockall::mock;
    use thornvale_common::{AccountDirectory, CharacterForge, CommandEngine, EngineOutput};
    use uuid::Uuid;

    mock! {
        Directory {}

        #[async_trait]
        impl AccountDirectory for Directory {
            async fn lookup(&self, login: &str) -> Result<AccountLookup, WorldError>;
            async fn verify_password(&self, login: &str, attempt: &str) -> Result<bool, WorldError>;
            async fn create_account(&self, login: &str, password: &str) -> Result<Account, WorldError>;
            async fn account(&self, login: &str) -> Result<Account, WorldError>;
        }
    }

    mock! {
        Forge {}

        #[async_trait]
        impl CharacterForge for Forge {
            async fn begin(&self, account: &Account) -> Result<SetupStep, WorldError>;
            async fn advance(&self, account: &Account, line: &str) -> Result<SetupStep, WorldError>;
        }
    }

    mock! {
        Engine {}

        #[async_trait]
        impl CommandEngine for Engine {
            async fn dispatch(&self, player: &PlayerRef, line: &str) -> Result<EngineOutput, WorldError>;
        }
    }

    fn handler_with(
        directory: MockDirectory,
        forge: MockForge,
        engine: MockEngine,
    ) -> (SessionHandler, Arc<OutboundQueue>) {
        let config = Arc::new(Configuration::default());
        let governor = Arc::new(ResourceGovernor::new(GovernorLimits::default()));
        let context = ServerContext::new(
            config,
            governor,
            Arc::new(directory),
            Arc::new(forge),
            Arc::new(engine),
            Arc::new(BannerSet::default()),
        );
        let queue = OutboundQueue::new(64);
        let session = Session::new(Uuid::new_v4(), "127.0.0.1:4000".parse().unwrap());
        (
            SessionHandler::new(session, context, Arc::clone(&queue)),
            queue,
        )
    }

    fn queued_bytes(queue: &OutboundQueue) -> Vec<u8> {
        queue
            .take_all()
            .into_iter()
            .flat_map(|m| m.payload)
            .collect()
    }

    fn position_of(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[tokio::test]
    async fn test_existing_name_suppresses_echo_before_password_prompt() {
        let mut directory = MockDirectory::new();
        directory
            .expect_lookup()
            .returning(|_| Ok(AccountLookup::Existing));
        let (mut handler, queue) = handler_with(directory, MockForge::new(), MockEngine::new());

        let flow = handler.on_line("Alice\r".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert!(matches!(
            handler.session().state,
            SessionState::AwaitingPassword { existing: true, .. }
        ));

        let bytes = queued_bytes(&queue);
        let echo_at = position_of(&bytes, &[255, 251, 1]).expect("echo-suppress command missing");
        let prompt_at = position_of(&bytes, b"Password: ").expect("password prompt missing");
        assert!(
            echo_at < prompt_at,
            "echo suppression must precede the password prompt"
        );
    }

    #[tokio::test]
    async fn test_empty_name_reprompts() {
        let (mut handler, queue) = handler_with(
            MockDirectory::new(),
            MockForge::new(),
            MockEngine::new(),
        );

        let flow = handler.on_line("   ".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(handler.session().state, SessionState::AwaitingName);

        let bytes = queued_bytes(&queue);
        assert!(position_of(&bytes, b"By what name").is_some());
    }

    #[tokio::test]
    async fn test_correct_password_enters_character_setup() {
        let account = Account::new("alice".to_string());
        let account_clone = account.clone();

        let mut directory = MockDirectory::new();
        directory
            .expect_verify_password()
            .returning(|_, _| Ok(true));
        directory
            .expect_account()
            .returning(move |_| Ok(account_clone.clone()));

        let mut forge = MockForge::new();
        forge
            .expect_begin()
            .returning(|_| Ok(SetupStep::Prompt("Name your character: ".to_string())));

        let (mut handler, queue) = handler_with(directory, forge, MockEngine::new());
        handler.session.state = SessionState::AwaitingPassword {
            login: "alice".to_string(),
            existing: true,
            attempts: 0,
        };
        handler.session.options.echo_suppressed = true;

        let flow = handler.on_line("swordfish".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert!(matches!(
            handler.session().state,
            SessionState::AwaitingCharacterSetup { .. }
        ));

        let bytes = queued_bytes(&queue);
        // Echo restored once the masked entry is done
        assert!(position_of(&bytes, &[255, 252, 1]).is_some());
        assert!(position_of(&bytes, b"Name your character: ").is_some());
    }

    #[tokio::test]
    async fn test_bounded_password_retries_then_close() {
        let mut directory = MockDirectory::new();
        directory
            .expect_verify_password()
            .times(3)
            .returning(|_, _| Ok(false));

        let (mut handler, _queue) = handler_with(directory, MockForge::new(), MockEngine::new());
        handler.session.state = SessionState::AwaitingPassword {
            login: "alice".to_string(),
            existing: true,
            attempts: 0,
        };

        assert_eq!(
            handler.on_line("wrong1".to_string()).await,
            Flow::Continue
        );
        assert_eq!(
            handler.on_line("wrong2".to_string()).await,
            Flow::Continue
        );
        assert_eq!(
            handler.on_line("wrong3".to_string()).await,
            Flow::Close(DisconnectReason::AuthenticationFailed)
        );
        assert_eq!(handler.session().state, SessionState::Closing);
    }

    #[tokio::test]
    async fn test_confirmation_mismatch_returns_to_password() {
        let (mut handler, queue) = handler_with(
            MockDirectory::new(),
            MockForge::new(),
            MockEngine::new(),
        );
        handler.session.state = SessionState::AwaitingConfirmation {
            login: "newbie".to_string(),
            first: "secret99".to_string(),
        };

        let flow = handler.on_line("different".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert!(matches!(
            handler.session().state,
            SessionState::AwaitingPassword {
                existing: false,
                ..
            }
        ));
        let bytes = queued_bytes(&queue);
        assert!(position_of(&bytes, b"do not match").is_some());
    }

    #[tokio::test]
    async fn test_confirmation_match_creates_account() {
        let mut directory = MockDirectory::new();
        directory
            .expect_create_account()
            .withf(|login, password| login == "newbie" && password == "secret99")
            .returning(|login, _| Ok(Account::new(login.to_string())));

        let mut forge = MockForge::new();
        forge
            .expect_begin()
            .returning(|_| Ok(SetupStep::Prompt("Name your character: ".to_string())));

        let (mut handler, _queue) = handler_with(directory, forge, MockEngine::new());
        handler.session.state = SessionState::AwaitingConfirmation {
            login: "newbie".to_string(),
            first: "secret99".to_string(),
        };

        let flow = handler.on_line("secret99".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert!(matches!(
            handler.session().state,
            SessionState::AwaitingCharacterSetup { .. }
        ));
    }

    #[tokio::test]
    async fn test_playing_lines_forwarded_verbatim() {
        let mut engine = MockEngine::new();
        engine
            .expect_dispatch()
            .withf(|_, line| line == "say &hello <world>")
            .returning(|_, _| Ok(EngineOutput::text("You say nothing much.")));

        let (mut handler, queue) = handler_with(
            MockDirectory::new(),
            MockForge::new(),
            engine,
        );
        let player = PlayerRef::new("Thorn".to_string(), Uuid::new_v4());
        handler.session.state = SessionState::Playing { player };

        let flow = handler.on_line("say &hello <world>".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        let bytes = queued_bytes(&queue);
        assert!(position_of(&bytes, b"You say nothing much.").is_some());
    }

    #[tokio::test]
    async fn test_engine_terminate_closes_session() {
        let mut engine = MockEngine::new();
        engine
            .expect_dispatch()
            .returning(|_, _| Ok(EngineOutput::terminate("Farewell.")));

        let (mut handler, _queue) = handler_with(
            MockDirectory::new(),
            MockForge::new(),
            engine,
        );
        let player = PlayerRef::new("Thorn".to_string(), Uuid::new_v4());
        handler.session.state = SessionState::Playing { player };

        assert_eq!(
            handler.on_line("quit".to_string()).await,
            Flow::Close(DisconnectReason::Quit)
        );
    }

    #[tokio::test]
    async fn test_engine_failure_closes_with_internal() {
        let mut engine = MockEngine::new();
        engine
            .expect_dispatch()
            .returning(|_, _| Err(WorldError::Unavailable("engine gone".to_string())));

        let (mut handler, _queue) = handler_with(
            MockDirectory::new(),
            MockForge::new(),
            engine,
        );
        let player = PlayerRef::new("Thorn".to_string(), Uuid::new_v4());
        handler.session.state = SessionState::Playing { player };

        assert_eq!(
            handler.on_line("look".to_string()).await,
            Flow::Close(DisconnectReason::Internal)
        );
    }

    #[tokio::test]
    async fn test_unknown_option_offers_are_refused() {
        let (mut handler, queue) = handler_with(
            MockDirectory::new(),
            MockForge::new(),
            MockEngine::new(),
        );

        // Client offers MCCP2 (86), which we do not speak
        handler.on_event(TelnetEvent::Negotiate {
            verb: NegotiationVerb::Will,
            option: 86,
        });
        let bytes = queued_bytes(&queue);
        assert!(position_of(&bytes, &[255, 254, 86]).is_some());
    }

    #[tokio::test]
    async fn test_window_size_and_terminal_type_recorded() {
        let (mut handler, _queue) = handler_with(
            MockDirectory::new(),
            MockForge::new(),
            MockEngine::new(),
        );

        handler.on_event(TelnetEvent::WindowSize {
            width: 120,
            height: 40,
        });
        handler.on_event(TelnetEvent::TerminalType("xterm".to_string()));

        assert_eq!(handler.session().options.window_size, Some((120, 40)));
        assert_eq!(
            handler.session().options.terminal_type.as_deref(),
            Some("xterm")
        );
    }

    #[tokio::test]
    async fn test_line_overflow_notifies_and_continues() {
        let (mut handler, queue) = handler_with(
            MockDirectory::new(),
            MockForge::new(),
            MockEngine::new(),
        );

        let flow = handler.on_event(TelnetEvent::LineOverflow);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(handler.session().state, SessionState::AwaitingName);
        let bytes = queued_bytes(&queue);
        assert!(position_of(&bytes, b"Line too long").is_some());
    }
}
