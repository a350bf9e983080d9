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

//! Thornvale Common Types and Protocols
//!
//! This crate defines the types shared between the Thornvale gateway and the
//! world side of the server:
//! - Account and player data types
//! - The collaborator traits the gateway drives during login and play
//!   (account directory, character forge, command engine)

pub mod account;
pub mod player;
pub mod world;

pub use account::{Account, AccountLookup};
pub use player::PlayerRef;
pub use world::{
    AccountDirectory, CharacterForge, CommandEngine, EngineOutput, SetupStep, WorldError,
};
