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

//! Player entity reference

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a player entity in the world
///
/// The gateway never inspects the entity beyond this handle; the world side
/// owns everything about the character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    /// World entity identifier
    pub entity_id: Uuid,

    /// Character display name
    pub name: String,

    /// Owning account
    pub account_id: Uuid,
}

impl PlayerRef {
    /// Create a new player reference
    pub fn new(name: String, account_id: Uuid) -> Self {
        Self {
            entity_id: Uuid::new_v4(),
            name,
            account_id,
        }
    }
}
