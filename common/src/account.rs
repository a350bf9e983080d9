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

//! Account data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account information (the password hash is never included)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub login: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub active: bool,
}

impl Account {
    /// Create a new account record
    pub fn new(login: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            login,
            created_at: Utc::now(),
            last_login: None,
            active: true,
        }
    }
}

/// Result of a name lookup against the account directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLookup {
    /// The name belongs to an existing account
    Existing,
    /// The name is free; logging in with it starts account creation
    Unknown,
}

/// Validate a login name for account creation
///
/// Names are 3-20 characters of letters, digits, and underscores.
pub fn validate_login(login: &str) -> Result<(), String> {
    if login.len() < 3 {
        return Err("Name must be at least 3 characters".to_string());
    }
    if login.len() > 20 {
        return Err("Name must be at most 20 characters".to_string());
    }
    if !login.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err("Name can only contain letters, numbers, and underscores".to_string());
    }
    Ok(())
}

/// Validate a password for account creation
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }
    if password.len() > 100 {
        return Err("Password must be at most 100 characters".to_string());
    }
    Ok(())
}
