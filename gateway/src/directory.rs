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

//! In-memory account directory
//!
//! The standalone gateway binary keeps accounts in memory with bcrypt
//! password hashes. Logins are case-insensitive. Anything durable belongs to
//! a world-side implementation of [`AccountDirectory`].

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use thornvale_common::account::{validate_login, validate_password};
use thornvale_common::{Account, AccountDirectory, AccountLookup, WorldError};

struct StoredAccount {
    account: Account,
    password_hash: String,
}

/// Bcrypt-backed in-memory [`AccountDirectory`]
#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: DashMap<String, StoredAccount>,
}

impl MemoryAccountDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account, hashing the given password
    ///
    /// Intended for startup seeding and tests.
    pub fn with_account(self, login: &str, password: &str) -> Result<Self, WorldError> {
        self.insert(login, password)?;
        Ok(self)
    }

    fn insert(&self, login: &str, password: &str) -> Result<Account, WorldError> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| WorldError::Unavailable(format!("password hashing failed: {}", e)))?;

        let account = Account {
            id: uuid::Uuid::new_v4(),
            login: login.to_string(),
            created_at: Utc::now(),
            last_login: None,
            active: true,
        };

        self.accounts.insert(
            login.to_lowercase(),
            StoredAccount {
                account: account.clone(),
                password_hash,
            },
        );
        Ok(account)
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn lookup(&self, login: &str) -> Result<AccountLookup, WorldError> {
        if self.accounts.contains_key(&login.to_lowercase()) {
            Ok(AccountLookup::Existing)
        } else {
            Ok(AccountLookup::Unknown)
        }
    }

    async fn verify_password(&self, login: &str, attempt: &str) -> Result<bool, WorldError> {
        let Some(stored) = self.accounts.get(&login.to_lowercase()) else {
            return Ok(false);
        };
        bcrypt::verify(attempt, &stored.password_hash)
            .map_err(|e| WorldError::Unavailable(format!("password verification failed: {}", e)))
    }

    async fn create_account(&self, login: &str, password: &str) -> Result<Account, WorldError> {
        validate_login(login).map_err(WorldError::Rejected)?;
        validate_password(password).map_err(WorldError::Rejected)?;
        if self.accounts.contains_key(&login.to_lowercase()) {
            return Err(WorldError::Rejected(format!(
                "The name '{}' is already taken.",
                login
            )));
        }
        self.insert(login, password)
    }

    async fn account(&self, login: &str) -> Result<Account, WorldError> {
        self.accounts
            .get(&login.to_lowercase())
            .map(|stored| stored.account.clone())
            .ok_or_else(|| WorldError::Rejected(format!("No account named '{}'.", login)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_existing_and_unknown() {
        let directory = MemoryAccountDirectory::new()
            .with_account("Alice", "swordfish")
            .unwrap();

        assert_eq!(
            directory.lookup("Alice").await.unwrap(),
            AccountLookup::Existing
        );
        // Case-insensitive, like every MUD login ever
        assert_eq!(
            directory.lookup("alice").await.unwrap(),
            AccountLookup::Existing
        );
        assert_eq!(
            directory.lookup("Bob").await.unwrap(),
            AccountLookup::Unknown
        );
    }

    #[tokio::test]
    async fn test_verify_password() {
        let directory = MemoryAccountDirectory::new()
            .with_account("Alice", "swordfish")
            .unwrap();

        assert!(directory.verify_password("alice", "swordfish").await.unwrap());
        assert!(!directory.verify_password("alice", "trout").await.unwrap());
        assert!(!directory.verify_password("nobody", "swordfish").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_account_validates() {
        let directory = MemoryAccountDirectory::new();

        assert!(matches!(
            directory.create_account("ab", "longenough").await,
            Err(WorldError::Rejected(_))
        ));
        assert!(matches!(
            directory.create_account("goodname", "shrt").await,
            Err(WorldError::Rejected(_))
        ));

        let account = directory
            .create_account("goodname", "longenough")
            .await
            .unwrap();
        assert_eq!(account.login, "goodname");

        // Duplicate names are refused, case-insensitively
        assert!(matches!(
            directory.create_account("GoodName", "longenough").await,
            Err(WorldError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_account_fetch() {
        let directory = MemoryAccountDirectory::new()
            .with_account("Alice", "swordfish")
            .unwrap();

        let account = directory.account("ALICE").await.unwrap();
        assert_eq!(account.login, "Alice");
        assert!(directory.account("nobody").await.is_err());
    }
}
