//! User store.
//!
//! Two partitions: `users` (rows by id) and `users_by_username` (username
//! to id, enforcing uniqueness at creation). Coin balances never live on
//! the user row; they are summed from the ledger on demand.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tabcoin_commons::ids::{IdGenerator, UserId};
use tabcoin_commons::keys::{encode_key, StorageKey};
use tabcoin_commons::models::User;
use tabcoin_store::{from_bytes, to_bytes, Partition, StorageRead, StorageTransaction};

use crate::error::{Result, TabcoinError};
use crate::stores::partitions;

/// Caller-supplied fields of a new user.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewUser {
    pub username: String,
}

pub struct UserStore {
    ids: Arc<IdGenerator>,
    primary: Partition,
    by_username: Partition,
}

impl UserStore {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self {
            ids,
            primary: Partition::new(partitions::USERS),
            by_username: Partition::new(partitions::USERS_BY_USERNAME),
        }
    }

    /// Create a user with a fresh id and `rewarded_at` set to now.
    ///
    /// Rejects an empty username (`Validation`) and a taken one
    /// (`Conflict`). The uniqueness check reads through the transaction,
    /// so two creations in the same transaction also collide.
    pub fn create(&self, txn: &mut dyn StorageTransaction, new_user: NewUser) -> Result<User> {
        let username = new_user.username.trim().to_string();
        if username.is_empty() {
            return Err(TabcoinError::validation("username cannot be empty"));
        }

        let username_key = encode_key(&username.as_str());
        if txn.get(&self.by_username, &username_key)?.is_some() {
            return Err(TabcoinError::conflict(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let id = self.ids.next_user_id().map_err(TabcoinError::InvalidId)?;
        let now = Utc::now();
        let user = User {
            id,
            username,
            rewarded_at: now,
            created_at: now,
            updated_at: now,
        };

        txn.put(&self.primary, &user.id.storage_key(), &to_bytes(&user)?)?;
        txn.put(&self.by_username, &username_key, &user.id.storage_key())?;
        Ok(user)
    }

    pub fn find_by_id(&self, reader: &dyn StorageRead, id: UserId) -> Result<Option<User>> {
        match reader.get(&self.primary, &id.storage_key())? {
            Some(value) => Ok(Some(from_bytes(&value)?)),
            None => Ok(None),
        }
    }

    pub fn find_by_username(
        &self,
        reader: &dyn StorageRead,
        username: &str,
    ) -> Result<Option<User>> {
        let Some(id_key) = reader.get(&self.by_username, &encode_key(&username))? else {
            return Ok(None);
        };
        let id = UserId::from_storage_key(&id_key).map_err(TabcoinError::InvalidId)?;
        self.find_by_id(reader, id)
    }

    /// Rewrite the user row with a new `rewarded_at`.
    ///
    /// This read-modify-write is the single key two concurrent reward
    /// claims both touch; under snapshot isolation exactly one of them
    /// commits.
    pub fn update_rewarded_at(
        &self,
        txn: &mut dyn StorageTransaction,
        id: UserId,
        rewarded_at: DateTime<Utc>,
    ) -> Result<User> {
        let mut user = self
            .find_by_id(txn.as_read(), id)?
            .ok_or_else(|| TabcoinError::not_found(format!("user {} not found", id)))?;

        user.rewarded_at = rewarded_at;
        user.updated_at = rewarded_at;
        txn.put(&self.primary, &user.id.storage_key(), &to_bytes(&user)?)?;
        Ok(user)
    }
}
