//! User entity, reduced to the fields the ledger subsystem touches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// A platform user.
///
/// Coin balances are never stored here; they live in the ledger and are
/// summed on demand.
///
/// ## Fields
/// - `id`: snowflake id
/// - `username`: unique handle, non-empty (validated at creation)
/// - `rewarded_at`: instant of the last daily-reward evaluation for this
///   user. Initialized to the creation instant. The reward engine advances
///   it at most once per UTC calendar day, inside the issuing transaction.
/// - `created_at` / `updated_at`: row timestamps (UTC)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub rewarded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user's reward evaluation already ran on or after the
    /// given UTC day start.
    #[inline]
    pub fn rewarded_since(&self, day_start: DateTime<Utc>) -> bool {
        self.rewarded_at >= day_start
    }
}
