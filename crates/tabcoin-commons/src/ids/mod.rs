//! Typed snowflake identifiers.
//!
//! Each entity kind gets its own newtype over the raw `i64` snowflake so ids
//! cannot be mixed up across tables at compile time. All newtypes share the
//! same surface: construction from/into `i64`, `Display`, serde as a bare
//! integer, and order-preserving [`StorageKey`] encoding.

mod generator;

pub use generator::IdGenerator;

use crate::keys::{decode_key, encode_key, StorageKey};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl StorageKey for $name {
            fn storage_key(&self) -> Vec<u8> {
                encode_key(&self.0)
            }

            fn from_storage_key(bytes: &[u8]) -> Result<Self, String> {
                let id: i64 = decode_key(bytes)?;
                Ok(Self(id))
            }
        }
    };
}

snowflake_id!(
    /// Identifier of a platform user.
    UserId
);

snowflake_id!(
    /// Identifier of a content item (root post or comment).
    ContentId
);

snowflake_id!(
    /// Identifier of a platform event (the audited cause of a mutation).
    EventId
);

snowflake_id!(
    /// Identifier of one balance operation (immutable ledger row).
    OperationId
);

snowflake_id!(
    /// Target of a balance operation: a user or a content item.
    ///
    /// The ledger is deliberately polymorphic over recipients, so this type
    /// erases the entity kind. Convert from the concrete id when appending.
    RecipientId
);

impl From<UserId> for RecipientId {
    fn from(id: UserId) -> Self {
        RecipientId::new(id.as_i64())
    }
}

impl From<ContentId> for RecipientId {
    fn from(id: ContentId) -> Self {
        RecipientId::new(id.as_i64())
    }
}

impl RecipientId {
    /// Reinterpret as a content id. Only valid when the surrounding
    /// `balance_type` is a content tag; the ledger enforces that pairing.
    pub fn as_content_id(&self) -> crate::ids::ContentId {
        ContentId::new(self.as_i64())
    }

    /// Reinterpret as a user id. Only valid for `user:*` balance types.
    pub fn as_user_id(&self) -> crate::ids::UserId {
        UserId::new(self.as_i64())
    }
}
