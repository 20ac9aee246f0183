//! # tabcoin-commons
//!
//! Shared types for the TabCoin ledger subsystem.
//!
//! This crate provides the foundation used across the workspace
//! (tabcoin-store, tabcoin-core): typed snowflake identifiers, the closed
//! enums behind the ledger's string tags, the entity models, order-preserving
//! storage-key encoding, and the engine configuration.
//!
//! ## Type-safe identifiers
//!
//! Every entity id is a 64-bit snowflake wrapped in its own newtype:
//! - `UserId`, `ContentId`, `EventId`, `OperationId`
//! - `RecipientId`: the polymorphic target of a balance operation (a user or
//!   a content item)
//!
//! IDs from a single [`ids::IdGenerator`] are unique across all entity kinds,
//! which is what makes the polymorphic originator reference sound.
//!
//! ## Example
//!
//! ```rust
//! use tabcoin_commons::ids::{IdGenerator, UserId};
//! use tabcoin_commons::models::{BalanceType, Originator};
//!
//! let ids = IdGenerator::new(0);
//! let user = UserId::new(ids.next_id().unwrap());
//! let tag = BalanceType::UserTabcoin;
//! assert_eq!(tag.as_str(), "user:tabcoin");
//! let cause = Originator::User(user);
//! assert_eq!(cause.type_tag().as_str(), "user");
//! ```

pub mod config;
pub mod ids;
pub mod keys;
pub mod models;

pub use config::{ConfigError, EngineConfig, PrestigeDefaults};
pub use ids::{ContentId, EventId, IdGenerator, OperationId, RecipientId, UserId};
pub use keys::{decode_key, encode_key, encode_prefix, StorageKey};
pub use models::{
    BalanceOperation, BalanceType, Content, ContentKind, ContentStatus, Event, EventType,
    Originator, OriginatorType, User,
};
