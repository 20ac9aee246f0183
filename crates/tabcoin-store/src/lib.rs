//! # tabcoin-store
//!
//! Transactional key-value storage abstraction for the ledger subsystem.
//! This crate isolates all storage mechanics so tabcoin-core can stay free
//! of any concrete engine.
//!
//! ## Architecture
//!
//! ```text
//! tabcoin-core (ledger, scoring, prestige, reward)
//!     ↓
//! tabcoin-store (partitions, transactions, isolation)
//!     ↓
//! MemoryDatastore (bundled MVCC engine) or any other Datastore impl
//! ```
//!
//! ## Transactions
//!
//! Every mutation happens inside a [`StorageTransaction`] obtained from
//! [`Datastore::begin`] with an explicit [`IsolationLevel`]. The bundled
//! [`MemoryDatastore`] implements snapshot isolation: `RepeatableRead`
//! transactions read a frozen snapshot and fail at commit with
//! [`StorageError::SerializationFailure`] when another transaction
//! committed a write to one of their written keys first. That signal is
//! what the daily-reward engine treats as "a concurrent request already
//! claimed it".

pub mod codec;
pub mod memory;
pub mod storage_trait;

pub use codec::{from_bytes, to_bytes};
pub use memory::MemoryDatastore;
pub use storage_trait::{
    Datastore, IsolationLevel, Partition, Result, StorageError, StorageRead, StorageTransaction,
};

// Re-export the key encoding so store users need only one import path.
pub use tabcoin_commons::keys::{decode_key, encode_key, encode_prefix, StorageKey};
