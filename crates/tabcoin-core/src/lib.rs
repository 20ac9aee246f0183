//! TabCoin engine: balance ledger, content scoring, prestige and the
//! daily reward, over a pluggable transactional datastore.
//!
//! Construct an [`EngineContext`] around a [`Datastore`] and reach
//! everything through it:
//!
//! ```
//! use std::sync::Arc;
//! use tabcoin_core::{EngineConfig, EngineContext, MemoryDatastore};
//!
//! let datastore = Arc::new(MemoryDatastore::new());
//! let ctx = EngineContext::new(datastore, EngineConfig::default()).unwrap();
//! assert_eq!(ctx.config().worker_id, 0);
//! ```

pub mod context;
pub mod error;
pub mod services;
pub mod stores;
pub mod test_helpers;

pub use context::EngineContext;
pub use error::{Result, TabcoinError};
pub use services::{
    BalanceParams, BalanceService, ContentTabcoins, PrestigeService, PrestigeWindow,
    RewardService, ScoreService,
};
pub use stores::{
    ContentFilter, ContentStore, ContentTabcoinSums, EventStore, LedgerStore, ListStrategy,
    NewBalanceOperation, NewContent, NewEvent, NewUser, UserStore,
};

// Companion crates, re-exported so engine callers need a single import.
pub use tabcoin_commons::config::{ConfigError, EngineConfig, PrestigeDefaults};
pub use tabcoin_commons::ids::{ContentId, EventId, IdGenerator, OperationId, RecipientId, UserId};
pub use tabcoin_commons::models::{
    BalanceOperation, BalanceType, Content, ContentKind, ContentStatus, Event, EventType,
    Originator, OriginatorType, User,
};
pub use tabcoin_store::{
    Datastore, IsolationLevel, MemoryDatastore, Partition, StorageError, StorageRead,
    StorageTransaction,
};
