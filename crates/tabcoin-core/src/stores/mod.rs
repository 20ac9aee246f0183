//! Entity stores over the partitioned datastore.
//!
//! Stores own the key layout and row codec for one entity each and nothing
//! else: mutations go through a caller-provided transaction, reads through
//! any [`StorageRead`](tabcoin_store::StorageRead) (committed state or an
//! open transaction). Business rules live one layer up, in the services.

pub mod contents;
pub mod events;
pub mod ledger;
pub mod users;

pub use contents::{ContentFilter, ContentStore, ListStrategy, NewContent};
pub use events::{EventStore, NewEvent};
pub use ledger::{ContentTabcoinSums, LedgerStore, NewBalanceOperation};
pub use users::{NewUser, UserStore};

use tabcoin_store::{Datastore, Partition};

use crate::error::Result;

/// Partition names, all created by [`init_partitions`].
pub mod partitions {
    /// Primary ledger rows, keyed `(balance_type, recipient_id, sequence)`.
    pub const BALANCE_OPERATIONS: &str = "balance_operations";
    /// Operation id -> primary key.
    pub const BALANCE_OPERATIONS_BY_ID: &str = "balance_operations_by_id";
    /// `(originator_id, sequence)` -> primary key.
    pub const BALANCE_OPERATIONS_BY_ORIGINATOR: &str = "balance_operations_by_originator";
    /// User rows keyed by id.
    pub const USERS: &str = "users";
    /// Username -> user id, for uniqueness at creation.
    pub const USERS_BY_USERNAME: &str = "users_by_username";
    /// Content rows keyed by id.
    pub const CONTENTS: &str = "contents";
    /// `(owner_id, published_at_ms, id)` -> primary key, published rows only.
    pub const CONTENTS_BY_OWNER: &str = "contents_by_owner";
    /// Event rows keyed by id.
    pub const EVENTS: &str = "events";

    pub const ALL: [&str; 8] = [
        BALANCE_OPERATIONS,
        BALANCE_OPERATIONS_BY_ID,
        BALANCE_OPERATIONS_BY_ORIGINATOR,
        USERS,
        USERS_BY_USERNAME,
        CONTENTS,
        CONTENTS_BY_OWNER,
        EVENTS,
    ];
}

/// Name of the datastore sequence behind `BalanceOperation::sequence`.
pub const SEQ_BALANCE_OPERATIONS: &str = "balance_operations";

/// Create every partition the stores use. Idempotent; run once at startup
/// (the engine context does this).
pub fn init_partitions(datastore: &dyn Datastore) -> Result<()> {
    for name in partitions::ALL {
        datastore.create_partition(&Partition::new(name))?;
    }
    Ok(())
}
