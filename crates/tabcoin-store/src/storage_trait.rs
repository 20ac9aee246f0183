//! Storage abstraction: partitions, transactions, isolation levels.
//!
//! The subsystem's storage needs are narrow: named partitions of ordered
//! byte keys, prefix scans, atomic multi-key transactions, and a
//! distinguishable write-conflict signal under snapshot isolation. Any
//! engine providing those can back the ledger; [`crate::MemoryDatastore`]
//! is the bundled one.
//!
//! ## Read paths
//!
//! [`StorageRead`] is implemented twice with different visibility rules:
//! - by a [`Datastore`], reading the latest committed state (used for
//!   balance sums and listings outside any transaction), and
//! - by a [`StorageTransaction`], reading through the transaction's
//!   isolation rules overlaid with its own uncommitted writes
//!   (read-your-writes).
//!
//! Query code takes `&dyn StorageRead` and works against either.

use std::fmt;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Partition not found
    PartitionNotFound(String),

    /// Write-write conflict detected at commit under snapshot isolation.
    /// Callers prepared for contention treat this as a benign signal.
    SerializationFailure(String),

    /// Operation on a transaction that already committed or rolled back
    TransactionClosed(String),

    /// Serialization/deserialization error from the row codec
    SerializationError(String),

    /// Generic I/O error from underlying storage
    IoError(String),

    /// Other errors
    Other(String),
}

impl StorageError {
    /// True for the conflict signal snapshot-isolation commits can raise.
    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, StorageError::SerializationFailure(_))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::PartitionNotFound(p) => write!(f, "Partition not found: {}", p),
            StorageError::SerializationFailure(msg) => {
                write!(f, "Serialization failure: {}", msg)
            }
            StorageError::TransactionClosed(msg) => write!(f, "Transaction closed: {}", msg),
            StorageError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            StorageError::IoError(msg) => write!(f, "I/O error: {}", msg),
            StorageError::Other(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// A named partition of ordered key-value pairs.
///
/// Maps to a column family, tree, or namespace in concrete engines; the
/// bundled memory engine keeps one ordered map per partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    name: String,
}

impl Partition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<String> for Partition {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Partition {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Each read observes the latest committed state; commits never raise
    /// write conflicts (last writer wins).
    ReadCommitted,

    /// Snapshot isolation: all reads observe the state as of `begin`;
    /// commit fails with [`StorageError::SerializationFailure`] if another
    /// transaction committed a write to one of this transaction's written
    /// keys after the snapshot was taken (first committer wins).
    RepeatableRead,

    /// Accepted as a superset request; currently behaves exactly like
    /// `RepeatableRead` (snapshot isolation without predicate-level
    /// serializability checks).
    Serializable,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "read committed",
            IsolationLevel::RepeatableRead => "repeatable read",
            IsolationLevel::Serializable => "serializable",
        }
    }

    /// Whether this level takes a begin-time snapshot and checks write
    /// conflicts at commit.
    pub fn uses_snapshot(&self) -> bool {
        matches!(
            self,
            IsolationLevel::RepeatableRead | IsolationLevel::Serializable
        )
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read access to partitioned key-value state.
pub trait StorageRead: Send + Sync {
    /// Look up a single key. `Ok(None)` when absent.
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    /// An empty prefix scans the whole partition.
    fn scan_prefix(&self, partition: &Partition, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// One open transaction.
///
/// Single-use: after `commit` or `rollback` every further operation fails
/// with [`StorageError::TransactionClosed`]. Implementations roll back on
/// drop, so early returns never leak a half-done transaction.
pub trait StorageTransaction: StorageRead {
    /// Buffer a write. Visible to this transaction's own reads immediately,
    /// to others only after commit.
    fn put(&mut self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()>;

    /// Buffer a deletion.
    fn delete(&mut self, partition: &Partition, key: &[u8]) -> Result<()>;

    /// Atomically publish all buffered writes.
    ///
    /// Under snapshot isolation this is where write-write conflicts
    /// surface as [`StorageError::SerializationFailure`]; the transaction
    /// is rolled back in that case.
    fn commit(&mut self) -> Result<()>;

    /// Discard all buffered writes. Idempotent.
    fn rollback(&mut self) -> Result<()>;

    /// The isolation level this transaction was begun with.
    fn isolation(&self) -> IsolationLevel;

    /// This transaction as a plain reader, for query code that accepts
    /// `&dyn StorageRead`.
    fn as_read(&self) -> &dyn StorageRead;
}

/// A transactional datastore.
///
/// The `StorageRead` supertrait reads the latest committed state, outside
/// any transaction.
pub trait Datastore: StorageRead {
    /// Begin a transaction at the given isolation level.
    fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn StorageTransaction + '_>>;

    /// Create a partition if it does not exist. Idempotent.
    fn create_partition(&self, partition: &Partition) -> Result<()>;

    fn partition_exists(&self, partition: &Partition) -> Result<bool>;

    fn list_partitions(&self) -> Result<Vec<String>>;

    /// Atomically advance and return the named counter (first call returns
    /// 1). Deliberately non-transactional, like SQL sequences: values given
    /// to transactions that later roll back are never reissued, so
    /// sequences are monotonic but gappy.
    fn next_sequence(&self, name: &str) -> Result<u64>;

    /// This datastore as a plain reader over committed state.
    fn as_read(&self) -> &dyn StorageRead;
}
