//! Bundled in-memory datastore with multi-version concurrency control.
//!
//! Partitions are ordered maps of version chains. A chain holds the
//! committed values of one key, tagged with the global commit version that
//! published them (`None` marks a deletion). Snapshot transactions read the
//! newest chain entry at or below their snapshot version; read-committed
//! transactions and plain datastore reads take the newest entry outright.
//!
//! Commits are first-committer-wins: a snapshot transaction whose written
//! keys gained a newer committed version since its snapshot fails with
//! `SerializationFailure` and publishes nothing. Chains are pruned at
//! commit down to what the oldest live snapshot can still see, so
//! long-running processes do not accumulate history.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::storage_trait::{
    Datastore, IsolationLevel, Partition, Result, StorageError, StorageRead, StorageTransaction,
};

#[derive(Debug, Clone)]
struct VersionedValue {
    version: u64,
    value: Option<Vec<u8>>,
}

type VersionChain = Vec<VersionedValue>;
type PartitionMap = BTreeMap<Vec<u8>, VersionChain>;

struct Inner {
    partitions: HashMap<String, PartitionMap>,
    /// Version of the most recent commit. 0 = empty store.
    committed_version: u64,
    /// Live snapshot versions with reference counts, oldest first.
    active_snapshots: BTreeMap<u64, usize>,
}

/// In-memory [`Datastore`] with snapshot isolation.
pub struct MemoryDatastore {
    inner: RwLock<Inner>,
    sequences: Mutex<HashMap<String, u64>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                partitions: HashMap::new(),
                committed_version: 0,
                active_snapshots: BTreeMap::new(),
            }),
            sequences: Mutex::new(HashMap::new()),
        }
    }

    fn release_snapshot(&self, snapshot: Option<u64>) {
        if let Some(version) = snapshot {
            let mut inner = self.inner.write();
            if let Some(count) = inner.active_snapshots.get_mut(&version) {
                *count -= 1;
                if *count == 0 {
                    inner.active_snapshots.remove(&version);
                }
            }
        }
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest value visible at `snapshot`, walking the chain from the end.
fn visible_at(chain: &VersionChain, snapshot: u64) -> Option<&VersionedValue> {
    chain.iter().rev().find(|v| v.version <= snapshot)
}

/// Smallest byte string strictly greater than every string starting with
/// `prefix`, or `None` when no such bound exists.
fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < u8::MAX {
            *last += 1;
            return Some(end);
        }
        end.pop();
    }
    None
}

/// Collect the visible pairs of one partition range at a snapshot.
fn collect_visible(
    map: &PartitionMap,
    prefix: &[u8],
    snapshot: u64,
) -> BTreeMap<Vec<u8>, Vec<u8>> {
    let mut out = BTreeMap::new();
    let range: Box<dyn Iterator<Item = (&Vec<u8>, &VersionChain)>> = match prefix_end(prefix) {
        Some(end) => Box::new(map.range(prefix.to_vec()..end)),
        None => Box::new(map.range(prefix.to_vec()..)),
    };
    for (key, chain) in range {
        if let Some(entry) = visible_at(chain, snapshot) {
            if let Some(value) = &entry.value {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

impl StorageRead for MemoryDatastore {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read();
        let map = inner
            .partitions
            .get(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        Ok(map
            .get(key)
            .and_then(|chain| visible_at(chain, u64::MAX))
            .and_then(|entry| entry.value.clone()))
    }

    fn scan_prefix(&self, partition: &Partition, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let inner = self.inner.read();
        let map = inner
            .partitions
            .get(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        Ok(collect_visible(map, prefix, u64::MAX).into_iter().collect())
    }
}

impl Datastore for MemoryDatastore {
    fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn StorageTransaction + '_>> {
        let snapshot = if isolation.uses_snapshot() {
            let mut inner = self.inner.write();
            let version = inner.committed_version;
            *inner.active_snapshots.entry(version).or_insert(0) += 1;
            Some(version)
        } else {
            None
        };

        Ok(Box::new(MemoryTransaction {
            datastore: self,
            isolation,
            snapshot,
            writes: HashMap::new(),
            state: TxnState::Open,
        }))
    }

    fn create_partition(&self, partition: &Partition) -> Result<()> {
        let mut inner = self.inner.write();
        inner
            .partitions
            .entry(partition.name().to_string())
            .or_default();
        Ok(())
    }

    fn partition_exists(&self, partition: &Partition) -> Result<bool> {
        Ok(self.inner.read().partitions.contains_key(partition.name()))
    }

    fn list_partitions(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.inner.read().partitions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn next_sequence(&self, name: &str) -> Result<u64> {
        let mut sequences = self.sequences.lock();
        let counter = sequences.entry(name.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn as_read(&self) -> &dyn StorageRead {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Open,
    Committed,
    RolledBack,
}

/// One open transaction against a [`MemoryDatastore`].
///
/// Writes are buffered per partition (`None` = pending deletion) and only
/// published at commit. Dropping an open transaction rolls it back.
pub struct MemoryTransaction<'a> {
    datastore: &'a MemoryDatastore,
    isolation: IsolationLevel,
    /// Snapshot version, `None` for read-committed.
    snapshot: Option<u64>,
    writes: HashMap<String, BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    state: TxnState,
}

impl MemoryTransaction<'_> {
    fn ensure_open(&self) -> Result<()> {
        match self.state {
            TxnState::Open => Ok(()),
            TxnState::Committed => Err(StorageError::TransactionClosed(
                "transaction already committed".to_string(),
            )),
            TxnState::RolledBack => Err(StorageError::TransactionClosed(
                "transaction already rolled back".to_string(),
            )),
        }
    }

    fn read_version(&self) -> u64 {
        // Read-committed reads track the latest commit at each call.
        self.snapshot.unwrap_or(u64::MAX)
    }

    fn buffer_write(&mut self, partition: &Partition, key: &[u8], value: Option<Vec<u8>>) -> Result<()> {
        self.ensure_open()?;
        if !self.datastore.partition_exists(partition)? {
            return Err(StorageError::PartitionNotFound(partition.name().to_string()));
        }
        self.writes
            .entry(partition.name().to_string())
            .or_default()
            .insert(key.to_vec(), value);
        Ok(())
    }
}

impl StorageRead for MemoryTransaction<'_> {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;

        // Own uncommitted writes shadow committed state.
        if let Some(pending) = self
            .writes
            .get(partition.name())
            .and_then(|map| map.get(key))
        {
            return Ok(pending.clone());
        }

        let inner = self.datastore.inner.read();
        let map = inner
            .partitions
            .get(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        Ok(map
            .get(key)
            .and_then(|chain| visible_at(chain, self.read_version()))
            .and_then(|entry| entry.value.clone()))
    }

    fn scan_prefix(&self, partition: &Partition, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_open()?;

        let mut merged = {
            let inner = self.datastore.inner.read();
            let map = inner
                .partitions
                .get(partition.name())
                .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
            collect_visible(map, prefix, self.read_version())
        };

        // Overlay this transaction's own writes within the range.
        if let Some(pending) = self.writes.get(partition.name()) {
            let range: Box<dyn Iterator<Item = (&Vec<u8>, &Option<Vec<u8>>)>> =
                match prefix_end(prefix) {
                    Some(end) => Box::new(pending.range(prefix.to_vec()..end)),
                    None => Box::new(pending.range(prefix.to_vec()..)),
                };
            for (key, value) in range {
                match value {
                    Some(v) => {
                        merged.insert(key.clone(), v.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

impl StorageTransaction for MemoryTransaction<'_> {
    fn put(&mut self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        self.buffer_write(partition, key, Some(value.to_vec()))
    }

    fn delete(&mut self, partition: &Partition, key: &[u8]) -> Result<()> {
        self.buffer_write(partition, key, None)
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;

        let mut inner = self.datastore.inner.write();

        // First committer wins: any written key with a commit newer than our
        // snapshot means someone else got there first.
        if let Some(snapshot) = self.snapshot {
            for (partition, pending) in &self.writes {
                let Some(map) = inner.partitions.get(partition) else {
                    continue;
                };
                for key in pending.keys() {
                    let conflicting = map
                        .get(key)
                        .and_then(|chain| chain.last())
                        .map(|newest| newest.version > snapshot)
                        .unwrap_or(false);
                    if conflicting {
                        debug!(
                            "write-write conflict in partition {} (snapshot {})",
                            partition, snapshot
                        );
                        drop(inner);
                        self.state = TxnState::RolledBack;
                        self.datastore.release_snapshot(self.snapshot);
                        return Err(StorageError::SerializationFailure(format!(
                            "concurrent update committed after snapshot {} in partition {}",
                            snapshot, partition
                        )));
                    }
                }
            }
        }

        let version = inner.committed_version + 1;
        inner.committed_version = version;

        let oldest_live = inner
            .active_snapshots
            .keys()
            .next()
            .copied()
            .unwrap_or(version);

        for (partition, pending) in self.writes.drain() {
            let Some(map) = inner.partitions.get_mut(&partition) else {
                continue;
            };
            for (key, value) in pending {
                let chain = map.entry(key.clone()).or_default();
                chain.push(VersionedValue { version, value });
                prune_chain(chain, oldest_live);
                if chain.is_empty() {
                    map.remove(&key);
                }
            }
        }

        drop(inner);
        self.state = TxnState::Committed;
        self.datastore.release_snapshot(self.snapshot);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.state == TxnState::Open {
            self.writes.clear();
            self.state = TxnState::RolledBack;
            self.datastore.release_snapshot(self.snapshot);
        }
        Ok(())
    }

    fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    fn as_read(&self) -> &dyn StorageRead {
        self
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        let _ = self.rollback();
    }
}

/// Drop chain history nothing can see anymore: everything strictly older
/// than the newest entry at or below the oldest live snapshot. A chain
/// whose only survivor is a tombstone older than every snapshot empties
/// out entirely so the key can be removed.
fn prune_chain(chain: &mut VersionChain, oldest_live: u64) {
    let keep_from = chain
        .iter()
        .rposition(|v| v.version <= oldest_live)
        .unwrap_or(0);
    chain.drain(..keep_from);
    if chain.len() == 1 && chain[0].value.is_none() && chain[0].version <= oldest_live {
        chain.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_partition(name: &str) -> (MemoryDatastore, Partition) {
        let store = MemoryDatastore::new();
        let partition = Partition::new(name);
        store.create_partition(&partition).unwrap();
        (store, partition)
    }

    #[test]
    fn test_put_commit_get() {
        let (store, partition) = store_with_partition("rows");

        let mut txn = store.begin(IsolationLevel::RepeatableRead).unwrap();
        txn.put(&partition, b"k1", b"v1").unwrap();
        txn.commit().unwrap();

        assert_eq!(store.get(&partition, b"k1").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(store.get(&partition, b"missing").unwrap(), None);
    }

    #[test]
    fn test_unknown_partition_errors() {
        let store = MemoryDatastore::new();
        let err = store.get(&Partition::new("nope"), b"k").unwrap_err();
        assert!(matches!(err, StorageError::PartitionNotFound(_)));
    }

    #[test]
    fn test_read_your_writes_and_overlay_scan() {
        let (store, partition) = store_with_partition("rows");

        let mut txn = store.begin(IsolationLevel::RepeatableRead).unwrap();
        txn.put(&partition, b"a1", b"1").unwrap();
        txn.put(&partition, b"a2", b"2").unwrap();
        assert_eq!(txn.get(&partition, b"a1").unwrap(), Some(b"1".to_vec()));

        let pairs = txn.scan_prefix(&partition, b"a").unwrap();
        assert_eq!(pairs.len(), 2);

        // Nothing visible outside until commit.
        assert!(store.scan_prefix(&partition, b"a").unwrap().is_empty());

        txn.commit().unwrap();
        assert_eq!(store.scan_prefix(&partition, b"a").unwrap().len(), 2);
    }

    #[test]
    fn test_snapshot_reads_are_repeatable() {
        let (store, partition) = store_with_partition("rows");

        let mut setup = store.begin(IsolationLevel::ReadCommitted).unwrap();
        setup.put(&partition, b"k", b"old").unwrap();
        setup.commit().unwrap();

        let reader = store.begin(IsolationLevel::RepeatableRead).unwrap();
        assert_eq!(reader.get(&partition, b"k").unwrap(), Some(b"old".to_vec()));

        let mut writer = store.begin(IsolationLevel::ReadCommitted).unwrap();
        writer.put(&partition, b"k", b"new").unwrap();
        writer.commit().unwrap();

        // Snapshot still sees the old value; committed state has the new one.
        assert_eq!(reader.get(&partition, b"k").unwrap(), Some(b"old".to_vec()));
        assert_eq!(store.get(&partition, b"k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_read_committed_sees_later_commits() {
        let (store, partition) = store_with_partition("rows");

        let reader = store.begin(IsolationLevel::ReadCommitted).unwrap();
        assert_eq!(reader.get(&partition, b"k").unwrap(), None);

        let mut writer = store.begin(IsolationLevel::ReadCommitted).unwrap();
        writer.put(&partition, b"k", b"v").unwrap();
        writer.commit().unwrap();

        assert_eq!(reader.get(&partition, b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_first_committer_wins() {
        let (store, partition) = store_with_partition("rows");

        let mut a = store.begin(IsolationLevel::RepeatableRead).unwrap();
        let mut b = store.begin(IsolationLevel::RepeatableRead).unwrap();

        a.put(&partition, b"k", b"from-a").unwrap();
        b.put(&partition, b"k", b"from-b").unwrap();

        a.commit().unwrap();
        let err = b.commit().unwrap_err();
        assert!(err.is_serialization_failure());

        // Loser published nothing.
        assert_eq!(store.get(&partition, b"k").unwrap(), Some(b"from-a".to_vec()));
    }

    #[test]
    fn test_disjoint_keys_do_not_conflict() {
        let (store, partition) = store_with_partition("rows");

        let mut a = store.begin(IsolationLevel::RepeatableRead).unwrap();
        let mut b = store.begin(IsolationLevel::RepeatableRead).unwrap();

        a.put(&partition, b"k1", b"1").unwrap();
        b.put(&partition, b"k2", b"2").unwrap();

        a.commit().unwrap();
        b.commit().unwrap();

        assert_eq!(store.scan_prefix(&partition, b"k").unwrap().len(), 2);
    }

    #[test]
    fn test_read_committed_never_conflicts() {
        let (store, partition) = store_with_partition("rows");

        let mut a = store.begin(IsolationLevel::ReadCommitted).unwrap();
        let mut b = store.begin(IsolationLevel::ReadCommitted).unwrap();
        a.put(&partition, b"k", b"a").unwrap();
        b.put(&partition, b"k", b"b").unwrap();
        a.commit().unwrap();
        b.commit().unwrap();

        // Last writer wins.
        assert_eq!(store.get(&partition, b"k").unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let (store, partition) = store_with_partition("rows");

        let mut txn = store.begin(IsolationLevel::RepeatableRead).unwrap();
        txn.put(&partition, b"k", b"v").unwrap();
        txn.rollback().unwrap();

        assert_eq!(store.get(&partition, b"k").unwrap(), None);
        let err = txn.put(&partition, b"k", b"v").unwrap_err();
        assert!(matches!(err, StorageError::TransactionClosed(_)));
    }

    #[test]
    fn test_drop_rolls_back() {
        let (store, partition) = store_with_partition("rows");

        {
            let mut txn = store.begin(IsolationLevel::RepeatableRead).unwrap();
            txn.put(&partition, b"k", b"v").unwrap();
            // dropped without commit
        }

        assert_eq!(store.get(&partition, b"k").unwrap(), None);
        // The dropped snapshot was released.
        assert!(store.inner.read().active_snapshots.is_empty());
    }

    #[test]
    fn test_delete_becomes_tombstone() {
        let (store, partition) = store_with_partition("rows");

        let mut setup = store.begin(IsolationLevel::ReadCommitted).unwrap();
        setup.put(&partition, b"k", b"v").unwrap();
        setup.commit().unwrap();

        let mut txn = store.begin(IsolationLevel::RepeatableRead).unwrap();
        txn.delete(&partition, b"k").unwrap();
        assert_eq!(txn.get(&partition, b"k").unwrap(), None);
        txn.commit().unwrap();

        assert_eq!(store.get(&partition, b"k").unwrap(), None);
        assert!(store.scan_prefix(&partition, b"").unwrap().is_empty());
    }

    #[test]
    fn test_commit_is_single_use() {
        let (store, partition) = store_with_partition("rows");

        let mut txn = store.begin(IsolationLevel::RepeatableRead).unwrap();
        txn.put(&partition, b"k", b"v").unwrap();
        txn.commit().unwrap();

        let err = txn.commit().unwrap_err();
        assert!(matches!(err, StorageError::TransactionClosed(_)));
    }

    #[test]
    fn test_next_sequence_monotonic() {
        let store = MemoryDatastore::new();
        assert_eq!(store.next_sequence("ops").unwrap(), 1);
        assert_eq!(store.next_sequence("ops").unwrap(), 2);
        // Independent counters per name.
        assert_eq!(store.next_sequence("events").unwrap(), 1);
        assert_eq!(store.next_sequence("ops").unwrap(), 3);
    }

    #[test]
    fn test_chain_pruning_keeps_snapshot_visible_history() {
        let (store, partition) = store_with_partition("rows");

        let mut setup = store.begin(IsolationLevel::ReadCommitted).unwrap();
        setup.put(&partition, b"k", b"v1").unwrap();
        setup.commit().unwrap();

        let reader = store.begin(IsolationLevel::RepeatableRead).unwrap();

        for value in [b"v2".as_slice(), b"v3", b"v4"] {
            let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
            txn.put(&partition, b"k", value).unwrap();
            txn.commit().unwrap();
        }

        // The old snapshot still resolves its version.
        assert_eq!(reader.get(&partition, b"k").unwrap(), Some(b"v1".to_vec()));
        drop(reader);

        // With no snapshots left, the next commit prunes history.
        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        txn.put(&partition, b"k", b"v5").unwrap();
        txn.commit().unwrap();

        let inner = store.inner.read();
        let chain = inner.partitions.get("rows").unwrap().get(b"k".as_slice()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].value.as_deref(), Some(b"v5".as_slice()));
    }

    #[test]
    fn test_concurrent_commits_from_threads() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryDatastore::new());
        let partition = Partition::new("rows");
        store.create_partition(&partition).unwrap();

        let mut handles = vec![];
        for i in 0..8u8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let partition = Partition::new("rows");
                let mut txn = store.begin(IsolationLevel::RepeatableRead).unwrap();
                txn.put(&partition, &[i], &[i]).unwrap();
                txn.commit().unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.scan_prefix(&partition, b"").unwrap().len(), 8);
    }
}
