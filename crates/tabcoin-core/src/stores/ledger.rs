//! Append-only store for balance operations.
//!
//! Three partitions back the ledger:
//! - `balance_operations`: full rows under `(balance_type, recipient_id,
//!   sequence)`, so one prefix scan walks a recipient's ledger for one tag
//!   in insert order.
//! - `balance_operations_by_id`: operation id to primary key.
//! - `balance_operations_by_originator`: `(originator_id, sequence)` to
//!   primary key, the audit and undo-detection path.
//!
//! Rows are immutable once written. There is no update or delete here by
//! construction; corrections are new compensating rows appended through
//! the balance service.

use std::sync::Arc;

use chrono::Utc;
use log::debug;

use tabcoin_commons::ids::{ContentId, IdGenerator, OperationId, RecipientId};
use tabcoin_commons::keys::{encode_key, encode_prefix, StorageKey};
use tabcoin_commons::models::{BalanceOperation, BalanceType, Originator};
use tabcoin_store::{from_bytes, to_bytes, Datastore, Partition, StorageError, StorageRead, StorageTransaction};

use crate::error::{Result, TabcoinError};
use crate::stores::{partitions, SEQ_BALANCE_OPERATIONS};

/// Caller-supplied fields of a new ledger row. The store assigns `id`,
/// `sequence` and `created_at` at append time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewBalanceOperation {
    pub balance_type: BalanceType,
    pub recipient_id: RecipientId,
    pub amount: i64,
    #[serde(flatten)]
    pub originator: Originator,
}

/// Sign-partitioned totals over a content item's tabcoin group.
///
/// `positive` and `negative` split every row in the group by the sign of
/// its amount (`negative` is therefore zero or below); `initial` is the
/// `content:tabcoin:initial` subtotal on its own; `total` is the group sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ContentTabcoinSums {
    pub initial: i64,
    pub positive: i64,
    pub negative: i64,
    pub total: i64,
}

/// Store for the append-only balance ledger.
pub struct LedgerStore {
    datastore: Arc<dyn Datastore>,
    ids: Arc<IdGenerator>,
    primary: Partition,
    by_id: Partition,
    by_originator: Partition,
}

impl LedgerStore {
    pub fn new(datastore: Arc<dyn Datastore>, ids: Arc<IdGenerator>) -> Self {
        Self {
            datastore,
            ids,
            primary: Partition::new(partitions::BALANCE_OPERATIONS),
            by_id: Partition::new(partitions::BALANCE_OPERATIONS_BY_ID),
            by_originator: Partition::new(partitions::BALANCE_OPERATIONS_BY_ORIGINATOR),
        }
    }

    fn primary_key(operation: &BalanceOperation) -> Vec<u8> {
        encode_key(&(
            operation.balance_type.as_str(),
            operation.recipient_id.as_i64(),
            operation.sequence,
        ))
    }

    /// Append one row inside the caller's transaction.
    ///
    /// The sequence comes from a non-transactional datastore counter, so a
    /// rolled-back append leaves a gap; this keeps concurrent appends from
    /// ever contending on a shared key. No business validation happens
    /// here; the balance service rejects zero amounts before calling.
    pub fn append(
        &self,
        txn: &mut dyn StorageTransaction,
        new_operation: NewBalanceOperation,
    ) -> Result<BalanceOperation> {
        let id = self.ids.next_operation_id().map_err(TabcoinError::InvalidId)?;
        let sequence = self.datastore.next_sequence(SEQ_BALANCE_OPERATIONS)?;

        let operation = BalanceOperation {
            id,
            sequence,
            balance_type: new_operation.balance_type,
            recipient_id: new_operation.recipient_id,
            amount: new_operation.amount,
            originator: new_operation.originator,
            created_at: Utc::now(),
        };

        let primary_key = Self::primary_key(&operation);
        txn.put(&self.primary, &primary_key, &to_bytes(&operation)?)?;
        txn.put(&self.by_id, &operation.id.storage_key(), &primary_key)?;
        txn.put(
            &self.by_originator,
            &encode_key(&(operation.originator.id(), operation.sequence)),
            &primary_key,
        )?;

        debug!(
            "appended operation {} seq={} type={} recipient={} amount={}",
            operation.id,
            operation.sequence,
            operation.balance_type,
            operation.recipient_id,
            operation.amount
        );
        Ok(operation)
    }

    /// Sum of `amount` over one (recipient, tag) ledger. Zero when the
    /// recipient has no rows; absence is not an error.
    pub fn sum_by_recipient_and_type(
        &self,
        reader: &dyn StorageRead,
        recipient_id: RecipientId,
        balance_type: BalanceType,
    ) -> Result<i64> {
        let prefix = encode_prefix(&(balance_type.as_str(), recipient_id.as_i64()));
        let mut sum = 0i64;
        for (_key, value) in reader.scan_prefix(&self.primary, &prefix)? {
            let operation: BalanceOperation = from_bytes(&value)?;
            sum += operation.amount;
        }
        Ok(sum)
    }

    /// One pass over the three content-tabcoin tags of a content item.
    pub fn content_tabcoin_sums(
        &self,
        reader: &dyn StorageRead,
        content_id: ContentId,
    ) -> Result<ContentTabcoinSums> {
        let mut sums = ContentTabcoinSums::default();
        for tag in BalanceType::CONTENT_TABCOIN_GROUP {
            let prefix = encode_prefix(&(tag.as_str(), content_id.as_i64()));
            for (_key, value) in reader.scan_prefix(&self.primary, &prefix)? {
                let operation: BalanceOperation = from_bytes(&value)?;
                if tag == BalanceType::ContentTabcoinInitial {
                    sums.initial += operation.amount;
                }
                if operation.amount > 0 {
                    sums.positive += operation.amount;
                } else {
                    sums.negative += operation.amount;
                }
                sums.total += operation.amount;
            }
        }
        Ok(sums)
    }

    /// All rows attributed to one originator id, ascending sequence (which
    /// equals insertion order).
    pub fn list_by_originator(
        &self,
        reader: &dyn StorageRead,
        originator_id: i64,
    ) -> Result<Vec<BalanceOperation>> {
        let prefix = encode_prefix(&originator_id);
        let mut operations = Vec::new();
        for (_key, primary_key) in reader.scan_prefix(&self.by_originator, &prefix)? {
            let Some(value) = reader.get(&self.primary, &primary_key)? else {
                return Err(StorageError::Other(format!(
                    "dangling originator index entry for originator {}",
                    originator_id
                ))
                .into());
            };
            operations.push(from_bytes(&value)?);
        }
        Ok(operations)
    }

    pub fn find_by_id(
        &self,
        reader: &dyn StorageRead,
        id: OperationId,
    ) -> Result<Option<BalanceOperation>> {
        let Some(primary_key) = reader.get(&self.by_id, &id.storage_key())? else {
            return Ok(None);
        };
        let Some(value) = reader.get(&self.primary, &primary_key)? else {
            return Err(
                StorageError::Other(format!("dangling id index entry for operation {}", id)).into(),
            );
        };
        Ok(Some(from_bytes(&value)?))
    }
}
