//! Balance creation, lookup and undo.
//!
//! The single write path into the ledger. Everything that credits or
//! debits a balance goes through [`BalanceService::create`], which is also
//! where content score recomputation hooks in: any append with a
//! content-tabcoin tag rewrites the recipient's cached score in the same
//! transaction.

use std::sync::Arc;

use log::warn;

use tabcoin_commons::ids::{ContentId, OperationId, RecipientId};
use tabcoin_commons::models::{BalanceOperation, BalanceType, Originator};
use tabcoin_store::{Datastore, StorageTransaction};

use crate::error::{Result, TabcoinError};
use crate::services::ScoreService;
use crate::stores::{ContentTabcoinSums, LedgerStore, NewBalanceOperation};

/// Input to [`BalanceService::create`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BalanceParams {
    pub balance_type: BalanceType,
    pub recipient_id: RecipientId,
    pub amount: i64,
    #[serde(flatten)]
    pub originator: Originator,
}

pub struct BalanceService {
    datastore: Arc<dyn Datastore>,
    ledger: Arc<LedgerStore>,
    scores: Arc<ScoreService>,
}

impl BalanceService {
    pub fn new(
        datastore: Arc<dyn Datastore>,
        ledger: Arc<LedgerStore>,
        scores: Arc<ScoreService>,
    ) -> Self {
        Self {
            datastore,
            ledger,
            scores,
        }
    }

    /// Append a balance operation inside the caller's transaction.
    ///
    /// Rejects a zero amount (`Validation`); tag validity is already
    /// compile-time through the closed enum. Appends with a content
    /// tabcoin tag recompute the recipient content's score before
    /// returning, so a commit can never publish the ledger row without the
    /// matching score.
    pub fn create(
        &self,
        txn: &mut dyn StorageTransaction,
        params: BalanceParams,
    ) -> Result<BalanceOperation> {
        if params.amount == 0 {
            return Err(TabcoinError::validation("amount cannot be zero"));
        }

        let operation = self.ledger.append(
            txn,
            NewBalanceOperation {
                balance_type: params.balance_type,
                recipient_id: params.recipient_id,
                amount: params.amount,
                originator: params.originator,
            },
        )?;

        if operation.balance_type.is_content_tabcoin() {
            self.scores
                .recompute(txn, operation.recipient_id.as_content_id())?;
        }

        Ok(operation)
    }

    /// Committed balance of one recipient for one tag.
    pub fn find_by_recipient_id(
        &self,
        recipient_id: RecipientId,
        balance_type: BalanceType,
    ) -> Result<i64> {
        self.ledger
            .sum_by_recipient_and_type(self.datastore.as_read(), recipient_id, balance_type)
    }

    /// Committed total over a content item's tabcoin group.
    pub fn content_tabcoins(&self, content_id: ContentId) -> Result<i64> {
        Ok(self.content_tabcoin_sums(content_id)?.total)
    }

    /// Committed sign-partitioned sums over a content item's tabcoin group.
    pub fn content_tabcoin_sums(&self, content_id: ContentId) -> Result<ContentTabcoinSums> {
        self.ledger
            .content_tabcoin_sums(self.datastore.as_read(), content_id)
    }

    /// Reverse one operation by appending a compensating row with the
    /// negated amount and the `undo` originator.
    ///
    /// Repeat-safe: if a compensating row for this operation already
    /// exists, it is returned unchanged instead of reversing twice. The
    /// original row is never touched.
    pub fn undo(
        &self,
        txn: &mut dyn StorageTransaction,
        operation_id: OperationId,
    ) -> Result<BalanceOperation> {
        let original = self
            .ledger
            .find_by_id(txn.as_read(), operation_id)?
            .ok_or_else(|| {
                TabcoinError::not_found(format!("balance operation {} not found", operation_id))
            })?;

        let attributed = self
            .ledger
            .list_by_originator(txn.as_read(), operation_id.as_i64())?;
        if let Some(compensating) = attributed
            .into_iter()
            .find(|op| matches!(op.originator, Originator::Undo(id) if id == operation_id))
        {
            warn!(
                "operation {} was already undone by {}; returning the existing row",
                operation_id, compensating.id
            );
            return Ok(compensating);
        }

        self.create(
            txn,
            BalanceParams {
                balance_type: original.balance_type,
                recipient_id: original.recipient_id,
                amount: -original.amount,
                originator: Originator::Undo(original.id),
            },
        )
    }
}
