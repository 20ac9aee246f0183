//! Balance operation entity: one immutable ledger row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OperationId, RecipientId};
use crate::models::{BalanceType, Originator};

/// One append-only entry in the balance ledger.
///
/// A recipient's balance for a tag is exactly the sum of `amount` over its
/// rows; there is no cached running total anywhere. Rows are never updated
/// or deleted. Corrections are new compensating rows with the `undo`
/// originator.
///
/// ## Fields
/// - `id`: server-generated snowflake, unique across all entity kinds
/// - `sequence`: monotonically increasing insert counter; never reused,
///   never decremented; gaps appear when an inserting transaction rolls back
/// - `balance_type`: which ledger the entry belongs to
/// - `recipient_id`: the user or content whose balance this affects
/// - `amount`: signed; positive credits, negative debits; zero is rejected
///   upstream by the balance service
/// - `originator`: polymorphic cause, stored as the flat
///   `originator_type`/`originator_id` pair
/// - `created_at`: server-assigned insertion time (UTC), immutable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceOperation {
    pub id: OperationId,
    pub sequence: u64,
    pub balance_type: BalanceType,
    pub recipient_id: RecipientId,
    pub amount: i64,
    #[serde(flatten)]
    pub originator: Originator,
    pub created_at: DateTime<Utc>,
}

impl BalanceOperation {
    #[inline]
    pub fn is_credit(&self) -> bool {
        self.amount > 0
    }

    #[inline]
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}
