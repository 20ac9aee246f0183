//! Content score recomputation.
//!
//! The score is a smoothed credit ratio over a content item's tabcoin
//! ledger, cached on the content row for feed ordering. The ledger stays
//! the source of truth: the cached value is rewritten on every balance
//! change, inside the same transaction, so score and ledger never
//! observably diverge.

use std::sync::Arc;

use log::debug;
use rust_decimal::{Decimal, RoundingStrategy};

use tabcoin_commons::ids::ContentId;
use tabcoin_store::StorageTransaction;

use crate::error::Result;
use crate::stores::{ContentStore, LedgerStore};

/// Smoothing terms pull fresh content toward a neutral baseline until
/// enough votes accumulate. With no votes at all the score settles at
/// 0.9208 / 2.8416 = 0.324.
fn credit_smoothing() -> Decimal {
    Decimal::new(9208, 4)
}

fn total_smoothing() -> Decimal {
    Decimal::new(28416, 4)
}

pub struct ScoreService {
    ledger: Arc<LedgerStore>,
    contents: Arc<ContentStore>,
}

impl ScoreService {
    pub fn new(ledger: Arc<LedgerStore>, contents: Arc<ContentStore>) -> Self {
        Self { ledger, contents }
    }

    /// Recompute and persist the score of one content item from its
    /// ledger, reading through the caller's transaction so rows appended
    /// earlier in the same transaction are included.
    ///
    /// Fails with `NotFound` when the content row does not exist.
    pub fn recompute(&self, txn: &mut dyn StorageTransaction, content_id: ContentId) -> Result<Decimal> {
        let sums = self.ledger.content_tabcoin_sums(txn.as_read(), content_id)?;
        let score = score_from_sums(sums.positive, sums.negative);
        self.contents.update_score(txn, content_id, score)?;
        debug!(
            "recomputed score for content {}: {} (positive={} negative={})",
            content_id, score, sums.positive, sums.negative
        );
        Ok(score)
    }
}

/// The ranking formula over sign-partitioned ledger sums, truncated (not
/// rounded) to three decimal places. A failed division falls back to the
/// neutral 0.5.
pub(crate) fn score_from_sums(positive: i64, negative: i64) -> Decimal {
    let positive = Decimal::from(positive);
    let negative = Decimal::from(negative);

    let numerator = positive + credit_smoothing();
    let denominator = positive - negative + total_smoothing();

    match numerator.checked_div(denominator) {
        Some(ratio) => ratio.round_dp_with_strategy(3, RoundingStrategy::ToZero),
        None => Decimal::new(5, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabcoin_commons::ids::{EventId, IdGenerator, RecipientId, UserId};
    use tabcoin_commons::models::{BalanceType, ContentStatus, Originator};
    use tabcoin_store::{Datastore, IsolationLevel, MemoryDatastore};

    use crate::stores::{NewBalanceOperation, NewContent};

    #[test]
    fn test_score_with_no_votes() {
        assert_eq!(score_from_sums(0, 0), Decimal::new(324, 3));
    }

    #[test]
    fn test_score_with_mixed_votes() {
        // (10 + 0.9208) / (10 - (-3) + 2.8416) = 0.68937... -> 0.689
        assert_eq!(score_from_sums(10, -3), Decimal::new(689, 3));
    }

    #[test]
    fn test_score_single_upvote_is_exactly_half() {
        // The smoothing terms are tuned so 1.9208 / 3.8416 = 0.5 exactly.
        assert_eq!(score_from_sums(1, 0), Decimal::new(500, 3));
    }

    #[test]
    fn test_score_truncates_toward_zero() {
        // 5.9208 / 8.8416 = 0.66965...; rounding would give 0.670.
        assert_eq!(score_from_sums(5, -1), Decimal::new(669, 3));
    }

    #[test]
    fn test_score_heavily_downvoted() {
        let score = score_from_sums(0, -10);
        // 0.9208 / 12.8416 = 0.0717...
        assert_eq!(score, Decimal::new(71, 3));
    }

    fn setup() -> (Arc<MemoryDatastore>, Arc<LedgerStore>, Arc<ContentStore>, ScoreService) {
        let datastore = Arc::new(MemoryDatastore::new());
        crate::stores::init_partitions(datastore.as_ref()).unwrap();
        let ids = Arc::new(IdGenerator::new(0));
        let ledger = Arc::new(LedgerStore::new(datastore.clone(), ids.clone()));
        let contents = Arc::new(ContentStore::new(ids));
        let service = ScoreService::new(ledger.clone(), contents.clone());
        (datastore, ledger, contents, service)
    }

    #[test]
    fn test_recompute_reads_uncommitted_rows() {
        let (datastore, ledger, contents, service) = setup();

        let mut txn = datastore.begin(IsolationLevel::ReadCommitted).unwrap();
        let content = contents
            .create(
                &mut *txn,
                NewContent {
                    owner_id: UserId::new(1),
                    parent_id: None,
                    slug: "post".to_string(),
                    status: ContentStatus::Published,
                    published_at: None,
                },
            )
            .unwrap();
        for (balance_type, amount) in [
            (BalanceType::ContentTabcoinInitial, 2),
            (BalanceType::ContentTabcoinCredit, 8),
            (BalanceType::ContentTabcoinDebit, -3),
        ] {
            ledger
                .append(
                    &mut *txn,
                    NewBalanceOperation {
                        balance_type,
                        recipient_id: RecipientId::from(content.id),
                        amount,
                        originator: Originator::Event(EventId::new(1)),
                    },
                )
                .unwrap();
        }

        // Nothing committed yet; the recompute must still see the rows.
        let score = service.recompute(&mut *txn, content.id).unwrap();
        assert_eq!(score, Decimal::new(689, 3));
        txn.commit().unwrap();

        let stored = contents
            .find_by_id(datastore.as_read(), content.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.score, Decimal::new(689, 3));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (datastore, _ledger, contents, service) = setup();

        let mut txn = datastore.begin(IsolationLevel::ReadCommitted).unwrap();
        let content = contents
            .create(
                &mut *txn,
                NewContent {
                    owner_id: UserId::new(1),
                    parent_id: None,
                    slug: "post".to_string(),
                    status: ContentStatus::Published,
                    published_at: None,
                },
            )
            .unwrap();

        let first = service.recompute(&mut *txn, content.id).unwrap();
        let second = service.recompute(&mut *txn, content.id).unwrap();
        assert_eq!(first, Decimal::new(324, 3));
        assert_eq!(first, second);
    }

    #[test]
    fn test_recompute_missing_content() {
        let (datastore, _ledger, _contents, service) = setup();
        let mut txn = datastore.begin(IsolationLevel::ReadCommitted).unwrap();
        let err = service.recompute(&mut *txn, ContentId::new(404)).unwrap_err();
        assert!(matches!(err, crate::error::TabcoinError::NotFound(_)));
    }
}
