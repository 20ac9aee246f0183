//! User prestige and per-content coin totals.
//!
//! Prestige is a step function of the mean coin total over a trailing
//! window of the user's published content, scored separately for root
//! posts and comments. Recent content is deliberately excluded (it has
//! not had time to accumulate votes) and so are the newest few items
//! inside the window, so a burst of fresh posts cannot move the level.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use tabcoin_commons::config::PrestigeDefaults;
use tabcoin_commons::ids::{ContentId, UserId};
use tabcoin_commons::models::ContentKind;
use tabcoin_store::Datastore;

use crate::error::Result;
use crate::services::BalanceService;
use crate::stores::ContentStore;

/// One prestige evaluation window.
#[derive(Debug, Clone, Copy)]
pub struct PrestigeWindow {
    /// Content published within this much of "now" is too fresh to count.
    pub time_offset: Duration,
    /// Maximum number of items averaged.
    pub limit: usize,
    /// Most-recent eligible items skipped.
    pub offset: usize,
}

impl PrestigeWindow {
    pub fn from_defaults(defaults: &PrestigeDefaults) -> Self {
        Self {
            time_offset: Duration::days(defaults.time_offset_days),
            limit: defaults.limit,
            offset: defaults.offset,
        }
    }
}

/// Coin subtotals of one content item, in the shape the platform's
/// content endpoints serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTabcoins {
    /// The `content:tabcoin:initial` subtotal (the publisher's stake).
    pub initial_tabcoins: i64,
    /// Group total across initial, credits and debits.
    pub total_tabcoins: i64,
}

pub struct PrestigeService {
    datastore: Arc<dyn Datastore>,
    balance: Arc<BalanceService>,
    contents: Arc<ContentStore>,
    defaults: PrestigeDefaults,
}

impl PrestigeService {
    pub fn new(
        datastore: Arc<dyn Datastore>,
        balance: Arc<BalanceService>,
        contents: Arc<ContentStore>,
        defaults: PrestigeDefaults,
    ) -> Self {
        Self {
            datastore,
            balance,
            contents,
            defaults,
        }
    }

    /// Prestige level for one user and content kind under the configured
    /// default window.
    pub fn get_by_user_id(&self, user_id: UserId, kind: ContentKind) -> Result<i64> {
        self.get_by_user_id_with(user_id, kind, PrestigeWindow::from_defaults(&self.defaults))
    }

    /// Prestige level under an explicit window.
    ///
    /// Totals come from the live ledger through the balance service, not
    /// the cached content scores. A user with no eligible content sits at
    /// the baseline mean of 1.
    pub fn get_by_user_id_with(
        &self,
        user_id: UserId,
        kind: ContentKind,
        window: PrestigeWindow,
    ) -> Result<i64> {
        let cutoff = Utc::now() - window.time_offset;
        let items = self.contents.list_published_for_owner(
            self.datastore.as_read(),
            user_id,
            kind,
            cutoff,
            window.limit,
            window.offset,
        )?;

        let mean = if items.is_empty() {
            Decimal::ONE
        } else {
            let mut total = Decimal::ZERO;
            for content in &items {
                total += Decimal::from(self.balance.content_tabcoins(content.id)?);
            }
            total / Decimal::from(items.len() as i64)
        };

        Ok(level_for_mean(mean, kind))
    }

    /// Coin subtotals for one content item from the committed ledger.
    /// Unknown content simply has zero rows and sums to zero.
    pub fn get_by_content_id(&self, content_id: ContentId) -> Result<ContentTabcoins> {
        let sums = self.balance.content_tabcoin_sums(content_id)?;
        Ok(ContentTabcoins {
            initial_tabcoins: sums.initial,
            total_tabcoins: sums.total,
        })
    }
}

/// Step tables mapping a mean coin total to a prestige level. Bounds are
/// inclusive upper limits in tenths; comment kinds are held to a stricter
/// curve than root posts. Means above the top of a table keep growing
/// with the mean itself.
fn level_for_mean(mean: Decimal, kind: ContentKind) -> i64 {
    let table: &[(i64, i64)] = match kind {
        ContentKind::Root => &[
            (5, -1),
            (11, 0),
            (13, 1),
            (15, 2),
            (17, 3),
            (19, 4),
            (21, 5),
            (23, 6),
            (24, 7),
        ],
        ContentKind::Child => &[
            (4, -1),
            (10, 0),
            (12, 1),
            (14, 2),
            (15, 3),
            (16, 4),
            (18, 5),
            (19, 6),
            (20, 7),
        ],
    };

    for (tenths, level) in table {
        if mean <= Decimal::new(*tenths, 1) {
            return *level;
        }
    }

    match mean.ceil().to_i64() {
        Some(v) => v + 5,
        None => i64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(tenths: i64) -> Decimal {
        Decimal::new(tenths, 1)
    }

    #[test]
    fn test_root_level_boundaries() {
        let cases = [
            (dec(3), -1),
            (dec(5), -1),
            (dec(6), 0),
            (dec(11), 0),
            (dec(12), 1),
            (dec(13), 1),
            (dec(15), 2),
            (dec(17), 3),
            (dec(18), 4),
            (dec(19), 4),
            (dec(21), 5),
            (dec(23), 6),
            (dec(24), 7),
        ];
        for (mean, expected) in cases {
            assert_eq!(
                level_for_mean(mean, ContentKind::Root),
                expected,
                "root mean {}",
                mean
            );
        }
    }

    #[test]
    fn test_child_level_boundaries() {
        let cases = [
            (dec(4), -1),
            (dec(5), 0),
            (dec(10), 0),
            (dec(11), 1),
            (dec(14), 2),
            (dec(15), 3),
            (dec(16), 4),
            (dec(17), 5),
            (dec(18), 5),
            (dec(19), 6),
            (dec(20), 7),
        ];
        for (mean, expected) in cases {
            assert_eq!(
                level_for_mean(mean, ContentKind::Child),
                expected,
                "child mean {}",
                mean
            );
        }
    }

    #[test]
    fn test_levels_above_the_tables() {
        // Past the top, levels track ceil(mean) + 5.
        assert_eq!(level_for_mean(dec(25), ContentKind::Root), 8);
        assert_eq!(level_for_mean(Decimal::from(3), ContentKind::Root), 8);
        assert_eq!(level_for_mean(Decimal::new(31, 1), ContentKind::Root), 9);
        assert_eq!(level_for_mean(dec(21), ContentKind::Child), 8);
        assert_eq!(level_for_mean(Decimal::from(10), ContentKind::Child), 15);
    }

    #[test]
    fn test_levels_are_monotonic() {
        for kind in [ContentKind::Root, ContentKind::Child] {
            let mut last = i64::MIN;
            for tenths in 0..=60 {
                let level = level_for_mean(Decimal::new(tenths, 1), kind);
                assert!(
                    level >= last,
                    "{:?} level dropped at mean {}",
                    kind,
                    Decimal::new(tenths, 1)
                );
                last = level;
            }
        }
    }

    #[test]
    fn test_fractional_means_fall_between_steps() {
        assert_eq!(level_for_mean(Decimal::new(175, 2), ContentKind::Root), 4);
        assert_eq!(level_for_mean(Decimal::new(101, 2), ContentKind::Root), 0);
        assert_eq!(level_for_mean(Decimal::new(101, 2), ContentKind::Child), 1);
    }

    #[test]
    fn test_window_from_defaults() {
        let window = PrestigeWindow::from_defaults(&PrestigeDefaults::default());
        assert_eq!(window.time_offset, Duration::days(2));
        assert_eq!(window.limit, 20);
        assert_eq!(window.offset, 3);
    }

    #[test]
    fn test_serializes_in_camel_case() {
        let tabcoins = ContentTabcoins {
            initial_tabcoins: 1,
            total_tabcoins: 4,
        };
        let json = serde_json::to_value(tabcoins).unwrap();
        assert_eq!(json["initialTabcoins"], 1);
        assert_eq!(json["totalTabcoins"], 4);
    }
}
