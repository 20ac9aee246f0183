//! Daily coin reward.
//!
//! Once per UTC day a user can claim a reward sized from their prestige,
//! discounted by the coins they already hold and by how long ago they
//! last published. The claim runs under snapshot isolation against the
//! user row, so two concurrent attempts pay out at most once; the loser
//! simply reports a zero reward.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use log::{debug, info, warn};
use serde_json::json;

use tabcoin_commons::ids::{RecipientId, UserId};
use tabcoin_commons::models::{BalanceType, ContentKind, EventType, Originator};
use tabcoin_store::{Datastore, IsolationLevel, StorageTransaction};

use crate::error::{Result, TabcoinError};
use crate::services::{BalanceParams, BalanceService, PrestigeService};
use crate::stores::{ContentFilter, ContentStore, EventStore, ListStrategy, NewEvent, UserStore};

/// Held coins are discounted by `floor((total / 20)^2)`.
const TABCOIN_DIVISOR: i128 = 20;

/// Publication age is counted in whole weeks, rounded up.
const CONTENT_AGE_UNIT_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Midnight UTC of the day containing `at`.
fn utc_day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Ceiling division. `denominator` must be positive.
fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1) / denominator
}

/// `floor((total / 20)^2)` without going through floats. Non-positive
/// balances contribute nothing.
fn tabcoins_factor(total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let t = total as i128;
    i64::try_from(t * t / (TABCOIN_DIVISOR * TABCOIN_DIVISOR)).unwrap_or(i64::MAX)
}

pub struct RewardService {
    datastore: Arc<dyn Datastore>,
    users: Arc<UserStore>,
    contents: Arc<ContentStore>,
    events: Arc<EventStore>,
    balance: Arc<BalanceService>,
    prestige: Arc<PrestigeService>,
}

impl RewardService {
    pub fn new(
        datastore: Arc<dyn Datastore>,
        users: Arc<UserStore>,
        contents: Arc<ContentStore>,
        events: Arc<EventStore>,
        balance: Arc<BalanceService>,
        prestige: Arc<PrestigeService>,
    ) -> Self {
        Self {
            datastore,
            users,
            contents,
            events,
            balance,
            prestige,
        }
    }

    /// Attempt today's reward for `user_id`. Returns the amount credited,
    /// which is zero whenever the user already claimed today, is not
    /// eligible, or lost the claim to a concurrent attempt.
    ///
    /// A zero-amount attempt still stamps `rewarded_at`, so an ineligible
    /// user is not re-evaluated until the next UTC day.
    pub fn attempt(&self, user_id: UserId, client_ip: Option<IpAddr>) -> Result<i64> {
        let user = self
            .users
            .find_by_id(self.datastore.as_read(), user_id)?
            .ok_or_else(|| TabcoinError::not_found(format!("user {} not found", user_id)))?;

        if user.rewarded_since(utc_day_start(Utc::now())) {
            debug!("user {} already rewarded today", user_id);
            return Ok(0);
        }

        // Sized from committed state; the transaction below only guards
        // the once-per-day stamp, not the amount.
        let amount = self.evaluate_amount(user_id)?;

        let mut txn = self.datastore.begin(IsolationLevel::RepeatableRead)?;
        match self.claim(&mut *txn, user_id, amount, client_ip) {
            Ok(amount) => match txn.commit() {
                Ok(()) => {
                    if amount > 0 {
                        info!("rewarded user {} with {} tabcoins", user_id, amount);
                    }
                    Ok(amount)
                }
                Err(e) if e.is_serialization_failure() => {
                    warn!("reward for user {} lost to a concurrent claim", user_id);
                    Ok(0)
                }
                Err(e) => Err(e.into()),
            },
            Err(e) if e.is_benign_conflict() => {
                warn!("reward for user {} was already claimed today", user_id);
                txn.rollback()?;
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Issue the reward rows and stamp `rewarded_at`, all inside `txn`.
    ///
    /// The day boundary is re-derived here rather than passed in, so an
    /// attempt that started before midnight cannot stamp yesterday.
    fn claim(
        &self,
        txn: &mut dyn StorageTransaction,
        user_id: UserId,
        amount: i64,
        client_ip: Option<IpAddr>,
    ) -> Result<i64> {
        let user = self
            .users
            .find_by_id(txn.as_read(), user_id)?
            .ok_or_else(|| TabcoinError::not_found(format!("user {} not found", user_id)))?;

        let now = Utc::now();
        if user.rewarded_since(utc_day_start(now)) {
            return Err(TabcoinError::conflict(format!(
                "user {} was already rewarded today",
                user_id
            )));
        }

        if amount > 0 {
            let event = self.events.create(
                txn,
                NewEvent {
                    event_type: EventType::RewardUserTabcoins,
                    originator_user_id: Some(user_id),
                    originator_ip: client_ip,
                    metadata: json!({ "amount": amount, "reward_type": "daily" }),
                },
            )?;
            self.balance.create(
                txn,
                BalanceParams {
                    balance_type: BalanceType::UserTabcoin,
                    recipient_id: RecipientId::from(user_id),
                    amount,
                    originator: Originator::Event(event.id),
                },
            )?;
        }

        self.users.update_rewarded_at(txn, user_id, now)?;
        Ok(amount)
    }

    /// Size today's reward from committed state.
    ///
    /// `ceil((prestige - held_coins_factor) / publication_age_factor)`,
    /// floored at zero. Any negative prestige level, a missing publication
    /// history, or a brand-new latest publication zeroes the reward.
    fn evaluate_amount(&self, user_id: UserId) -> Result<i64> {
        let reader = self.datastore.as_read();

        let tabcoins = self
            .balance
            .find_by_recipient_id(RecipientId::from(user_id), BalanceType::UserTabcoin)?;
        let tabcoins_factor = tabcoins_factor(tabcoins);

        let root_prestige = self.prestige.get_by_user_id(user_id, ContentKind::Root)?;
        let child_prestige = self.prestige.get_by_user_id(user_id, ContentKind::Child)?;
        debug!(
            "reward factors for user {}: tabcoins {} (factor {}), prestige {}+{}",
            user_id, tabcoins, tabcoins_factor, root_prestige, child_prestige
        );
        if root_prestige < 0 || child_prestige < 0 {
            debug!("user {} has negative prestige, reward blocked", user_id);
            return Ok(0);
        }
        let prestige_factor = root_prestige + child_prestige;

        let latest = self.contents.find_with_strategy(
            reader,
            ListStrategy::New,
            ContentFilter::published_by(user_id),
            1,
        )?;
        let Some(published_at) = latest.first().and_then(|content| content.published_at) else {
            debug!("user {} has no published content, reward blocked", user_id);
            return Ok(0);
        };

        let age_ms = (Utc::now() - published_at).num_milliseconds().max(0);
        let content_age_factor = ceil_div(age_ms, CONTENT_AGE_UNIT_MS);
        if content_age_factor <= 0 {
            return Ok(0);
        }

        if prestige_factor <= tabcoins_factor {
            return Ok(0);
        }
        Ok(ceil_div(prestige_factor - tabcoins_factor, content_age_factor))
    }
}
