//! Shared fixtures for tabcoin-core tests.
//!
//! Used by the unit tests in `src/**` and the integration tests under
//! `tests/`. Everything here unwraps; a broken fixture should abort the
//! test right away.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tabcoin_commons::config::EngineConfig;
use tabcoin_commons::ids::{ContentId, RecipientId, UserId};
use tabcoin_commons::models::{
    BalanceOperation, BalanceType, Content, ContentStatus, EventType, Originator, User,
};
use tabcoin_store::{IsolationLevel, MemoryDatastore};

use crate::context::EngineContext;
use crate::services::BalanceParams;
use crate::stores::{NewContent, NewEvent, NewUser};

/// A fresh engine over an in-memory datastore with default configuration.
pub fn test_engine() -> EngineContext {
    EngineContext::new(Arc::new(MemoryDatastore::new()), EngineConfig::default())
        .expect("test engine")
}

/// Create and commit a user.
pub fn create_test_user(ctx: &EngineContext, username: &str) -> User {
    let mut txn = ctx.begin(IsolationLevel::ReadCommitted).unwrap();
    let user = ctx
        .users()
        .create(
            &mut *txn,
            NewUser {
                username: username.to_string(),
            },
        )
        .unwrap();
    txn.commit().unwrap();
    user
}

/// Move a user's reward stamp, e.g. into yesterday so an attempt runs.
pub fn set_rewarded_at(ctx: &EngineContext, user_id: UserId, rewarded_at: DateTime<Utc>) {
    let mut txn = ctx.begin(IsolationLevel::ReadCommitted).unwrap();
    ctx.users()
        .update_rewarded_at(&mut *txn, user_id, rewarded_at)
        .unwrap();
    txn.commit().unwrap();
}

/// Publish content, optionally backdated via `published_at`.
pub fn publish_test_content(
    ctx: &EngineContext,
    owner_id: UserId,
    parent_id: Option<ContentId>,
    slug: &str,
    published_at: DateTime<Utc>,
) -> Content {
    let mut txn = ctx.begin(IsolationLevel::ReadCommitted).unwrap();
    let content = ctx
        .contents()
        .create(
            &mut *txn,
            NewContent {
                owner_id,
                parent_id,
                slug: slug.to_string(),
                status: ContentStatus::Published,
                published_at: Some(published_at),
            },
        )
        .unwrap();
    txn.commit().unwrap();
    content
}

/// Append one coin operation through the balance service, originated by a
/// freshly recorded vote event, and commit.
pub fn apply_test_coins(
    ctx: &EngineContext,
    balance_type: BalanceType,
    recipient_id: RecipientId,
    amount: i64,
) -> BalanceOperation {
    let mut txn = ctx.begin(IsolationLevel::ReadCommitted).unwrap();
    let event = ctx
        .events()
        .create(
            &mut *txn,
            NewEvent {
                event_type: EventType::UpdateContentTabcoins,
                originator_user_id: None,
                originator_ip: None,
                metadata: serde_json::json!({ "amount": amount }),
            },
        )
        .unwrap();
    let operation = ctx
        .balance()
        .create(
            &mut *txn,
            BalanceParams {
                balance_type,
                recipient_id,
                amount,
                originator: Originator::Event(event.id),
            },
        )
        .unwrap();
    txn.commit().unwrap();
    operation
}
