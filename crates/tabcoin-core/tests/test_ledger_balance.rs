use rust_decimal::Decimal;

use tabcoin_core::test_helpers::{
    apply_test_coins, create_test_user, publish_test_content, test_engine,
};
use tabcoin_core::{
    BalanceParams, BalanceType, IsolationLevel, Originator, RecipientId, TabcoinError,
};

#[test]
fn test_balance_is_the_sum_of_operations() {
    let ctx = test_engine();
    let user = create_test_user(&ctx, "alice");
    let recipient = RecipientId::from(user.id);

    apply_test_coins(&ctx, BalanceType::UserTabcoin, recipient, 5);
    apply_test_coins(&ctx, BalanceType::UserTabcoin, recipient, -2);
    apply_test_coins(&ctx, BalanceType::UserTabcoin, recipient, 10);

    let balance = ctx
        .balance()
        .find_by_recipient_id(recipient, BalanceType::UserTabcoin)
        .expect("balance");
    assert_eq!(balance, 13);

    // Other tags of the same recipient stay untouched.
    let tabcash = ctx
        .balance()
        .find_by_recipient_id(recipient, BalanceType::UserTabcash)
        .expect("tabcash");
    assert_eq!(tabcash, 0);
}

#[test]
fn test_zero_amount_is_rejected() {
    let ctx = test_engine();
    let user = create_test_user(&ctx, "alice");

    let mut txn = ctx.begin(IsolationLevel::ReadCommitted).unwrap();
    let err = ctx
        .balance()
        .create(
            &mut *txn,
            BalanceParams {
                balance_type: BalanceType::UserTabcoin,
                recipient_id: RecipientId::from(user.id),
                amount: 0,
                originator: Originator::User(user.id),
            },
        )
        .unwrap_err();
    assert!(matches!(err, TabcoinError::Validation(_)));
}

#[test]
fn test_undo_reverses_and_is_repeat_safe() {
    let ctx = test_engine();
    let user = create_test_user(&ctx, "alice");
    let recipient = RecipientId::from(user.id);

    let original = apply_test_coins(&ctx, BalanceType::UserTabcoin, recipient, 4);
    assert_eq!(
        ctx.balance()
            .find_by_recipient_id(recipient, BalanceType::UserTabcoin)
            .unwrap(),
        4
    );

    let mut txn = ctx.begin(IsolationLevel::ReadCommitted).unwrap();
    let compensation = ctx.balance().undo(&mut *txn, original.id).expect("undo");
    txn.commit().unwrap();

    assert_eq!(compensation.amount, -4);
    assert!(matches!(compensation.originator, Originator::Undo(id) if id == original.id));
    assert_eq!(
        ctx.balance()
            .find_by_recipient_id(recipient, BalanceType::UserTabcoin)
            .unwrap(),
        0
    );

    // A second undo finds the existing compensation instead of stacking
    // another one.
    let mut txn = ctx.begin(IsolationLevel::ReadCommitted).unwrap();
    let again = ctx.balance().undo(&mut *txn, original.id).expect("repeat undo");
    txn.commit().unwrap();
    assert_eq!(again.id, compensation.id);
    assert_eq!(
        ctx.balance()
            .find_by_recipient_id(recipient, BalanceType::UserTabcoin)
            .unwrap(),
        0
    );
}

#[test]
fn test_undo_of_unknown_operation() {
    let ctx = test_engine();
    let user = create_test_user(&ctx, "alice");
    let ghost = apply_test_coins(&ctx, BalanceType::UserTabcoin, RecipientId::from(user.id), 1);

    let mut txn = ctx.begin(IsolationLevel::ReadCommitted).unwrap();
    let err = ctx
        .balance()
        .undo(&mut *txn, tabcoin_core::OperationId::new(ghost.id.as_i64() + 999))
        .unwrap_err();
    assert!(matches!(err, TabcoinError::NotFound(_)));
}

#[test]
fn test_content_appends_recompute_the_score() {
    let ctx = test_engine();
    let user = create_test_user(&ctx, "alice");
    let content = publish_test_content(&ctx, user.id, None, "post", chrono::Utc::now());
    let recipient = RecipientId::from(content.id);

    apply_test_coins(&ctx, BalanceType::ContentTabcoinInitial, recipient, 2);
    apply_test_coins(&ctx, BalanceType::ContentTabcoinCredit, recipient, 8);
    apply_test_coins(&ctx, BalanceType::ContentTabcoinDebit, recipient, -3);

    let sums = ctx.balance().content_tabcoin_sums(content.id).expect("sums");
    assert_eq!(sums.initial, 2);
    assert_eq!(sums.positive, 10);
    assert_eq!(sums.negative, -3);
    assert_eq!(sums.total, 7);
    assert_eq!(ctx.balance().content_tabcoins(content.id).unwrap(), 7);

    // Each append also refreshed the stored score; for (10, -3) that is
    // (10 + 0.9208) / (13 + 2.8416) truncated to three decimals.
    let stored = ctx
        .contents()
        .find_by_id(ctx.datastore().as_read(), content.id)
        .unwrap()
        .expect("content");
    assert_eq!(stored.score, Decimal::new(689, 3));
}

#[test]
fn test_operations_are_auditable_by_originator() {
    let ctx = test_engine();
    let user = create_test_user(&ctx, "alice");
    let recipient = RecipientId::from(user.id);

    let first = apply_test_coins(&ctx, BalanceType::UserTabcoin, recipient, 3);
    let second = apply_test_coins(&ctx, BalanceType::UserTabcash, recipient, 7);

    // Each helper call records its own vote event, so each operation has
    // a distinct originator.
    let trail = ctx
        .ledger()
        .list_by_originator(ctx.datastore().as_read(), first.originator.id())
        .expect("trail");
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].id, first.id);
    assert_eq!(trail[0].amount, 3);

    let trail = ctx
        .ledger()
        .list_by_originator(ctx.datastore().as_read(), second.originator.id())
        .expect("trail");
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].id, second.id);
}
