//! End-to-end lifecycle tests against an in-memory ledger.

use mediary_ledger::{Ledger, LedgerError};
use mediary_types::{
    ActionerRole, Currency, EscrowActionKind, EscrowStatus, PartyId, WalletBeneficiary,
};
use rust_decimal_macros::dec;

const ALICE: PartyId = PartyId(101);
const BOB: PartyId = PartyId(202);
const MOD: PartyId = PartyId(999);

async fn ledger() -> Ledger {
    Ledger::in_memory().await.expect("in-memory ledger")
}

#[tokio::test]
async fn test_release_lifecycle() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(0.5), Some("rent"))
        .await
        .unwrap();

    let payment = payments.get(id).await.unwrap().unwrap();
    assert_eq!(payment.status, EscrowStatus::Pending);
    assert_eq!(payment.amount, dec!(0.5));
    assert_eq!(payment.reason.as_deref(), Some("rent"));
    assert!(payment.last_action_at.is_none());
    assert!(payments.wallet(id).await.unwrap().is_none());

    payments.confirm_deposit(id, "escrow-addr-1").await.unwrap();

    let payment = payments.get(id).await.unwrap().unwrap();
    assert_eq!(payment.status, EscrowStatus::Received);
    assert!(payment.last_action_at.is_some());

    let wallet = payments.wallet(id).await.unwrap().unwrap();
    assert_eq!(wallet.available_to, WalletBeneficiary::Nobody);
    assert!(!wallet.is_available);
    assert_eq!(wallet.wallet_address, "escrow-addr-1");

    let next = payments
        .transition(
            &payment,
            EscrowActionKind::Released,
            ActionerRole::Sender,
            ALICE,
            None,
        )
        .await
        .unwrap();
    assert_eq!(next, EscrowStatus::FundsHeld);

    let wallet = payments.wallet(id).await.unwrap().unwrap();
    assert_eq!(wallet.available_to, WalletBeneficiary::Receiver);
    assert!(wallet.is_available);

    // funds are now owed to Bob
    let found = payments.withdrawable(BOB, ALICE, false).await.unwrap();
    assert_eq!(found.unwrap().id, id);
    assert!(payments.withdrawable(ALICE, BOB, true).await.unwrap().is_none());

    payments.mark_withdrawn(id).await.unwrap();

    let payment = payments.get(id).await.unwrap().unwrap();
    assert_eq!(payment.status, EscrowStatus::Completed);

    let wallet = payments.wallet(id).await.unwrap().unwrap();
    assert_eq!(wallet.available_to, WalletBeneficiary::Nobody);
    assert!(!wallet.is_available);
    assert!(wallet.withdrawn_at.is_some());

    // the pair is free again
    assert!(payments.active_between(ALICE, BOB).await.unwrap().is_none());
}

#[tokio::test]
async fn test_refund_lifecycle() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::Litecoin, ALICE, BOB, dec!(2), None)
        .await
        .unwrap();
    payments.confirm_deposit(id, "escrow-addr-2").await.unwrap();

    let payment = payments.get(id).await.unwrap().unwrap();
    let next = payments
        .transition(
            &payment,
            EscrowActionKind::Cancelled,
            ActionerRole::Recipient,
            BOB,
            Some("changed my mind"),
        )
        .await
        .unwrap();
    assert_eq!(next, EscrowStatus::Failed);

    // refund goes back to the sender
    let wallet = payments.wallet(id).await.unwrap().unwrap();
    assert_eq!(wallet.available_to, WalletBeneficiary::Sender);
    assert!(wallet.is_available);

    let found = payments.withdrawable(ALICE, BOB, true).await.unwrap();
    assert_eq!(found.unwrap().id, id);

    payments.mark_withdrawn(id).await.unwrap();

    // a refunded payment stays failed
    let payment = payments.get(id).await.unwrap().unwrap();
    assert_eq!(payment.status, EscrowStatus::Failed);
    let wallet = payments.wallet(id).await.unwrap().unwrap();
    assert!(wallet.withdrawn_at.is_some());
}

#[tokio::test]
async fn test_abort_pending_deletes_wallet_state() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap();

    let payment = payments.get(id).await.unwrap().unwrap();
    let next = payments
        .transition(
            &payment,
            EscrowActionKind::Aborted,
            ActionerRole::Sender,
            ALICE,
            None,
        )
        .await
        .unwrap();
    assert_eq!(next, EscrowStatus::Failed);
    assert!(payments.wallet(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_moderator_can_cancel_pending() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::TnbCoin, ALICE, BOB, dec!(10), None)
        .await
        .unwrap();

    let payment = payments.get(id).await.unwrap().unwrap();
    let next = payments
        .transition(
            &payment,
            EscrowActionKind::Cancelled,
            ActionerRole::Moderator,
            MOD,
            Some("dispute"),
        )
        .await
        .unwrap();
    assert_eq!(next, EscrowStatus::Failed);
}

#[tokio::test]
async fn test_invalid_transitions_are_rejected() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap();
    let pending = payments.get(id).await.unwrap().unwrap();

    // release before the deposit arrived
    let err = payments
        .transition(
            &pending,
            EscrowActionKind::Released,
            ActionerRole::Sender,
            ALICE,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));

    // the receiver cannot abort
    let err = payments
        .transition(
            &pending,
            EscrowActionKind::Aborted,
            ActionerRole::Recipient,
            BOB,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));

    // nothing was written
    let payment = payments.get(id).await.unwrap().unwrap();
    assert_eq!(payment.status, EscrowStatus::Pending);
    assert!(payments.actions_for(id).await.unwrap().is_empty());

    // deposits only land on pending payments
    payments.confirm_deposit(id, "addr").await.unwrap();
    let err = payments.confirm_deposit(id, "addr").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_one_active_payment_per_pair() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let first = payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap();

    let err = payments
        .create(Currency::Litecoin, ALICE, BOB, dec!(3), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ActivePaymentExists { .. }));

    // the reverse direction is a different pair
    payments
        .create(Currency::Bitcoin, BOB, ALICE, dec!(1), None)
        .await
        .unwrap();

    // once the first hits a terminal status the pair frees up
    let pending = payments.get(first).await.unwrap().unwrap();
    payments
        .transition(
            &pending,
            EscrowActionKind::Aborted,
            ActionerRole::Sender,
            ALICE,
            None,
        )
        .await
        .unwrap();

    payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(2), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_creates_admit_exactly_one() {
    let ledger = ledger().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .payments()
                .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
                .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(LedgerError::ActivePaymentExists { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn test_stale_snapshot_is_rejected() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap();
    payments.confirm_deposit(id, "addr").await.unwrap();

    let snapshot = payments.get(id).await.unwrap().unwrap();

    // someone else acts on a fresh read first
    payments
        .transition(
            &snapshot,
            EscrowActionKind::Released,
            ActionerRole::Sender,
            ALICE,
            None,
        )
        .await
        .unwrap();

    // replaying against the old snapshot must fail without writing
    let stale = payments.get(id).await.unwrap().unwrap();
    let err = payments
        .transition(
            &snapshot,
            EscrowActionKind::Cancelled,
            ActionerRole::Moderator,
            MOD,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::StaleRead { .. }));

    let after = payments.get(id).await.unwrap().unwrap();
    assert_eq!(after, stale);
    assert_eq!(payments.actions_for(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_double_withdraw_is_rejected() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap();
    payments.confirm_deposit(id, "addr").await.unwrap();

    let payment = payments.get(id).await.unwrap().unwrap();
    payments
        .transition(
            &payment,
            EscrowActionKind::Released,
            ActionerRole::Sender,
            ALICE,
            None,
        )
        .await
        .unwrap();

    payments.mark_withdrawn(id).await.unwrap();
    let err = payments.mark_withdrawn(id).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyWithdrawn { .. }));
}

#[tokio::test]
async fn test_withdraw_without_wallet_is_not_found() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap();

    let err = payments.mark_withdrawn(id).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
async fn test_audit_trail_pairs_every_transition() {
    let ledger = ledger().await;
    let payments = ledger.payments();

    let id = payments
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap();
    payments.confirm_deposit(id, "addr").await.unwrap();

    let payment = payments.get(id).await.unwrap().unwrap();
    payments
        .transition(
            &payment,
            EscrowActionKind::Cancelled,
            ActionerRole::Moderator,
            MOD,
            Some("dispute resolved for sender"),
        )
        .await
        .unwrap();

    let actions = payments.actions_for(id).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, EscrowActionKind::Cancelled);
    assert_eq!(actions[0].actioner, ActionerRole::Moderator);
    assert_eq!(actions[0].actioner_id, MOD);
    assert_eq!(
        actions[0].message.as_deref(),
        Some("dispute resolved for sender")
    );

    let after = payments.get(id).await.unwrap().unwrap();
    assert_eq!(after.last_action_at, Some(actions[0].action_at));
}

#[tokio::test]
async fn test_locked_party_cannot_open_payments() {
    let ledger = ledger().await;

    ledger.users().ensure(ALICE).await.unwrap();
    assert!(ledger.users().lock(ALICE).await.unwrap());

    let err = ledger
        .payments()
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PartyLocked { party } if party == ALICE));

    // either side being locked blocks the pair
    let err = ledger
        .payments()
        .create(Currency::Bitcoin, BOB, ALICE, dec!(1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PartyLocked { party } if party == ALICE));

    assert!(ledger.users().unlock(ALICE).await.unwrap());
    ledger
        .payments()
        .create(Currency::Bitcoin, ALICE, BOB, dec!(1), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_positive_amounts_are_rejected() {
    let ledger = ledger().await;

    for amount in [dec!(0), dec!(-0.25)] {
        let err = ledger
            .payments()
            .create(Currency::Bitcoin, ALICE, BOB, amount, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }
}

#[tokio::test]
async fn test_normalize_amount_uses_registry_precision() {
    let ledger = ledger().await;

    // BTC carries 8 decimal places, half-up
    let clipped = ledger
        .normalize_amount(Currency::Bitcoin, dec!(0.123456789), false)
        .await
        .unwrap();
    assert_eq!(clipped, dec!(0.12345679));

    let err = ledger
        .normalize_amount(Currency::Bitcoin, dec!(0.123456789), true)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PrecisionLoss { .. }));

    // TNBC carries 4
    let clipped = ledger
        .normalize_amount(Currency::TnbCoin, dec!(1.00005), false)
        .await
        .unwrap();
    assert_eq!(clipped, dec!(1.0001));
}

#[tokio::test]
async fn test_saved_addresses_are_unique_per_currency() {
    let ledger = ledger().await;
    let addresses = ledger.addresses();

    addresses
        .save(ALICE, Currency::Bitcoin, "bc1-alice", false)
        .await
        .unwrap();

    let err = addresses
        .save(ALICE, Currency::Bitcoin, "bc1-other", false)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AddressExists { .. }));

    // a different currency is fine
    addresses
        .save(ALICE, Currency::Litecoin, "ltc-alice", true)
        .await
        .unwrap();

    let saved = addresses
        .for_currency(ALICE, Currency::Bitcoin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.address, "bc1-alice");
    assert!(!saved.is_public);

    assert!(addresses.set_visibility(ALICE, "bc1-alice", true).await.unwrap());
    assert!(addresses.delete(ALICE, "bc1-alice").await.unwrap());
    assert!(addresses
        .for_currency(ALICE, Currency::Bitcoin)
        .await
        .unwrap()
        .is_none());

    assert_eq!(addresses.all_for(ALICE).await.unwrap().len(), 1);
}
