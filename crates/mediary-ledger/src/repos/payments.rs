//! Escrow payment repository - the state machine
//!
//! Statuses move forward through a fixed table; every transition writes the
//! new status and its paired audit action in one SQLite transaction. Once a
//! mutation has begun, any failure is surfaced as `WriteFailure`: the
//! caller must not assume either outcome.

use chrono::{DateTime, Utc};
use mediary_types::{
    ActionerRole, Currency, EscrowActionKind, EscrowStatus, PartyId, PaymentId, WalletBeneficiary,
};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{ActionRow, EscrowAction, EscrowPayment, EscrowWallet, PaymentRow, WalletRow};

const PAYMENT_COLUMNS: &str =
    "id, currency, sender, receiver, status, amount, started_at, reason, last_action_at";

/// What a transition does to the escrow wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalletEffect {
    /// Leave the wallet alone
    Keep,
    /// Drop the wallet row (abort before funds settle)
    Delete,
    /// Point the wallet at the party now entitled to withdraw
    ReleaseTo(WalletBeneficiary),
}

/// The transition table: (status, action, role) -> (next status, wallet effect).
///
/// Returns `None` for every combination the lifecycle does not permit,
/// including a permitted action attempted by the wrong role.
fn transition_target(
    status: EscrowStatus,
    action: EscrowActionKind,
    role: ActionerRole,
) -> Option<(EscrowStatus, WalletEffect)> {
    use ActionerRole::{Moderator, Recipient, Sender};
    use EscrowActionKind::{Aborted, Cancelled, Released};
    use EscrowStatus::{Failed, FundsHeld, Pending, Received};

    match (status, action, role) {
        (Pending, Aborted, Sender | Moderator) => Some((Failed, WalletEffect::Delete)),
        (Pending, Cancelled, Moderator) => Some((Failed, WalletEffect::Keep)),
        (Received, Released, Sender | Moderator) => {
            Some((FundsHeld, WalletEffect::ReleaseTo(WalletBeneficiary::Receiver)))
        }
        (Received, Cancelled, Recipient | Moderator) => {
            Some((Failed, WalletEffect::ReleaseTo(WalletBeneficiary::Sender)))
        }
        _ => None,
    }
}

/// Escrow payment state machine and queries.
pub struct PaymentRepo {
    pool: SqlitePool,
}

impl PaymentRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fetch a payment by id.
    pub async fn get(&self, payment_id: PaymentId) -> LedgerResult<Option<EscrowPayment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM escrow_payments WHERE id = ?"
        ))
        .bind(payment_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EscrowPayment::try_from).transpose()
    }

    /// The single non-terminal payment for the ordered pair, if any.
    pub async fn active_between(
        &self,
        sender: PartyId,
        receiver: PartyId,
    ) -> LedgerResult<Option<EscrowPayment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM escrow_payments
            WHERE sender = ? AND receiver = ?
              AND status != 'complete' AND status != 'failed'
            LIMIT 1
            "#
        ))
        .bind(sender.0)
        .bind(receiver.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EscrowPayment::try_from).transpose()
    }

    /// The most recent payment whose funds are still owed to `withdrawer`.
    ///
    /// With `check_failed` the search covers cancelled-after-deposit
    /// payments refunded to the sender; otherwise released payments held
    /// for the receiver.
    pub async fn withdrawable(
        &self,
        withdrawer: PartyId,
        counterparty: PartyId,
        check_failed: bool,
    ) -> LedgerResult<Option<EscrowPayment>> {
        let (status, beneficiary, sender, receiver) = if check_failed {
            ("failed", "sender", withdrawer, counterparty)
        } else {
            ("held", "receiver", counterparty, withdrawer)
        };

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT p.id, p.currency, p.sender, p.receiver, p.status, p.amount,
                   p.started_at, p.reason, p.last_action_at
            FROM escrow_payments p
            JOIN escrow_wallets w ON w.payment_id = p.id
            WHERE p.status = ? AND w.is_available = 1 AND w.available_to = ?
              AND p.sender = ? AND p.receiver = ?
            ORDER BY p.last_action_at DESC
            LIMIT 1
            "#
        ))
        .bind(status)
        .bind(beneficiary)
        .bind(sender.0)
        .bind(receiver.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EscrowPayment::try_from).transpose()
    }

    /// The wallet row for a payment, present once funds exist.
    pub async fn wallet(&self, payment_id: PaymentId) -> LedgerResult<Option<EscrowWallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            r#"
            SELECT payment_id, available_to, is_available, wallet_address,
                   received_at, withdrawn_at
            FROM escrow_wallets WHERE payment_id = ?
            "#,
        )
        .bind(payment_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EscrowWallet::try_from).transpose()
    }

    /// Full audit history for a payment, oldest first.
    pub async fn actions_for(&self, payment_id: PaymentId) -> LedgerResult<Vec<EscrowAction>> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r#"
            SELECT id, payment_id, action, actioner, actioner_id, action_at, message
            FROM escrow_actions
            WHERE payment_id = ?
            ORDER BY action_at, id
            "#,
        )
        .bind(payment_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EscrowAction::try_from).collect()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Open a new Pending payment for the ordered pair.
    ///
    /// The amount must already be precision-normalized. Fails with
    /// `ActivePaymentExists` when a non-terminal payment exists for the
    /// pair; the partial unique index backstops the pre-check, so two
    /// concurrent identical requests cannot both succeed.
    pub async fn create(
        &self,
        currency: Currency,
        sender: PartyId,
        receiver: PartyId,
        amount: Decimal,
        reason: Option<&str>,
    ) -> LedgerResult<PaymentId> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: amount.to_string(),
            });
        }

        for party in [sender, receiver] {
            let locked: Option<bool> =
                sqlx::query_scalar("SELECT locked FROM users WHERE id = ?")
                    .bind(party.0)
                    .fetch_optional(&self.pool)
                    .await?;

            if locked == Some(true) {
                return Err(LedgerError::PartyLocked { party });
            }
        }

        if self.active_between(sender, receiver).await?.is_some() {
            return Err(LedgerError::ActivePaymentExists { sender, receiver });
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO escrow_payments (currency, sender, receiver, status, amount, started_at, reason)
            VALUES (?, ?, ?, 'pending', ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(currency.code())
        .bind(sender.0)
        .bind(receiver.0)
        .bind(amount.to_string())
        .bind(Utc::now())
        .bind(reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err)
                if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                LedgerError::ActivePaymentExists { sender, receiver }
            }
            _ => LedgerError::Query(e),
        })?;

        debug!(payment_id = id, %sender, %receiver, %amount, %currency, "escrow payment created");

        Ok(PaymentId(id))
    }

    /// Record the payment processor's deposit confirmation:
    /// Pending -> Received, wallet row inserted, one transaction.
    pub async fn confirm_deposit(
        &self,
        payment_id: PaymentId,
        wallet_address: &str,
    ) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await?;

        let status = current_status(&mut tx, payment_id).await?;

        if status != EscrowStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                status,
                attempted: "confirm a deposit for".to_string(),
            });
        }

        let now = Utc::now();

        sqlx::query("UPDATE escrow_payments SET status = 'paid', last_action_at = ? WHERE id = ?")
            .bind(now)
            .bind(payment_id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_failure(payment_id, "deposit status update", e))?;

        sqlx::query(
            r#"
            INSERT INTO escrow_wallets (payment_id, available_to, is_available, wallet_address, received_at)
            VALUES (?, 'nobody', 0, ?, ?)
            "#,
        )
        .bind(payment_id.0)
        .bind(wallet_address)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_failure(payment_id, "wallet insert", e))?;

        tx.commit()
            .await
            .map_err(|e| write_failure(payment_id, "deposit commit", e))?;

        debug!(payment_id = payment_id.0, "deposit confirmed");

        Ok(())
    }

    /// Apply an audited transition to a payment.
    ///
    /// `snapshot` is the payment as the caller last read it; if the stored
    /// `last_action_at` has moved since, the call fails with `StaleRead`
    /// and nothing is written. On success the status update, the audit
    /// action, and the wallet effect all land in one transaction.
    pub async fn transition(
        &self,
        snapshot: &EscrowPayment,
        action: EscrowActionKind,
        role: ActionerRole,
        actioner: PartyId,
        message: Option<&str>,
    ) -> LedgerResult<EscrowStatus> {
        let (next, effect) = transition_target(snapshot.status, action, role).ok_or(
            LedgerError::InvalidTransition {
                status: snapshot.status,
                attempted: format!("apply '{action}' as {role} to"),
            },
        )?;

        let payment_id = snapshot.id;
        let mut tx = self.pool.begin().await?;

        // Optimistic check: the row must still look like the snapshot.
        let (status, last_action_at) = current_row(&mut tx, payment_id).await?;

        if last_action_at != snapshot.last_action_at || status != snapshot.status {
            return Err(LedgerError::StaleRead { payment_id });
        }

        let now = Utc::now();

        sqlx::query("UPDATE escrow_payments SET status = ?, last_action_at = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(now)
            .bind(payment_id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_failure(payment_id, "status update", e))?;

        sqlx::query(
            r#"
            INSERT INTO escrow_actions (payment_id, action, actioner, actioner_id, action_at, message)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment_id.0)
        .bind(action.as_str())
        .bind(role.as_str())
        .bind(actioner.0)
        .bind(now)
        .bind(message)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_failure(payment_id, "audit insert", e))?;

        match effect {
            WalletEffect::Keep => {}
            WalletEffect::Delete => {
                sqlx::query("DELETE FROM escrow_wallets WHERE payment_id = ?")
                    .bind(payment_id.0)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| write_failure(payment_id, "wallet delete", e))?;
            }
            WalletEffect::ReleaseTo(beneficiary) => {
                let result = sqlx::query(
                    "UPDATE escrow_wallets SET available_to = ?, is_available = 1 WHERE payment_id = ?",
                )
                .bind(beneficiary.as_str())
                .bind(payment_id.0)
                .execute(&mut *tx)
                .await
                .map_err(|e| write_failure(payment_id, "wallet release", e))?;

                if result.rows_affected() == 0 {
                    error!(
                        payment_id = payment_id.0,
                        "wallet row missing for a funded payment"
                    );
                    return Err(LedgerError::WriteFailure {
                        context: format!("payment {payment_id}: wallet row missing"),
                    });
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| write_failure(payment_id, "transition commit", e))?;

        debug!(
            payment_id = payment_id.0,
            from = %snapshot.status,
            to = %next,
            %action,
            %role,
            "escrow payment transitioned"
        );

        Ok(next)
    }

    /// Clear the wallet after the entitled party withdrew: wallet to
    /// nobody/unavailable with `withdrawn_at` set. A held payment
    /// completes; a failed one stays failed with its refund recorded.
    pub async fn mark_withdrawn(&self, payment_id: PaymentId) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await?;

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE escrow_wallets
            SET available_to = 'nobody', is_available = 0, withdrawn_at = ?
            WHERE payment_id = ? AND is_available = 1 AND withdrawn_at IS NULL
            "#,
        )
        .bind(now)
        .bind(payment_id.0)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT payment_id FROM escrow_wallets WHERE payment_id = ?")
                    .bind(payment_id.0)
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match exists {
                Some(_) => LedgerError::AlreadyWithdrawn { payment_id },
                None => LedgerError::NotFound {
                    what: format!("wallet for {payment_id}"),
                },
            });
        }

        sqlx::query(
            r#"
            UPDATE escrow_payments
            SET status = CASE WHEN status = 'held' THEN 'complete' ELSE status END,
                last_action_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(payment_id.0)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_failure(payment_id, "withdraw status update", e))?;

        tx.commit()
            .await
            .map_err(|e| write_failure(payment_id, "withdraw commit", e))?;

        debug!(payment_id = payment_id.0, "funds withdrawn");

        Ok(())
    }
}

async fn current_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    payment_id: PaymentId,
) -> LedgerResult<(EscrowStatus, Option<DateTime<Utc>>)> {
    let row: Option<(String, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT status, last_action_at FROM escrow_payments WHERE id = ?")
            .bind(payment_id.0)
            .fetch_optional(&mut **tx)
            .await?;

    let (raw_status, last_action_at) = row.ok_or(LedgerError::NotFound {
        what: format!("{payment_id}"),
    })?;

    let status = raw_status
        .parse::<EscrowStatus>()
        .map_err(|e| LedgerError::Corrupt {
            context: format!("{payment_id}: {e}"),
        })?;

    Ok((status, last_action_at))
}

async fn current_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    payment_id: PaymentId,
) -> LedgerResult<EscrowStatus> {
    Ok(current_row(tx, payment_id).await?.0)
}

fn write_failure(payment_id: PaymentId, context: &str, err: sqlx::Error) -> LedgerError {
    error!(
        payment_id = payment_id.0,
        context, %err,
        "ledger write failed mid-transaction; store state is ambiguous"
    );

    LedgerError::WriteFailure {
        context: format!("{payment_id}: {context}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table_permits() {
        use ActionerRole::*;
        use EscrowActionKind::*;
        use EscrowStatus::*;

        assert!(transition_target(Pending, Aborted, Sender).is_some());
        assert!(transition_target(Pending, Aborted, Moderator).is_some());
        assert!(transition_target(Pending, Cancelled, Moderator).is_some());
        assert!(transition_target(Received, Released, Sender).is_some());
        assert!(transition_target(Received, Released, Moderator).is_some());
        assert!(transition_target(Received, Cancelled, Recipient).is_some());
        assert!(transition_target(Received, Cancelled, Moderator).is_some());
    }

    #[test]
    fn test_transition_table_denies() {
        use ActionerRole::*;
        use EscrowActionKind::*;
        use EscrowStatus::*;

        // wrong role
        assert!(transition_target(Pending, Aborted, Recipient).is_none());
        assert!(transition_target(Pending, Cancelled, Sender).is_none());
        assert!(transition_target(Received, Released, Recipient).is_none());
        assert!(transition_target(Received, Cancelled, Sender).is_none());

        // wrong status
        assert!(transition_target(Received, Aborted, Sender).is_none());
        assert!(transition_target(Pending, Released, Sender).is_none());

        // terminal states admit nothing
        for action in [Released, Cancelled, Aborted] {
            for role in [Sender, Recipient, Moderator] {
                assert!(transition_target(Completed, action, role).is_none());
                assert!(transition_target(Failed, action, role).is_none());
                assert!(transition_target(FundsHeld, action, role).is_none());
            }
        }
    }

    #[test]
    fn test_release_favors_receiver_cancel_favors_sender() {
        let (next, effect) = transition_target(
            EscrowStatus::Received,
            EscrowActionKind::Released,
            ActionerRole::Sender,
        )
        .unwrap();
        assert_eq!(next, EscrowStatus::FundsHeld);
        assert_eq!(effect, WalletEffect::ReleaseTo(WalletBeneficiary::Receiver));

        let (next, effect) = transition_target(
            EscrowStatus::Received,
            EscrowActionKind::Cancelled,
            ActionerRole::Recipient,
        )
        .unwrap();
        assert_eq!(next, EscrowStatus::Failed);
        assert_eq!(effect, WalletEffect::ReleaseTo(WalletBeneficiary::Sender));
    }
}
