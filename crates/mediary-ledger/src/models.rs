//! Ledger models - domain types plus their SQLite row mappings
//!
//! Row structs mirror the stored columns exactly; conversion into domain
//! types is where status strings and decimal text are validated. A row
//! that fails to convert is a `Corrupt` record, not a caller error.

use chrono::{DateTime, Utc};
use mediary_types::{
    ActionerRole, Currency, EscrowActionKind, EscrowStatus, PartyId, PaymentId, WalletBeneficiary,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::error::LedgerError;

// ============================================================================
// Domain models
// ============================================================================

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: PartyId,
    pub created_at: DateTime<Utc>,
    /// Moderation hook: a locked user may not open new transactions.
    pub locked: bool,
}

/// A currency registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    pub precision: u32,
}

/// A payout address a party chose to keep on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAddress {
    pub owner: PartyId,
    pub currency: Currency,
    pub address: String,
    pub is_public: bool,
}

/// A tracked transfer intent between two parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowPayment {
    pub id: PaymentId,
    pub currency: Currency,
    pub sender: PartyId,
    pub receiver: PartyId,
    pub status: EscrowStatus,
    pub amount: Decimal,
    pub started_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub last_action_at: Option<DateTime<Utc>>,
}

impl EscrowPayment {
    /// Non-terminal payments block new ones for the same pair.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Where deposited funds sit and who may withdraw them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowWallet {
    pub payment_id: PaymentId,
    pub available_to: WalletBeneficiary,
    pub is_available: bool,
    pub wallet_address: String,
    pub received_at: DateTime<Utc>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

/// One append-only audit record per status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAction {
    pub id: i64,
    pub payment_id: PaymentId,
    pub action: EscrowActionKind,
    pub actioner: ActionerRole,
    pub actioner_id: PartyId,
    pub action_at: DateTime<Utc>,
    pub message: Option<String>,
}

// ============================================================================
// Row mappings
// ============================================================================

fn corrupt(context: impl Into<String>) -> LedgerError {
    LedgerError::Corrupt {
        context: context.into(),
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub locked: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: PartyId(row.id),
            created_at: row.created_at,
            locked: row.locked,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CurrencyRow {
    pub code: String,
    pub precision: i64,
}

impl TryFrom<CurrencyRow> for CurrencyInfo {
    type Error = LedgerError;

    fn try_from(row: CurrencyRow) -> Result<Self, Self::Error> {
        let precision = u32::try_from(row.precision)
            .map_err(|_| corrupt(format!("currency {}: precision {}", row.code, row.precision)))?;

        Ok(Self {
            code: row.code,
            precision,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AddressRow {
    pub owner_id: i64,
    pub currency: String,
    pub address: String,
    pub is_public: bool,
}

impl TryFrom<AddressRow> for SavedAddress {
    type Error = LedgerError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        let currency = Currency::from_str(&row.currency)
            .map_err(|e| corrupt(format!("linked address: {e}")))?;

        Ok(Self {
            owner: PartyId(row.owner_id),
            currency,
            address: row.address,
            is_public: row.is_public,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PaymentRow {
    pub id: i64,
    pub currency: String,
    pub sender: i64,
    pub receiver: i64,
    pub status: String,
    pub amount: String,
    pub started_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub last_action_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for EscrowPayment {
    type Error = LedgerError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency = Currency::from_str(&row.currency)
            .map_err(|e| corrupt(format!("payment {}: {e}", row.id)))?;
        let status = EscrowStatus::from_str(&row.status)
            .map_err(|e| corrupt(format!("payment {}: {e}", row.id)))?;
        let amount = Decimal::from_str(&row.amount)
            .map_err(|_| corrupt(format!("payment {}: amount '{}'", row.id, row.amount)))?;

        Ok(Self {
            id: PaymentId(row.id),
            currency,
            sender: PartyId(row.sender),
            receiver: PartyId(row.receiver),
            status,
            amount,
            started_at: row.started_at,
            reason: row.reason,
            last_action_at: row.last_action_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct WalletRow {
    pub payment_id: i64,
    pub available_to: String,
    pub is_available: bool,
    pub wallet_address: String,
    pub received_at: DateTime<Utc>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

impl TryFrom<WalletRow> for EscrowWallet {
    type Error = LedgerError;

    fn try_from(row: WalletRow) -> Result<Self, Self::Error> {
        let available_to = WalletBeneficiary::from_str(&row.available_to)
            .map_err(|e| corrupt(format!("wallet {}: {e}", row.payment_id)))?;

        Ok(Self {
            payment_id: PaymentId(row.payment_id),
            available_to,
            is_available: row.is_available,
            wallet_address: row.wallet_address,
            received_at: row.received_at,
            withdrawn_at: row.withdrawn_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ActionRow {
    pub id: i64,
    pub payment_id: i64,
    pub action: String,
    pub actioner: String,
    pub actioner_id: i64,
    pub action_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl TryFrom<ActionRow> for EscrowAction {
    type Error = LedgerError;

    fn try_from(row: ActionRow) -> Result<Self, Self::Error> {
        let action = EscrowActionKind::from_str(&row.action)
            .map_err(|e| corrupt(format!("action {}: {e}", row.id)))?;
        let actioner = ActionerRole::from_str(&row.actioner)
            .map_err(|e| corrupt(format!("action {}: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            payment_id: PaymentId(row.payment_id),
            action,
            actioner,
            actioner_id: PartyId(row.actioner_id),
            action_at: row.action_at,
            message: row.message,
        })
    }
}
