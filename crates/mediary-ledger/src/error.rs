//! Ledger error types
//!
//! Grouped by how the caller should react: validation and invariant errors
//! are recoverable after a re-read; `WriteFailure` means the store may hold
//! a partial write and must never be retried blindly.

use mediary_types::{Currency, EscrowStatus, PartyId, PaymentId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Escrow ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    // ------------------------------------------------------------------
    // Validation (no state mutated)
    // ------------------------------------------------------------------
    /// The amount is not a representable monetary value
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: String },

    /// Strict-mode normalization would lose fractional digits
    #[error("Amount {amount} exceeds the {precision}-digit precision of the currency")]
    PrecisionLoss { amount: Decimal, precision: u32 },

    /// Currency code missing from the registry
    #[error("Unknown currency: {code}")]
    UnknownCurrency { code: String },

    // ------------------------------------------------------------------
    // Invariant (re-read current state before retrying)
    // ------------------------------------------------------------------
    /// The ordered pair already has a non-terminal payment
    #[error("An active payment already exists from {sender} to {receiver}")]
    ActivePaymentExists { sender: PartyId, receiver: PartyId },

    /// The current status does not permit the requested operation
    #[error("Cannot {attempted} a payment in status '{status}'")]
    InvalidTransition {
        status: EscrowStatus,
        attempted: String,
    },

    /// The payment was transitioned concurrently since it was last read
    #[error("Payment {payment_id} changed since it was read")]
    StaleRead { payment_id: PaymentId },

    /// The wallet was already cleared
    #[error("Funds for payment {payment_id} were already withdrawn")]
    AlreadyWithdrawn { payment_id: PaymentId },

    /// The party already has a saved address for this currency
    #[error("{owner} already has a saved {currency} address")]
    AddressExists { owner: PartyId, currency: Currency },

    /// The party is locked and may not open new transactions
    #[error("{party} is locked and cannot participate in new transactions")]
    PartyLocked { party: PartyId },

    /// Referenced record does not exist
    #[error("Not found: {what}")]
    NotFound { what: String },

    // ------------------------------------------------------------------
    // Integrity (fatal: the store may be ambiguous)
    // ------------------------------------------------------------------
    /// A multi-step write failed partway; the caller must not assume any
    /// side effect occurred.
    #[error("Ledger write failure: {context}")]
    WriteFailure { context: String },

    // ------------------------------------------------------------------
    // Infrastructure
    // ------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    /// Stored data failed to decode into domain types
    #[error("Corrupt record: {context}")]
    Corrupt { context: String },
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
