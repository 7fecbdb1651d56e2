//! Mediary foundation types
//!
//! Shared vocabulary for the escrow core: party and payment identifiers,
//! the currency registry surface, and the escrow lifecycle enums. This
//! crate has no dependencies on the rest of the workspace so every layer
//! can speak the same types.

pub mod currency;
pub mod escrow;
pub mod identity;

pub use currency::{Currency, UnknownCurrencyError};
pub use escrow::{ActionerRole, EscrowActionKind, EscrowStatus, WalletBeneficiary};
pub use identity::{PartyId, PaymentId};
