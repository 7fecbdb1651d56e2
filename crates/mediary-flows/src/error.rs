//! Flow errors

use mediary_types::{Currency, PartyId};
use thiserror::Error;

/// Why a party failed the terms gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsFailure {
    /// The prompt expired without a reaction
    TimedOut,
    /// The party explicitly declined
    Declined,
}

impl std::fmt::Display for TermsFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimedOut => write!(f, "did not respond in time"),
            Self::Declined => write!(f, "declined the terms"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{party} {reason}")]
    TermsNotAccepted { party: PartyId, reason: TermsFailure },

    #[error("cannot reach {party} over direct messages")]
    CannotReachParty { party: PartyId },

    #[error("{party} did not supply a {currency} address in time")]
    AddressNotSupplied { party: PartyId, currency: Currency },

    #[error(transparent)]
    Ledger(#[from] mediary_ledger::LedgerError),
}

pub type FlowResult<T> = Result<T, FlowError>;
