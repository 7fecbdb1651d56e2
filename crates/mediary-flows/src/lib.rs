//! Mediary Flow Orchestrator
//!
//! Conversational sub-flows that gather everything the ledger needs
//! before and during an escrow payment: terms acceptance and payout
//! address collection. The chat transport is abstracted behind
//! [`Messenger`], so the flows are testable without a live service.

mod address;
mod error;
mod messenger;
mod terms;

use mediary_ledger::Ledger;
use std::sync::Arc;

pub use address::{ADDRESS_REPLY_TIMEOUT, SAVE_ADDRESS_TIMEOUT};
pub use error::{FlowError, FlowResult, TermsFailure};
pub use messenger::{MessageHandle, Messenger, MessengerError};
pub use terms::TERMS_TIMEOUT;

/// Reaction emoji the flows prompt with.
pub const ACCEPT_EMOJI: &str = "\u{2705}";
pub const DECLINE_EMOJI: &str = "\u{274c}";
pub const SAVE_EMOJI: &str = "\u{2705}";

/// Drives the conversational flows against a ledger and a messenger.
///
/// Cheap to clone; background offers run on clones.
#[derive(Clone)]
pub struct FlowOrchestrator {
    ledger: Ledger,
    messenger: Arc<dyn Messenger>,
}

impl FlowOrchestrator {
    pub fn new(ledger: Ledger, messenger: Arc<dyn Messenger>) -> Self {
        Self { ledger, messenger }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
