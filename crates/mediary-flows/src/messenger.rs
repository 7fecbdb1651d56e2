//! Messenger abstraction
//!
//! The orchestrator talks to parties over whatever chat transport the host
//! wires in. The trait covers the four interactions the flows need: a
//! direct message, a reaction prompt, a free-form reply, and reaction
//! cleanup.

use async_trait::async_trait;
use mediary_types::PartyId;
use std::time::Duration;
use thiserror::Error;

/// Opaque handle to a delivered message, used to await reactions on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

#[derive(Debug, Error)]
pub enum MessengerError {
    /// The party blocks direct messages or is otherwise unreachable
    #[error("{party} cannot receive direct messages")]
    PermissionDenied { party: PartyId },

    /// The wait expired without the party responding
    #[error("timed out waiting for a response")]
    TimedOut,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver a direct message to a party.
    async fn send_direct(
        &self,
        party: PartyId,
        content: &str,
    ) -> Result<MessageHandle, MessengerError>;

    /// Wait for the party to react to `message` with one of `allowed`,
    /// returning the emoji they picked.
    async fn await_reaction(
        &self,
        message: MessageHandle,
        party: PartyId,
        allowed: &[&str],
        timeout: Duration,
    ) -> Result<String, MessengerError>;

    /// Wait for the party's next direct-message reply.
    async fn await_reply(&self, party: PartyId, timeout: Duration)
        -> Result<String, MessengerError>;

    /// Strip reaction options from a delivered message.
    async fn remove_reactions(
        &self,
        message: MessageHandle,
        emojis: &[&str],
    ) -> Result<(), MessengerError>;
}
