//! Escrow lifecycle types for Mediary
//!
//! A payment moves forward through a fixed lifecycle until funds are
//! released or the transaction fails, and is retained afterwards for audit
//! and withdrawal. Every transition is attributed to an actioner role.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an escrow payment.
///
/// The on-disk strings are part of the stored schema; do not change them
/// without a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Created, waiting for the sender's deposit
    Pending,
    /// Deposit confirmed by the payment processor
    Received,
    /// Released or refunded; funds wait for the entitled party to withdraw
    FundsHeld,
    /// Funds withdrawn, nothing left to do
    Completed,
    /// Aborted or cancelled
    Failed,
}

impl EscrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Received => "paid",
            Self::FundsHeld => "held",
            Self::Completed => "complete",
            Self::Failed => "failed",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl FromStr for EscrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Received),
            "held" => Ok(Self::FundsHeld),
            "complete" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown escrow status: {other}")),
        }
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audited action kinds. Deposit confirmation is an external event and is
/// deliberately not one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowActionKind {
    Released,
    Cancelled,
    Aborted,
}

impl EscrowActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Released => "release",
            Self::Cancelled => "cancel",
            Self::Aborted => "abort",
        }
    }
}

impl FromStr for EscrowActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(Self::Released),
            "cancel" => Ok(Self::Cancelled),
            "abort" => Ok(Self::Aborted),
            other => Err(format!("unknown escrow action: {other}")),
        }
    }
}

impl fmt::Display for EscrowActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who triggered a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionerRole {
    Sender,
    Recipient,
    Moderator,
}

impl ActionerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Recipient => "receiver",
            Self::Moderator => "moderator",
        }
    }
}

impl FromStr for ActionerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sender" => Ok(Self::Sender),
            "receiver" => Ok(Self::Recipient),
            "moderator" => Ok(Self::Moderator),
            other => Err(format!("unknown actioner role: {other}")),
        }
    }
}

impl fmt::Display for ActionerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which party an escrow wallet currently favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletBeneficiary {
    Sender,
    Receiver,
    Nobody,
}

impl WalletBeneficiary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
            Self::Nobody => "nobody",
        }
    }
}

impl FromStr for WalletBeneficiary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sender" => Ok(Self::Sender),
            "receiver" => Ok(Self::Receiver),
            "nobody" => Ok(Self::Nobody),
            other => Err(format!("unknown wallet beneficiary: {other}")),
        }
    }
}

impl fmt::Display for WalletBeneficiary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(EscrowStatus::Completed.is_terminal());
        assert!(EscrowStatus::Failed.is_terminal());
        assert!(!EscrowStatus::Pending.is_terminal());
        assert!(!EscrowStatus::Received.is_terminal());
        assert!(!EscrowStatus::FundsHeld.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            EscrowStatus::Pending,
            EscrowStatus::Received,
            EscrowStatus::FundsHeld,
            EscrowStatus::Completed,
            EscrowStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<EscrowStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_action_round_trip() {
        for action in [
            EscrowActionKind::Released,
            EscrowActionKind::Cancelled,
            EscrowActionKind::Aborted,
        ] {
            assert_eq!(action.as_str().parse::<EscrowActionKind>().unwrap(), action);
        }
    }
}
