//! Identity types for Mediary
//!
//! Strongly typed wrappers around the raw integer identifiers so a party
//! id can never be confused with a payment id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// External identifier of a transaction participant.
///
/// Parties are identified by the messaging platform; the core never mints
/// these itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId(pub i64);

impl PartyId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for PartyId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party_{}", self.0)
    }
}

/// Identifier of an escrow payment, assigned by the ledger on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentId(pub i64);

impl PaymentId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for PaymentId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment_{}", self.0)
    }
}
