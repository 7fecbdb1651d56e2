//! Currency types for Mediary
//!
//! The enum carries the wire codes; the authoritative decimal precision for
//! each currency lives in the ledger's currency registry so it can be
//! adjusted without recompiling callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A currency code was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown currency code: {code}")]
pub struct UnknownCurrencyError {
    pub code: String,
}

/// Currencies the escrow service mediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Bitcoin,
    Litecoin,
    TnbCoin,
}

impl Currency {
    /// Get the wire/registry code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Bitcoin => "BTC",
            Self::Litecoin => "LTC",
            Self::TnbCoin => "TNBC",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bitcoin => "Bitcoin",
            Self::Litecoin => "Litecoin",
            Self::TnbCoin => "TNB Coin",
        }
    }

    /// All supported currencies, in registry order
    pub fn all() -> [Currency; 3] {
        [Self::Bitcoin, Self::Litecoin, Self::TnbCoin]
    }
}

impl FromStr for Currency {
    type Err = UnknownCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BTC" => Ok(Self::Bitcoin),
            "LTC" => Ok(Self::Litecoin),
            "TNBC" => Ok(Self::TnbCoin),
            other => Err(UnknownCurrencyError {
                code: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
