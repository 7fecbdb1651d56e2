//! Mediary Payments
//!
//! Client for the upstream payment processor: deposit address requests,
//! outbound payouts, balances, and session refresh. Deposits and payouts
//! move real funds; the escrow ledger records what this client observes.

mod client;
mod config;

pub use client::{ApiError, ApiResult, PaymentClient};
pub use config::PaymentsConfig;
