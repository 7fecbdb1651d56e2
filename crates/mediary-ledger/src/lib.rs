//! Mediary Escrow Ledger
//!
//! The authoritative store for escrow payments: a durable state machine
//! over SQLite with a tamper-evident audit trail of every transition.
//!
//! # Invariants
//!
//! 1. At most one non-terminal payment per ordered (sender, receiver) pair,
//!    enforced by a partial unique index in the store itself
//! 2. Statuses only move forward through the transition table
//! 3. Every status transition pairs with exactly one audit action row,
//!    written in the same transaction
//! 4. Monetary amounts are exact decimals at the currency's registered
//!    precision, never floating point
//!
//! # Repository Pattern
//!
//! Each domain has its own repository hanging off [`Ledger`]; the payment
//! repository owns the state machine and wraps each mutation in a single
//! SQLite transaction.

pub mod config;
pub mod error;
pub mod models;
pub mod precision;
pub mod repos;

use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use mediary_types::Currency;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use models::*;
pub use repos::*;

/// Handle to the escrow store.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open (creating if missing) and migrate the store.
    pub async fn connect(config: &LedgerConfig) -> LedgerResult<Self> {
        info!("Opening escrow ledger at {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| LedgerError::Connection(format!("SQLite: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::Connection(format!("SQLite: {e}")))?;

        let ledger = Self { pool };
        ledger.migrate().await?;

        info!("Escrow ledger ready");

        Ok(ledger)
    }

    /// An in-memory ledger, fully migrated.
    ///
    /// A single pooled connection keeps every handle on the same database.
    pub async fn in_memory() -> LedgerResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| LedgerError::Connection(format!("SQLite: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::Connection(format!("SQLite: {e}")))?;

        let ledger = Self { pool };
        ledger.migrate().await?;

        Ok(ledger)
    }

    async fn migrate(&self) -> LedgerResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::Migration(e.to_string()))?;

        Ok(())
    }

    /// Liveness check against the underlying store.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    // ------------------------------------------------------------------
    // Repositories
    // ------------------------------------------------------------------

    pub fn users(&self) -> UserRepo {
        UserRepo::new(self.pool.clone())
    }

    pub fn addresses(&self) -> AddressRepo {
        AddressRepo::new(self.pool.clone())
    }

    pub fn currencies(&self) -> CurrencyRepo {
        CurrencyRepo::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepo {
        PaymentRepo::new(self.pool.clone())
    }

    // ------------------------------------------------------------------
    // Precision validation
    // ------------------------------------------------------------------

    /// Normalize an amount against the registry precision for `currency`.
    ///
    /// Lenient mode clips extra digits half-up; strict mode reports
    /// `PrecisionLoss`. See [`precision::normalize`].
    pub async fn normalize_amount(
        &self,
        currency: Currency,
        amount: Decimal,
        strict: bool,
    ) -> LedgerResult<Decimal> {
        let info = self.currencies().get(currency).await?;
        precision::normalize(amount, info.precision, strict)
    }
}
