//! Currency registry repository
//!
//! The registry is seeded by migration; precision lookups feed the
//! precision validator.

use mediary_types::Currency;
use sqlx::SqlitePool;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{CurrencyInfo, CurrencyRow};

pub struct CurrencyRepo {
    pool: SqlitePool,
}

impl CurrencyRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the registry entry for a currency.
    pub async fn get(&self, currency: Currency) -> LedgerResult<CurrencyInfo> {
        let row = sqlx::query_as::<_, CurrencyRow>(
            "SELECT code, precision FROM currencies WHERE code = ?",
        )
        .bind(currency.code())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| LedgerError::UnknownCurrency {
            code: currency.code().to_string(),
        })?;

        CurrencyInfo::try_from(row)
    }

    /// Declared decimal precision for a currency.
    pub async fn precision(&self, currency: Currency) -> LedgerResult<u32> {
        Ok(self.get(currency).await?.precision)
    }

    /// All registered currencies, in code order.
    pub async fn list(&self) -> LedgerResult<Vec<CurrencyInfo>> {
        let rows = sqlx::query_as::<_, CurrencyRow>(
            "SELECT code, precision FROM currencies ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CurrencyInfo::try_from).collect()
    }
}
