//! Linked address repository
//!
//! Payout addresses a party keeps on file, at most one per (owner,
//! currency). Rows are only ever removed by an explicit delete.

use mediary_types::{Currency, PartyId};
use sqlx::SqlitePool;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AddressRow, SavedAddress};

pub struct AddressRepo {
    pool: SqlitePool,
}

impl AddressRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The owner's saved address for a currency, if any.
    pub async fn for_currency(
        &self,
        owner: PartyId,
        currency: Currency,
    ) -> LedgerResult<Option<SavedAddress>> {
        let row = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT owner_id, currency, address, is_public
            FROM linked_addresses
            WHERE owner_id = ? AND currency = ?
            "#,
        )
        .bind(owner.0)
        .bind(currency.code())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SavedAddress::try_from).transpose()
    }

    /// Every address the owner has on file.
    pub async fn all_for(&self, owner: PartyId) -> LedgerResult<Vec<SavedAddress>> {
        let rows = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT owner_id, currency, address, is_public
            FROM linked_addresses
            WHERE owner_id = ?
            ORDER BY currency
            "#,
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SavedAddress::try_from).collect()
    }

    /// Save an address for future reuse.
    pub async fn save(
        &self,
        owner: PartyId,
        currency: Currency,
        address: &str,
        is_public: bool,
    ) -> LedgerResult<SavedAddress> {
        sqlx::query(
            r#"
            INSERT INTO linked_addresses (owner_id, currency, address, is_public)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(owner.0)
        .bind(currency.code())
        .bind(address)
        .bind(is_public)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err)
                if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                LedgerError::AddressExists { owner, currency }
            }
            _ => LedgerError::Query(e),
        })?;

        Ok(SavedAddress {
            owner,
            currency,
            address: address.to_string(),
            is_public,
        })
    }

    /// Toggle whether an address may be shown to other parties. Returns
    /// false when no such address is on file.
    pub async fn set_visibility(
        &self,
        owner: PartyId,
        address: &str,
        is_public: bool,
    ) -> LedgerResult<bool> {
        let result = sqlx::query(
            "UPDATE linked_addresses SET is_public = ? WHERE owner_id = ? AND address = ?",
        )
        .bind(is_public)
        .bind(owner.0)
        .bind(address)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() >= 1)
    }

    /// Explicitly remove an address. Returns false when none matched.
    pub async fn delete(&self, owner: PartyId, address: &str) -> LedgerResult<bool> {
        let result =
            sqlx::query("DELETE FROM linked_addresses WHERE owner_id = ? AND address = ?")
                .bind(owner.0)
                .bind(address)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() >= 1)
    }
}
