//! User repository

use chrono::Utc;
use mediary_types::PartyId;
use sqlx::SqlitePool;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{User, UserRow};

/// Participant registry: onboarding and moderation locks.
pub struct UserRepo {
    pool: SqlitePool,
}

impl UserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a registered user.
    pub async fn get(&self, party: PartyId) -> LedgerResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, created_at, locked FROM users WHERE id = ?",
        )
        .bind(party.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Register a party if not yet known, returning the record either way.
    pub async fn ensure(&self, party: PartyId) -> LedgerResult<User> {
        sqlx::query("INSERT INTO users (id, created_at, locked) VALUES (?, ?, 0) ON CONFLICT (id) DO NOTHING")
            .bind(party.0)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        self.get(party).await?.ok_or(LedgerError::NotFound {
            what: format!("user {party}"),
        })
    }

    /// Block a party from opening new transactions. Returns false when the
    /// party is unknown.
    pub async fn lock(&self, party: PartyId) -> LedgerResult<bool> {
        let result = sqlx::query("UPDATE users SET locked = 1 WHERE id = ?")
            .bind(party.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lift a moderation lock. Returns false when the party is unknown.
    pub async fn unlock(&self, party: PartyId) -> LedgerResult<bool> {
        let result = sqlx::query("UPDATE users SET locked = 0 WHERE id = ?")
            .bind(party.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
