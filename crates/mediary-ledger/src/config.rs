//! Ledger configuration
//!
//! Constructed once at startup and passed into `Ledger::connect`; nothing
//! in this crate reads the environment after that point.

use serde::{Deserialize, Serialize};

/// Ledger storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite connection URL (e.g. `sqlite://mediary.db`)
    pub database_url: String,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://mediary.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }
}

impl LedgerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: std::env::var("MEDIARY_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://mediary.db".to_string()),
            max_connections: std::env::var("MEDIARY_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            acquire_timeout_secs: std::env::var("MEDIARY_DB_ACQUIRE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}
