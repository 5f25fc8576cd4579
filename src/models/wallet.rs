use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the wallets table. One per account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub account_id: Uuid,
    pub balance: Decimal,
    pub initial_balance: Decimal,
    /// Bumped by every committed trade; commits carry the version they were
    /// planned against.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership row for the watchlist table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WatchlistEntry {
    pub account_id: Uuid,
    pub symbol: String,
    pub added_at: DateTime<Utc>,
}
