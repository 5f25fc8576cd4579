use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the holdings table.
///
/// Only non-zero positions exist; a sell that exhausts the quantity deletes
/// the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Holding {
    pub account_id: Uuid,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    /// Weighted average cost per share.
    pub avg_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// Cost basis of the whole position.
    pub fn invested_value(&self) -> Decimal {
        self.avg_price.saturating_mul(Decimal::from(self.quantity))
    }
}
