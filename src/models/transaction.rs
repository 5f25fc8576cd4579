use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Side;

/// An executed buy or sell. Immutable once written.
///
/// `id` increases strictly with creation order and is the ordering source of
/// truth; `created_at` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: Uuid,
    pub client_order_id: Option<Uuid>,
    pub side: Side,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A transaction about to be appended; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_id: Uuid,
    pub client_order_id: Option<Uuid>,
    pub side: Side,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub total: Decimal,
}

impl NewTransaction {
    pub fn into_transaction(self, id: i64, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            client_order_id: self.client_order_id,
            side: self.side,
            symbol: self.symbol,
            name: self.name,
            quantity: self.quantity,
            price: self.price,
            total: self.total,
            created_at,
        }
    }
}
