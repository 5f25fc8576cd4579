use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest market snapshot for a symbol. Read-only to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub volume: i64,
    /// `false` when the value came from demo/fallback data.
    pub is_live: bool,
    pub last_updated: DateTime<Utc>,
}

impl Quote {
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_seconds()
    }
}

/// One daily close in a symbol's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}
