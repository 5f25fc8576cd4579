pub mod alert;
pub mod holding;
pub mod quote;
pub mod transaction;
pub mod wallet;

pub use alert::{AlertDirection, AlertEvent, Notification};
pub use holding::Holding;
pub use quote::{PricePoint, Quote};
pub use transaction::{NewTransaction, Transaction};
pub use wallet::{Wallet, WatchlistEntry};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form of a ticker symbol: trimmed and upper-cased.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_round_trips_through_db_text() {
        assert_eq!(Side::from_db_str("buy"), Some(Side::Buy));
        assert_eq!(Side::from_db_str("SELL"), Some(Side::Sell));
        assert_eq!(Side::from_db_str("hold"), None);
        assert_eq!(Side::Sell.to_string(), "sell");
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("  reliance "), "RELIANCE");
        assert_eq!(normalize_symbol(""), "");
    }
}
