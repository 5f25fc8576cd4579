use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Gain,
    Loss,
}

/// Raised when a watched symbol moves past the alert threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub account_id: Uuid,
    pub symbol: String,
    pub name: String,
    pub previous_price: Decimal,
    pub price: Decimal,
    pub price_delta: Decimal,
    /// Move relative to the baseline price, in percent.
    pub change_percent: Decimal,
    /// The quote's own day change, in percent.
    pub day_change_percent: Decimal,
    pub direction: AlertDirection,
    pub timestamp: DateTime<Utc>,
}

/// An alert as held in an account's notification tray.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event: AlertEvent,
    pub expires_at: DateTime<Utc>,
}
