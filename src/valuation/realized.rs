use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::execution::trade_executor::weighted_average;
use crate::models::{Side, Transaction};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealizedTrade {
    pub transaction_id: i64,
    pub symbol: String,
    pub quantity: i64,
    pub sell_price: Decimal,
    /// Average cost of the position at the moment of the sale.
    pub avg_cost: Decimal,
    pub realized: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RealizedPnlReport {
    pub trades: Vec<RealizedTrade>,
    pub by_symbol: BTreeMap<String, Decimal>,
    pub total: Decimal,
}

#[derive(Default)]
struct Lot {
    quantity: i64,
    avg_price: Decimal,
}

/// Derive realized gains by replaying the log with weighted-average cost.
///
/// The stored `avg_price` only reflects the present, so the log is the source
/// of truth for historical cost. Entries are replayed in `id` order regardless
/// of the order they are passed in.
pub fn realized_pnl(log: &[Transaction]) -> RealizedPnlReport {
    let mut ordered: Vec<&Transaction> = log.iter().collect();
    ordered.sort_by_key(|t| t.id);

    let mut lots: HashMap<&str, Lot> = HashMap::new();
    let mut report = RealizedPnlReport::default();

    for tx in ordered {
        let lot = lots.entry(tx.symbol.as_str()).or_default();
        match tx.side {
            Side::Buy => {
                let quantity = lot.quantity.saturating_add(tx.quantity);
                let cost = lot
                    .avg_price
                    .saturating_mul(Decimal::from(lot.quantity))
                    .saturating_add(tx.total);
                lot.avg_price = weighted_average(cost, quantity).unwrap_or(lot.avg_price);
                lot.quantity = quantity;
            }
            Side::Sell => {
                let realized = tx
                    .price
                    .saturating_sub(lot.avg_price)
                    .saturating_mul(Decimal::from(tx.quantity));
                report.trades.push(RealizedTrade {
                    transaction_id: tx.id,
                    symbol: tx.symbol.clone(),
                    quantity: tx.quantity,
                    sell_price: tx.price,
                    avg_cost: lot.avg_price,
                    realized,
                    created_at: tx.created_at,
                });
                let by_symbol = report.by_symbol.entry(tx.symbol.clone()).or_default();
                *by_symbol = by_symbol.saturating_add(realized);
                report.total = report.total.saturating_add(realized);

                lot.quantity = (lot.quantity - tx.quantity).max(0);
                if lot.quantity == 0 {
                    lot.avg_price = Decimal::ZERO;
                }
            }
        }
    }

    report
}
