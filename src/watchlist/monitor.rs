use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AlertDirection, AlertEvent, Quote};
use crate::valuation::percent_of;

/// How the baseline moves when a refresh stays under the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMode {
    /// Baseline only moves when an alert fires, so slow drifts add up.
    #[default]
    Cumulative,
    /// Baseline follows every observation; only single-refresh jumps alert.
    PerCycle,
}

impl FromStr for AlertMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cumulative" => Ok(AlertMode::Cumulative),
            "per_cycle" | "per-cycle" => Ok(AlertMode::PerCycle),
            other => Err(format!("unknown alert mode: {other}")),
        }
    }
}

/// Last-seen price per watched symbol for one account.
#[derive(Debug, Clone)]
pub struct WatchlistMonitor {
    account_id: Uuid,
    /// Fractional threshold, e.g. `0.01` for 1%.
    threshold: Decimal,
    mode: AlertMode,
    baselines: HashMap<String, Decimal>,
}

impl WatchlistMonitor {
    pub fn new(account_id: Uuid, threshold_pct: Decimal, mode: AlertMode) -> Self {
        Self {
            account_id,
            threshold: threshold_pct / Decimal::ONE_HUNDRED,
            mode,
            baselines: HashMap::new(),
        }
    }

    pub fn baseline(&self, symbol: &str) -> Option<Decimal> {
        self.baselines.get(symbol).copied()
    }

    /// Drop state for a symbol so a later re-add starts unobserved.
    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    pub fn forget(&mut self, symbol: &str) {
        self.baselines.remove(symbol);
    }

    /// Keep state only for symbols still on the watchlist.
    pub fn sync_membership(&mut self, watched: &HashSet<String>) {
        self.baselines.retain(|symbol, _| watched.contains(symbol));
    }

    /// Feed one quote. Returns an event when the move from the baseline
    /// reaches the threshold.
    pub fn observe(&mut self, quote: &Quote, now: DateTime<Utc>) -> Option<AlertEvent> {
        let price = quote.price;
        if price <= Decimal::ZERO {
            return None;
        }

        let last = match self.baselines.get(&quote.symbol) {
            Some(last) if *last > Decimal::ZERO => *last,
            _ => {
                // First sighting (or unusable baseline): seed silently.
                self.baselines.insert(quote.symbol.clone(), price);
                return None;
            }
        };

        let delta = price - last;
        if delta.abs() < last * self.threshold {
            if self.mode == AlertMode::PerCycle {
                self.baselines.insert(quote.symbol.clone(), price);
            }
            return None;
        }

        self.baselines.insert(quote.symbol.clone(), price);

        Some(AlertEvent {
            id: Uuid::new_v4(),
            account_id: self.account_id,
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            previous_price: last,
            price,
            price_delta: delta,
            change_percent: percent_of(delta, last),
            day_change_percent: quote.change_percent,
            direction: if delta > Decimal::ZERO {
                AlertDirection::Gain
            } else {
                AlertDirection::Loss
            },
            timestamp: now,
        })
    }
}
