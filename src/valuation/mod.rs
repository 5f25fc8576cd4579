//! Valuation engine: unrealized P&L of holdings against the latest quotes,
//! portfolio aggregates, and realized P&L derived from the transaction log.
//!
//! Everything here is pure. The same holdings, quotes and clock always give
//! the same numbers.

pub mod realized;

pub use realized::{realized_pnl, RealizedPnlReport, RealizedTrade};

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Holding, Quote, Wallet};

/// Fractional digits kept on percentages.
pub const PERCENT_DP: u32 = 4;

/// `numerator / denominator × 100`, or zero when the denominator is zero.
/// Results beyond the decimal range saturate.
pub fn percent_of(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() || numerator.is_zero() {
        return Decimal::ZERO;
    }
    match numerator
        .checked_div(denominator)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    {
        Some(pct) => pct.round_dp(PERCENT_DP),
        None if numerator.is_sign_negative() == denominator.is_sign_negative() => Decimal::MAX,
        None => Decimal::MIN,
    }
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValuation {
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub invested_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_percent: Decimal,
    /// `false` when no quote has ever been seen and the holding is carried at cost.
    pub priced: bool,
    /// Quote missing or older than the allowed age.
    pub stale: bool,
    pub quote_time: Option<DateTime<Utc>>,
}

/// Value one holding against its latest quote.
///
/// A quote older than `max_age` is still used but flagged stale. With no quote
/// at all the holding is carried at its cost basis.
pub fn value_holding(
    holding: &Holding,
    quote: Option<&Quote>,
    now: DateTime<Utc>,
    max_age: Duration,
) -> HoldingValuation {
    let invested_value = holding.invested_value();

    let (current_price, priced, stale, quote_time) = match quote {
        Some(q) => (
            q.price,
            true,
            now - q.last_updated > max_age,
            Some(q.last_updated),
        ),
        None => (holding.avg_price, false, true, None),
    };

    let current_value = current_price.saturating_mul(Decimal::from(holding.quantity));
    let profit_loss = current_value.saturating_sub(invested_value);

    HoldingValuation {
        symbol: holding.symbol.clone(),
        name: holding.name.clone(),
        quantity: holding.quantity,
        avg_price: holding.avg_price,
        current_price,
        current_value,
        invested_value,
        profit_loss,
        profit_loss_percent: percent_of(profit_loss, invested_value),
        priced,
        stale,
        quote_time,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioValuation {
    pub holdings: Vec<HoldingValuation>,
    pub portfolio_value: Decimal,
    pub invested_value: Decimal,
    pub total_profit_loss: Decimal,
    pub total_profit_loss_percent: Decimal,
    /// At least one holding was valued on a stale or missing quote.
    pub stale: bool,
}

/// Value a set of holdings against a quote map keyed by symbol.
pub fn value_portfolio(
    holdings: &[Holding],
    quotes: &HashMap<String, Quote>,
    now: DateTime<Utc>,
    max_age: Duration,
) -> PortfolioValuation {
    let valuations: Vec<HoldingValuation> = holdings
        .iter()
        .map(|h| value_holding(h, quotes.get(&h.symbol), now, max_age))
        .collect();

    let portfolio_value = saturating_sum(valuations.iter().map(|v| v.current_value));
    let invested_value = saturating_sum(valuations.iter().map(|v| v.invested_value));
    let total_profit_loss = portfolio_value.saturating_sub(invested_value);

    PortfolioValuation {
        stale: valuations.iter().any(|v| v.stale),
        holdings: valuations,
        portfolio_value,
        invested_value,
        total_profit_loss,
        total_profit_loss_percent: percent_of(total_profit_loss, invested_value),
    }
}

/// Balance plus valuation, as shown on the portfolio and wallet pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub balance: Decimal,
    pub portfolio_value: Decimal,
    pub invested_value: Decimal,
    pub total_profit_loss: Decimal,
    pub total_profit_loss_percent: Decimal,
    pub net_worth: Decimal,
    pub initial_balance: Decimal,
    /// Net worth relative to the starting balance.
    pub overall_return: Decimal,
    pub overall_return_percent: Decimal,
    pub holdings_count: usize,
    pub stale: bool,
}

pub fn summarize(wallet: &Wallet, valuation: &PortfolioValuation) -> PortfolioSummary {
    let net_worth = wallet.balance.saturating_add(valuation.portfolio_value);
    let overall_return = net_worth.saturating_sub(wallet.initial_balance);

    PortfolioSummary {
        balance: wallet.balance,
        portfolio_value: valuation.portfolio_value,
        invested_value: valuation.invested_value,
        total_profit_loss: valuation.total_profit_loss,
        total_profit_loss_percent: valuation.total_profit_loss_percent,
        net_worth,
        initial_balance: wallet.initial_balance,
        overall_return,
        overall_return_percent: percent_of(overall_return, wallet.initial_balance),
        holdings_count: valuation.holdings.len(),
        stale: valuation.stale,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn holding(symbol: &str, quantity: i64, avg_price: Decimal) -> Holding {
        Holding {
            account_id: Uuid::nil(),
            symbol: symbol.into(),
            name: symbol.into(),
            quantity,
            avg_price,
            updated_at: Utc::now(),
        }
    }

    fn quote(symbol: &str, price: Decimal, at: DateTime<Utc>) -> Quote {
        Quote {
            symbol: symbol.into(),
            name: symbol.into(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            volume: 0,
            is_live: false,
            last_updated: at,
        }
    }

    #[test]
    fn test_value_holding_with_fresh_quote() {
        let now = Utc::now();
        let h = holding("RELIANCE", 6, dec!(2847.50));
        let q = quote("RELIANCE", dec!(2900), now);

        let v = value_holding(&h, Some(&q), now, Duration::minutes(10));
        assert_eq!(v.current_value, dec!(17400));
        assert_eq!(v.invested_value, dec!(17085.00));
        assert_eq!(v.profit_loss, dec!(315.00));
        assert_eq!(v.profit_loss_percent, dec!(1.8437));
        assert!(v.priced);
        assert!(!v.stale);
    }

    #[test]
    fn test_old_quote_is_used_but_flagged() {
        let now = Utc::now();
        let h = holding("TCS", 2, dec!(4000));
        let q = quote("TCS", dec!(4100), now - Duration::hours(1));

        let v = value_holding(&h, Some(&q), now, Duration::minutes(10));
        assert_eq!(v.current_price, dec!(4100));
        assert!(v.stale);
        assert!(v.priced);
    }

    #[test]
    fn test_missing_quote_carries_holding_at_cost() {
        let h = holding("WIPRO", 3, dec!(467.25));
        let v = value_holding(&h, None, Utc::now(), Duration::minutes(10));
        assert_eq!(v.current_value, v.invested_value);
        assert_eq!(v.profit_loss, Decimal::ZERO);
        assert!(!v.priced);
        assert!(v.stale);
    }

    #[test]
    fn test_portfolio_totals() {
        let now = Utc::now();
        let holdings = vec![
            holding("A", 10, dec!(100)),
            holding("B", 5, dec!(200)),
        ];
        let quotes: HashMap<String, Quote> = [
            ("A".to_string(), quote("A", dec!(110), now)),
            ("B".to_string(), quote("B", dec!(180), now)),
        ]
        .into_iter()
        .collect();

        let p = value_portfolio(&holdings, &quotes, now, Duration::minutes(10));
        assert_eq!(p.portfolio_value, dec!(2000));
        assert_eq!(p.invested_value, dec!(2000));
        assert_eq!(p.total_profit_loss, Decimal::ZERO);
        assert_eq!(p.total_profit_loss_percent, Decimal::ZERO);
        assert!(!p.stale);
    }

    #[test]
    fn test_empty_portfolio_has_zero_percent() {
        let p = value_portfolio(&[], &HashMap::new(), Utc::now(), Duration::minutes(10));
        assert_eq!(p.invested_value, Decimal::ZERO);
        assert_eq!(p.total_profit_loss_percent, Decimal::ZERO);
    }

    #[test]
    fn test_dust_cost_basis_saturates_percent() {
        let now = Utc::now();
        let h = holding("TCS", 1, dec!(0.0000000000000000000000000001));
        let q = quote("TCS", dec!(4000), now);

        let v = value_holding(&h, Some(&q), now, Duration::minutes(10));
        assert_eq!(v.profit_loss_percent, Decimal::MAX);

        let quotes = HashMap::from([("TCS".to_string(), q)]);
        let p = value_portfolio(&[h], &quotes, now, Duration::minutes(10));
        assert_eq!(p.total_profit_loss_percent, Decimal::MAX);
    }

    #[test]
    fn test_percent_of_saturates_by_sign() {
        let dust = dec!(0.0000000000000000000000000001);
        assert_eq!(percent_of(dec!(-4000), dust), Decimal::MIN);
        assert_eq!(percent_of(dec!(4000), dust), Decimal::MAX);
        assert_eq!(percent_of(Decimal::ZERO, dust), Decimal::ZERO);
    }

    #[test]
    fn test_summary_saturates_near_decimal_max() {
        let now = Utc::now();
        let wallet = Wallet {
            account_id: Uuid::nil(),
            balance: Decimal::MAX,
            initial_balance: dec!(1000000),
            version: 9,
            created_at: now,
            updated_at: now,
        };
        let holdings = vec![holding("A", 2, dec!(100)), holding("B", 3, Decimal::MAX)];

        let valuation = value_portfolio(&holdings, &HashMap::new(), now, Duration::minutes(10));
        assert_eq!(valuation.portfolio_value, Decimal::MAX);

        let s = summarize(&wallet, &valuation);
        assert_eq!(s.net_worth, Decimal::MAX);
        assert!(s.overall_return > Decimal::ZERO);
    }

    #[test]
    fn test_summary_overall_return() {
        let now = Utc::now();
        let wallet = Wallet {
            account_id: Uuid::nil(),
            balance: dec!(983125.00),
            initial_balance: dec!(1000000),
            version: 2,
            created_at: now,
            updated_at: now,
        };
        let holdings = vec![holding("RELIANCE", 6, dec!(2847.50))];
        let quotes: HashMap<String, Quote> =
            [("RELIANCE".to_string(), quote("RELIANCE", dec!(2900), now))]
                .into_iter()
                .collect();

        let valuation = value_portfolio(&holdings, &quotes, now, Duration::minutes(10));
        let s = summarize(&wallet, &valuation);
        assert_eq!(s.net_worth, dec!(1000525.00));
        assert_eq!(s.overall_return, dec!(525.00));
        assert_eq!(s.overall_return_percent, dec!(0.0525));
        assert_eq!(s.holdings_count, 1);
    }
}
