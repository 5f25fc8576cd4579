use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::models::{PricePoint, Quote};

use super::catalog::{self, StockInfo};
use super::{QuoteError, QuoteSource};

/// Maximum demo drift either side of the fallback price.
const DEMO_SWING: f64 = 0.01;
const HISTORY_DAYS: i64 = 365;

/// Demo quotes used when no API key is configured or the upstream API refuses.
///
/// Prices drift deterministically around the catalog figures so that repeated
/// refreshes show movement without any randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackQuoteSource;

fn symbol_phase(symbol: &str) -> f64 {
    symbol.bytes().map(f64::from).sum::<f64>() / 17.0
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

impl FallbackQuoteSource {
    pub fn quote(&self, info: &StockInfo, now: DateTime<Utc>) -> Quote {
        let minutes = (now.timestamp() / 60) as f64;
        let variation = (minutes / 7.0 + symbol_phase(info.symbol)).sin() * DEMO_SWING;
        let factor = Decimal::ONE + to_decimal(variation);

        Quote {
            symbol: info.symbol.to_string(),
            name: info.name.to_string(),
            price: (info.fallback_price() * factor).round_dp(2),
            change: (info.fallback_change() * factor).round_dp(2),
            change_percent: info.fallback_change_percent(),
            volume: 0,
            is_live: false,
            last_updated: now,
        }
    }

    pub fn history(&self, info: &StockInfo, today: DateTime<Utc>) -> Vec<PricePoint> {
        let base = info.fallback_price();
        let phase = symbol_phase(info.symbol);

        (0..=HISTORY_DAYS)
            .rev()
            .map(|days_ago| {
                let t = (HISTORY_DAYS - days_ago) as f64;
                // Gentle uptrend with a seasonal wobble, ending near the fallback price.
                let trend = 0.85 + 0.15 * t / HISTORY_DAYS as f64;
                let wobble = (t / 15.0 + phase).sin() * 0.03;
                PricePoint {
                    date: (today - Duration::days(days_ago)).date_naive(),
                    price: (base * to_decimal(trend + wobble)).round_dp(2),
                }
            })
            .collect()
    }
}

#[async_trait]
impl QuoteSource for FallbackQuoteSource {
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, QuoteError> {
        let now = Utc::now();
        Ok(symbols
            .iter()
            .filter_map(|s| catalog::lookup(s))
            .map(|info| self.quote(info, now))
            .collect())
    }

    async fn get_history(&self, symbol: &str) -> Result<Vec<PricePoint>, QuoteError> {
        let info =
            catalog::lookup(symbol).ok_or_else(|| QuoteError::UnknownSymbol(symbol.to_string()))?;
        Ok(self.history(info, Utc::now()))
    }

    fn name(&self) -> &str {
        "demo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_demo_quote_stays_within_swing() {
        let info = catalog::lookup("RELIANCE").unwrap();
        let q = FallbackQuoteSource.quote(info, Utc::now());
        assert!(!q.is_live);
        assert!(q.price >= dec!(2819.02) && q.price <= dec!(2875.98));
    }

    #[test]
    fn test_demo_quote_is_deterministic_for_an_instant() {
        let info = catalog::lookup("TCS").unwrap();
        let now = Utc::now();
        assert_eq!(FallbackQuoteSource.quote(info, now), FallbackQuoteSource.quote(info, now));
    }

    #[test]
    fn test_history_is_daily_and_ascending() {
        let info = catalog::lookup("INFY").unwrap();
        let history = FallbackQuoteSource.history(info, Utc::now());
        assert_eq!(history.len(), 366);
        assert!(history.windows(2).all(|w| w[0].date < w[1].date));
        assert!(history.iter().all(|p| p.price > Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_unknown_symbols_are_skipped() {
        let quotes = FallbackQuoteSource
            .get_quotes(&["TCS".to_string(), "NOPE".to_string()])
            .await
            .unwrap();
        assert_eq!(quotes.len(), 1);
        assert!(FallbackQuoteSource.get_history("NOPE").await.is_err());
    }
}
