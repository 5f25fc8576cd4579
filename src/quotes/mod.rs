pub mod alpha_vantage;
pub mod cache;
pub mod catalog;
pub mod fallback;

pub use alpha_vantage::AlphaVantageClient;
pub use cache::QuoteCache;
pub use fallback::FallbackQuoteSource;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{PricePoint, Quote};

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("quote API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("quote API rate limited: {0}")]
    RateLimited(String),

    #[error("malformed quote payload: {0}")]
    Malformed(String),
}

/// Supplier of current prices and daily history. Demo data (`is_live = false`)
/// is returned through the same interface as live data.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, QuoteError>;

    async fn get_history(&self, symbol: &str) -> Result<Vec<PricePoint>, QuoteError>;

    /// Name for logging.
    fn name(&self) -> &str;
}

/// Latest successfully fetched quote per symbol, shared across the service.
#[derive(Clone, Default)]
pub struct QuoteBook {
    inner: Arc<RwLock<BookInner>>,
}

#[derive(Default)]
struct BookInner {
    quotes: HashMap<String, Quote>,
    last_refreshed: Option<DateTime<Utc>>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a refresh into the book. Symbols absent from the refresh keep
    /// their last-known quote; quotes without a positive price are ignored.
    /// Returns the number of quotes accepted.
    pub async fn update(&self, quotes: Vec<Quote>, refreshed_at: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write().await;
        let mut accepted = 0;
        for quote in quotes {
            if quote.price <= Decimal::ZERO {
                tracing::warn!(symbol = %quote.symbol, price = %quote.price, "Ignoring non-positive quote");
                continue;
            }
            inner.quotes.insert(quote.symbol.clone(), quote);
            accepted += 1;
        }
        inner.last_refreshed = Some(refreshed_at);
        accepted
    }

    pub async fn get(&self, symbol: &str) -> Option<Quote> {
        self.inner.read().await.quotes.get(symbol).cloned()
    }

    pub async fn snapshot(&self) -> HashMap<String, Quote> {
        self.inner.read().await.quotes.clone()
    }

    /// All quotes ordered by symbol.
    pub async fn all(&self) -> Vec<Quote> {
        let mut quotes: Vec<Quote> = self.inner.read().await.quotes.values().cloned().collect();
        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        quotes
    }

    pub async fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_refreshed
    }

    /// `true` if any held quote came from the live feed.
    pub async fn is_live(&self) -> bool {
        self.inner.read().await.quotes.values().any(|q| q.is_live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(symbol: &str, price: Decimal) -> Quote {
        Quote {
            symbol: symbol.into(),
            name: symbol.into(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            volume: 0,
            is_live: true,
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_update_keeps_last_known_quotes() {
        let book = QuoteBook::new();
        book.update(vec![quote("A", dec!(10)), quote("B", dec!(20))], Utc::now())
            .await;
        book.update(vec![quote("A", dec!(11))], Utc::now()).await;

        assert_eq!(book.get("A").await.unwrap().price, dec!(11));
        assert_eq!(book.get("B").await.unwrap().price, dec!(20));
        assert!(book.last_refreshed().await.is_some());
    }

    #[tokio::test]
    async fn test_non_positive_prices_are_ignored() {
        let book = QuoteBook::new();
        book.update(vec![quote("A", dec!(10))], Utc::now()).await;
        let accepted = book.update(vec![quote("A", dec!(0))], Utc::now()).await;

        assert_eq!(accepted, 0);
        assert_eq!(book.get("A").await.unwrap().price, dec!(10));
    }
}
