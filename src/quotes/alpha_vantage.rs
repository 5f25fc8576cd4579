use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::{PricePoint, Quote};

use super::cache::QuoteCache;
use super::catalog::{self, StockInfo};
use super::fallback::FallbackQuoteSource;
use super::{QuoteError, QuoteSource};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const MAX_HISTORY_POINTS: usize = 365;

/// Alpha Vantage quote client with a TTL cache and demo fallback.
///
/// The free tier allows only a handful of requests per day, so every answer is
/// cached and any refusal (rate-limit note, error message, empty payload,
/// transport failure) degrades to demo data instead of failing the caller.
#[derive(Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    usd_to_inr: Decimal,
    quote_cache: Arc<QuoteCache<Quote>>,
    history_cache: Arc<QuoteCache<Vec<PricePoint>>>,
    fallback: FallbackQuoteSource,
}

impl AlphaVantageClient {
    pub fn new(
        http: reqwest::Client,
        api_key: String,
        usd_to_inr: Decimal,
        quote_cache: Arc<QuoteCache<Quote>>,
        history_cache: Arc<QuoteCache<Vec<PricePoint>>>,
    ) -> Self {
        Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            usd_to_inr,
            quote_cache,
            history_cache,
            fallback: FallbackQuoteSource,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_json(&self, function: &str, api_symbol: &str) -> Result<Value, QuoteError> {
        let mut params = vec![
            ("function", function),
            ("symbol", api_symbol),
            ("apikey", self.api_key.as_str()),
        ];
        if function == "TIME_SERIES_DAILY" {
            params.push(("outputsize", "compact"));
        }
        let url = reqwest::Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| QuoteError::Malformed(format!("bad quote API url: {e}")))?;

        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        check_refusal(&body)?;
        Ok(body)
    }

    async fn quote_for(&self, info: &StockInfo) -> Quote {
        let cache_key = format!("quote_{}", info.symbol);
        if let Some(cached) = self.quote_cache.get(&cache_key).await {
            tracing::debug!(symbol = info.symbol, "Using cached quote");
            return cached;
        }

        let now = Utc::now();
        let result = match self.fetch_json("GLOBAL_QUOTE", info.api_symbol).await {
            Ok(body) => parse_global_quote(&body, info, self.usd_to_inr, now),
            Err(e) => Err(e),
        };

        match result {
            Ok(quote) => {
                self.quote_cache.insert(cache_key, quote.clone()).await;
                quote
            }
            Err(e) => {
                tracing::info!(
                    symbol = info.symbol,
                    error = %e,
                    "Quote API unavailable, using demo data"
                );
                self.fallback.quote(info, now)
            }
        }
    }
}

/// Alpha Vantage reports refusals inside a 200 response.
fn check_refusal(body: &Value) -> Result<(), QuoteError> {
    for key in ["Note", "Information"] {
        if let Some(note) = body.get(key).and_then(Value::as_str) {
            return Err(QuoteError::RateLimited(note.to_string()));
        }
    }
    if let Some(msg) = body.get("Error Message").and_then(Value::as_str) {
        return Err(QuoteError::Malformed(msg.to_string()));
    }
    Ok(())
}

fn decimal_field(obj: &Value, key: &str) -> Result<Decimal, QuoteError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().trim_end_matches('%'))
        .ok_or_else(|| QuoteError::Malformed(format!("missing field {key:?}")))?
        .parse::<Decimal>()
        .map_err(|e| QuoteError::Malformed(format!("field {key:?}: {e}")))
}

/// Parse a `GLOBAL_QUOTE` payload, converting US listings to INR.
pub fn parse_global_quote(
    body: &Value,
    info: &StockInfo,
    usd_to_inr: Decimal,
    now: DateTime<Utc>,
) -> Result<Quote, QuoteError> {
    let quote = body
        .get("Global Quote")
        .filter(|q| q.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| QuoteError::Malformed("empty Global Quote".into()))?;

    let rate = if info.is_us_listing() { usd_to_inr } else { Decimal::ONE };
    let price = decimal_field(quote, "05. price")? * rate;
    let change = decimal_field(quote, "09. change")? * rate;
    let change_percent = decimal_field(quote, "10. change percent").unwrap_or(Decimal::ZERO);
    let volume = quote
        .get("06. volume")
        .and_then(Value::as_str)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);

    Ok(Quote {
        symbol: info.symbol.to_string(),
        name: info.name.to_string(),
        price: price.round_dp(2),
        change: change.round_dp(2),
        change_percent: change_percent.round_dp(2),
        volume,
        is_live: true,
        last_updated: now,
    })
}

/// Parse a `TIME_SERIES_DAILY` payload into ascending daily closes.
pub fn parse_time_series(
    body: &Value,
    info: &StockInfo,
    usd_to_inr: Decimal,
) -> Result<Vec<PricePoint>, QuoteError> {
    let series = body
        .get("Time Series (Daily)")
        .and_then(Value::as_object)
        .ok_or_else(|| QuoteError::Malformed("missing Time Series (Daily)".into()))?;

    let rate = if info.is_us_listing() { usd_to_inr } else { Decimal::ONE };
    let mut points = series
        .iter()
        .map(|(date, values)| {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| QuoteError::Malformed(format!("date {date:?}: {e}")))?;
            let close = decimal_field(values, "4. close")?;
            Ok(PricePoint {
                date,
                price: (close * rate).round_dp(2),
            })
        })
        .collect::<Result<Vec<_>, QuoteError>>()?;

    points.sort_by_key(|p| p.date);
    if points.len() > MAX_HISTORY_POINTS {
        points.drain(..points.len() - MAX_HISTORY_POINTS);
    }
    Ok(points)
}

#[async_trait]
impl QuoteSource for AlphaVantageClient {
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, QuoteError> {
        let known: Vec<&StockInfo> = symbols
            .iter()
            .filter_map(|s| {
                let info = catalog::lookup(s);
                if info.is_none() {
                    tracing::warn!(symbol = %s, "Skipping unsupported symbol");
                }
                info
            })
            .collect();

        Ok(join_all(known.into_iter().map(|info| self.quote_for(info))).await)
    }

    async fn get_history(&self, symbol: &str) -> Result<Vec<PricePoint>, QuoteError> {
        let info =
            catalog::lookup(symbol).ok_or_else(|| QuoteError::UnknownSymbol(symbol.to_string()))?;

        let cache_key = format!("series_{}", info.symbol);
        if let Some(cached) = self.history_cache.get(&cache_key).await {
            return Ok(cached);
        }

        let result = match self.fetch_json("TIME_SERIES_DAILY", info.api_symbol).await {
            Ok(body) => parse_time_series(&body, info, self.usd_to_inr),
            Err(e) => Err(e),
        };

        match result {
            Ok(history) => {
                self.history_cache.insert(cache_key, history.clone()).await;
                Ok(history)
            }
            Err(e) => {
                tracing::info!(symbol = info.symbol, error = %e, "Using demo history");
                Ok(self.fallback.history(info, Utc::now()))
            }
        }
    }

    fn name(&self) -> &str {
        "alpha_vantage"
    }
}
