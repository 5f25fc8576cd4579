use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::execution::TradePolicy;
use crate::watchlist::hub::AlertSettings;
use crate::watchlist::AlertMode;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Unset → in-process ledger store (nothing survives a restart).
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Bearer token for `/api/*` and `/ws`. Unset → auth disabled (dev mode).
    pub api_token: Option<String>,

    // Ledger
    pub default_initial_balance: Decimal,
    pub min_order_value: Option<Decimal>,
    pub trade_max_attempts: u32,
    pub store_timeout_ms: u64,
    pub transactions_page_size: i64,

    // Quotes
    pub alpha_vantage_api_key: Option<String>,
    pub usd_to_inr: Decimal,
    pub quote_cache_ttl_secs: u64,
    pub quote_refresh_secs: u64,
    pub quote_max_age_secs: i64,

    // Watchlist alerts
    pub alert_threshold_pct: Decimal,
    pub alert_mode: AlertMode,
    pub alert_max_notifications: usize,
    pub alert_ttl_secs: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".into(),
            port: 8080,
            api_token: None,
            default_initial_balance: Decimal::from(1_000_000),
            min_order_value: None,
            trade_max_attempts: 3,
            store_timeout_ms: 5_000,
            transactions_page_size: 50,
            alpha_vantage_api_key: None,
            usd_to_inr: Decimal::new(835, 1),
            quote_cache_ttl_secs: 300,
            quote_refresh_secs: 300,
            quote_max_age_secs: 900,
            alert_threshold_pct: Decimal::ONE,
            alert_mode: AlertMode::Cumulative,
            alert_max_notifications: 5,
            alert_ttl_secs: 10,
        }
    }
}

/// Parse `key` if set and non-empty, otherwise use `default`.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        None => Ok(default),
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let min_order_value = env_or("MIN_ORDER_VALUE", Decimal::ZERO)?;

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
            api_token: non_empty("API_TOKEN"),

            default_initial_balance: env_or(
                "DEFAULT_INITIAL_BALANCE",
                defaults.default_initial_balance,
            )?,
            min_order_value: Some(min_order_value).filter(|m| *m > Decimal::ZERO),
            trade_max_attempts: env_or("TRADE_MAX_ATTEMPTS", defaults.trade_max_attempts)?,
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", defaults.store_timeout_ms)?,
            transactions_page_size: env_or(
                "TRANSACTIONS_PAGE_SIZE",
                defaults.transactions_page_size,
            )?,

            alpha_vantage_api_key: non_empty("ALPHA_VANTAGE_API_KEY"),
            usd_to_inr: env_or("USD_TO_INR", defaults.usd_to_inr)?,
            quote_cache_ttl_secs: env_or("QUOTE_CACHE_TTL_SECS", defaults.quote_cache_ttl_secs)?,
            quote_refresh_secs: env_or("QUOTE_REFRESH_SECS", defaults.quote_refresh_secs)?,
            quote_max_age_secs: env_or("QUOTE_MAX_AGE_SECS", defaults.quote_max_age_secs)?,

            alert_threshold_pct: env_or("ALERT_THRESHOLD_PCT", defaults.alert_threshold_pct)?,
            alert_mode: env_or("ALERT_MODE", defaults.alert_mode)?,
            alert_max_notifications: env_or(
                "ALERT_MAX_NOTIFICATIONS",
                defaults.alert_max_notifications,
            )?,
            alert_ttl_secs: env_or("ALERT_TTL_SECS", defaults.alert_ttl_secs)?,
        })
    }

    pub fn trade_policy(&self) -> TradePolicy {
        match self.min_order_value {
            Some(minimum) => TradePolicy::with_min_order_value(minimum),
            None => TradePolicy::default(),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn quote_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.quote_max_age_secs)
    }

    pub fn alert_settings(&self) -> AlertSettings {
        AlertSettings {
            threshold_pct: self.alert_threshold_pct,
            mode: self.alert_mode,
            max_notifications: self.alert_max_notifications,
            ttl: chrono::Duration::seconds(self.alert_ttl_secs),
        }
    }
}
