use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use papertrade::config::AppConfig;
use papertrade::db::{LedgerStore, MemoryLedgerStore, StoreError, TradeCommit};
use papertrade::execution::TradeExecutor;
use papertrade::models::{Holding, Quote, Transaction, Wallet, WatchlistEntry};
use papertrade::quotes::{FallbackQuoteSource, QuoteBook, QuoteSource};
use papertrade::services::{TradingService, TradingSettings};
use papertrade::watchlist::AlertHub;
use papertrade::AppState;

/// Config for tests: in-memory store, no auth, no API key.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        store_timeout_ms: 200,
        ..AppConfig::default()
    }
}

#[allow(dead_code)]
pub fn quote(symbol: &str, name: &str, price: Decimal) -> Quote {
    Quote {
        symbol: symbol.into(),
        name: name.into(),
        price,
        change: Decimal::ZERO,
        change_percent: Decimal::ZERO,
        volume: 0,
        is_live: false,
        last_updated: Utc::now(),
    }
}

/// Assemble application state the way `main` does, over the given store.
#[allow(dead_code)]
pub async fn build_state(store: Arc<dyn LedgerStore>, config: AppConfig) -> AppState {
    let quote_source: Arc<dyn QuoteSource> = Arc::new(FallbackQuoteSource);
    let quotes = QuoteBook::new();
    let demo = quote_source
        .get_quotes(&papertrade::quotes::catalog::symbols())
        .await
        .expect("demo quotes");
    quotes.update(demo, Utc::now()).await;

    let alerts = AlertHub::new(config.alert_settings());
    let executor = TradeExecutor::new(store.clone(), config.trade_policy())
        .with_limits(config.trade_max_attempts, config.store_timeout());
    let trading = TradingService::new(
        store.clone(),
        executor,
        quotes.clone(),
        alerts.clone(),
        TradingSettings {
            default_initial_balance: config.default_initial_balance,
            transactions_page_size: config.transactions_page_size,
            quote_max_age: config.quote_max_age(),
        },
    );

    AppState {
        store,
        config,
        trading: Arc::new(trading),
        quotes,
        quote_source,
        alerts,
        metrics_handle: papertrade::metrics::init_metrics(),
    }
}

#[allow(dead_code)]
pub async fn build_test_app() -> (axum::Router, AppState) {
    let state = build_state(Arc::new(MemoryLedgerStore::new()), test_config()).await;
    (papertrade::api::router::create_router(state.clone()), state)
}

#[allow(dead_code)]
pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str, account: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(id) = account {
        builder = builder.header("x-account-id", id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn send(method: &str, uri: &str, account: Option<Uuid>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = account {
        builder = builder.header("x-account-id", id.to_string());
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Ledger store wrapper that injects commit failures.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryLedgerStore,
    fail_commits: Arc<AtomicBool>,
    hang_commits: Arc<AtomicBool>,
    conflicts_remaining: Arc<AtomicU32>,
    pub commit_calls: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every commit reports the store as unavailable.
    pub fn fail_commits(&self, on: bool) {
        self.fail_commits.store(on, Ordering::SeqCst);
    }

    /// Every commit stalls far beyond any store timeout.
    pub fn hang_commits(&self, on: bool) {
        self.hang_commits.store(on, Ordering::SeqCst);
    }

    /// The next `n` commits report a wallet version conflict.
    pub fn conflict_next(&self, n: u32) {
        self.conflicts_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn create_account(&self, initial_balance: Decimal) -> Result<Wallet, StoreError> {
        self.inner.create_account(initial_balance).await
    }

    async fn get_wallet(&self, account_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        self.inner.get_wallet(account_id).await
    }

    async fn list_holdings(&self, account_id: Uuid) -> Result<Vec<Holding>, StoreError> {
        self.inner.list_holdings(account_id).await
    }

    async fn get_holding(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Holding>, StoreError> {
        self.inner.get_holding(account_id, symbol).await
    }

    async fn commit_trade(&self, commit: TradeCommit) -> Result<Transaction, StoreError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset by peer".into()));
        }
        if self.hang_commits.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        let conflict = self
            .conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflict {
            return Err(StoreError::VersionConflict {
                account_id: commit.account_id,
            });
        }
        self.inner.commit_trade(commit).await
    }

    async fn find_by_client_order_id(
        &self,
        account_id: Uuid,
        client_order_id: Uuid,
    ) -> Result<Option<Transaction>, StoreError> {
        self.inner
            .find_by_client_order_id(account_id, client_order_id)
            .await
    }

    async fn list_transactions(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.inner.list_transactions(account_id, limit).await
    }

    async fn transaction_log(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        self.inner.transaction_log(account_id).await
    }

    async fn add_to_watchlist(&self, account_id: Uuid, symbol: &str) -> Result<bool, StoreError> {
        self.inner.add_to_watchlist(account_id, symbol).await
    }

    async fn remove_from_watchlist(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<bool, StoreError> {
        self.inner.remove_from_watchlist(account_id, symbol).await
    }

    async fn list_watchlist(&self, account_id: Uuid) -> Result<Vec<WatchlistEntry>, StoreError> {
        self.inner.list_watchlist(account_id).await
    }

    async fn watchlist_members(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        self.inner.watchlist_members().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}
