use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::{with_timeout, LedgerStore, StoreError};
use crate::execution::{TradeError, TradeExecutor, TradeOrder};
use crate::models::{normalize_symbol, Transaction, Wallet, WatchlistEntry};
use crate::quotes::{catalog, QuoteBook};
use crate::valuation::{
    realized_pnl, summarize, value_holding, value_portfolio, HoldingValuation, PortfolioSummary,
    PortfolioValuation, RealizedPnlReport,
};
use crate::watchlist::AlertHub;

pub const MIN_INITIAL_BALANCE: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);
pub const MAX_INITIAL_BALANCE: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
pub const MAX_TRANSACTIONS_PAGE: i64 = 500;

#[derive(Debug, Clone)]
pub struct TradingSettings {
    pub default_initial_balance: Decimal,
    pub transactions_page_size: i64,
    pub quote_max_age: chrono::Duration,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            default_initial_balance: Decimal::from(1_000_000),
            transactions_page_size: 50,
            quote_max_age: chrono::Duration::minutes(15),
        }
    }
}

/// Account-scoped entry point used by the HTTP layer.
///
/// Resolves symbols and prices against the quote book, delegates trades to the
/// executor and values holdings on read.
#[derive(Clone)]
pub struct TradingService {
    store: Arc<dyn LedgerStore>,
    executor: TradeExecutor,
    quotes: QuoteBook,
    alerts: AlertHub,
    settings: TradingSettings,
}

impl TradingService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        executor: TradeExecutor,
        quotes: QuoteBook,
        alerts: AlertHub,
        settings: TradingSettings,
    ) -> Self {
        Self {
            store,
            executor,
            quotes,
            alerts,
            settings,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, TradeError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        Ok(with_timeout(self.executor.store_timeout(), fut).await?)
    }

    async fn require_wallet(&self, account_id: Uuid) -> Result<Wallet, TradeError> {
        self.bounded(self.store.get_wallet(account_id))
            .await?
            .ok_or(TradeError::NotAuthenticated)
    }

    /// A symbol is tradable if it is in the catalog or has a quote on the book.
    async fn resolve_symbol(&self, raw: &str) -> Result<String, TradeError> {
        let symbol = normalize_symbol(raw);
        if symbol.is_empty() {
            return Err(TradeError::UnknownSymbol(raw.to_string()));
        }
        if catalog::lookup(&symbol).is_some() || self.quotes.get(&symbol).await.is_some() {
            Ok(symbol)
        } else {
            Err(TradeError::UnknownSymbol(symbol))
        }
    }

    pub async fn open_account(&self, initial_balance: Option<Decimal>) -> Result<Wallet, TradeError> {
        let amount = initial_balance.unwrap_or(self.settings.default_initial_balance);
        if amount < MIN_INITIAL_BALANCE || amount > MAX_INITIAL_BALANCE {
            return Err(TradeError::InvalidInitialBalance {
                amount,
                min: MIN_INITIAL_BALANCE,
                max: MAX_INITIAL_BALANCE,
            });
        }

        let wallet = self.bounded(self.store.create_account(amount)).await?;
        tracing::info!(account_id = %wallet.account_id, initial_balance = %amount, "Account opened");
        Ok(wallet)
    }

    pub async fn wallet(&self, account_id: Uuid) -> Result<Wallet, TradeError> {
        self.require_wallet(account_id).await
    }

    /// Build an order at the confirmed price, or the book price when none was given.
    async fn order(
        &self,
        account_id: Uuid,
        symbol: &str,
        quantity: i64,
        price: Option<Decimal>,
        client_order_id: Option<Uuid>,
    ) -> Result<TradeOrder, TradeError> {
        let symbol = self.resolve_symbol(symbol).await?;
        let quote = self.quotes.get(&symbol).await;

        let price = match (price, &quote) {
            (Some(p), _) => p,
            (None, Some(q)) => q.price,
            (None, None) => return Err(TradeError::UnknownSymbol(symbol)),
        };
        let name = quote
            .map(|q| q.name)
            .or_else(|| catalog::lookup(&symbol).map(|s| s.name.to_string()))
            .unwrap_or_else(|| symbol.clone());

        Ok(TradeOrder {
            account_id,
            symbol,
            name,
            quantity,
            price,
            client_order_id,
        })
    }

    pub async fn buy_stock(
        &self,
        account_id: Uuid,
        symbol: &str,
        quantity: i64,
        price: Option<Decimal>,
        client_order_id: Option<Uuid>,
    ) -> Result<Transaction, TradeError> {
        let order = self
            .order(account_id, symbol, quantity, price, client_order_id)
            .await?;
        self.executor.buy(order).await
    }

    pub async fn sell_stock(
        &self,
        account_id: Uuid,
        symbol: &str,
        quantity: i64,
        price: Option<Decimal>,
        client_order_id: Option<Uuid>,
    ) -> Result<Transaction, TradeError> {
        let order = self
            .order(account_id, symbol, quantity, price, client_order_id)
            .await?;
        self.executor.sell(order).await
    }

    pub async fn get_holding(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<HoldingValuation>, TradeError> {
        self.require_wallet(account_id).await?;
        let symbol = normalize_symbol(symbol);
        let Some(holding) = self.bounded(self.store.get_holding(account_id, &symbol)).await? else {
            return Ok(None);
        };

        let quote = self.quotes.get(&symbol).await;
        Ok(Some(value_holding(
            &holding,
            quote.as_ref(),
            Utc::now(),
            self.settings.quote_max_age,
        )))
    }

    pub async fn holdings(&self, account_id: Uuid) -> Result<PortfolioValuation, TradeError> {
        self.require_wallet(account_id).await?;
        self.valuation(account_id).await
    }

    async fn valuation(&self, account_id: Uuid) -> Result<PortfolioValuation, TradeError> {
        let holdings = self.bounded(self.store.list_holdings(account_id)).await?;
        let quotes = self.quotes.snapshot().await;
        Ok(value_portfolio(
            &holdings,
            &quotes,
            Utc::now(),
            self.settings.quote_max_age,
        ))
    }

    pub async fn portfolio_summary(&self, account_id: Uuid) -> Result<PortfolioSummary, TradeError> {
        let wallet = self.require_wallet(account_id).await?;
        let valuation = self.valuation(account_id).await?;
        Ok(summarize(&wallet, &valuation))
    }

    /// Most recent first. `limit` is clamped to `1..=500`.
    pub async fn transactions(
        &self,
        account_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Transaction>, TradeError> {
        self.require_wallet(account_id).await?;
        let limit = limit
            .unwrap_or(self.settings.transactions_page_size)
            .clamp(1, MAX_TRANSACTIONS_PAGE);
        self.bounded(self.store.list_transactions(account_id, limit)).await
    }

    pub async fn realized_pnl(&self, account_id: Uuid) -> Result<RealizedPnlReport, TradeError> {
        self.require_wallet(account_id).await?;
        let log = self.bounded(self.store.transaction_log(account_id)).await?;
        Ok(realized_pnl(&log))
    }

    /// Returns `true` if the symbol was newly added.
    pub async fn add_to_watchlist(&self, account_id: Uuid, symbol: &str) -> Result<bool, TradeError> {
        self.require_wallet(account_id).await?;
        let symbol = self.resolve_symbol(symbol).await?;
        let added = self
            .bounded(self.store.add_to_watchlist(account_id, &symbol))
            .await?;
        if added {
            tracing::info!(account_id = %account_id, symbol = %symbol, "Added to watchlist");
        }
        Ok(added)
    }

    /// Returns `true` if the symbol was on the watchlist.
    pub async fn remove_from_watchlist(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<bool, TradeError> {
        self.require_wallet(account_id).await?;
        let symbol = normalize_symbol(symbol);
        let removed = self
            .bounded(self.store.remove_from_watchlist(account_id, &symbol))
            .await?;
        self.alerts.forget(account_id, &symbol).await;
        if removed {
            tracing::info!(account_id = %account_id, symbol = %symbol, "Removed from watchlist");
        }
        Ok(removed)
    }

    pub async fn is_watched(&self, account_id: Uuid, symbol: &str) -> Result<bool, TradeError> {
        let symbol = normalize_symbol(symbol);
        Ok(self
            .watchlist(account_id)
            .await?
            .iter()
            .any(|e| e.symbol == symbol))
    }

    pub async fn watchlist(&self, account_id: Uuid) -> Result<Vec<WatchlistEntry>, TradeError> {
        self.require_wallet(account_id).await?;
        self.bounded(self.store.list_watchlist(account_id)).await
    }
}
