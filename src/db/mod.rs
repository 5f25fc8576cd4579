pub mod holding_repo;
pub mod memory_store;
pub mod pg_store;
pub mod transaction_repo;
pub mod wallet_repo;
pub mod watchlist_repo;

pub use memory_store::MemoryLedgerStore;
pub use pg_store::PgLedgerStore;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Holding, NewTransaction, Transaction, Wallet, WatchlistEntry};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    #[error("account {0} not found")]
    AccountNotFound(Uuid),

    /// The wallet changed between planning and committing a trade.
    #[error("wallet version conflict for account {account_id}")]
    VersionConflict { account_id: Uuid },

    #[error("client order id {client_order_id} already recorded")]
    DuplicateOrder { client_order_id: Uuid },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Bound a store call; an elapsed timeout counts as the store being unavailable.
pub async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        StoreError::Unavailable(format!("timed out after {} ms", timeout.as_millis()))
    })?
}

/// Holding-row side of a trade commit.
#[derive(Debug, Clone, PartialEq)]
pub enum HoldingChange {
    Upsert {
        symbol: String,
        name: String,
        quantity: i64,
        avg_price: Decimal,
    },
    Delete { symbol: String },
}

/// Everything one trade writes. Applied entirely or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeCommit {
    pub account_id: Uuid,
    /// Wallet version the trade was planned against.
    pub expected_version: i64,
    pub new_balance: Decimal,
    pub holding: HoldingChange,
    pub transaction: NewTransaction,
}

/// Durable, account-scoped storage for wallets, holdings, the transaction log
/// and watchlists.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_account(&self, initial_balance: Decimal) -> Result<Wallet, StoreError>;

    async fn get_wallet(&self, account_id: Uuid) -> Result<Option<Wallet>, StoreError>;

    async fn list_holdings(&self, account_id: Uuid) -> Result<Vec<Holding>, StoreError>;

    async fn get_holding(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Holding>, StoreError>;

    /// Apply balance, holding and transaction writes as one atomic unit.
    async fn commit_trade(&self, commit: TradeCommit) -> Result<Transaction, StoreError>;

    async fn find_by_client_order_id(
        &self,
        account_id: Uuid,
        client_order_id: Uuid,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Most recent first, at most `limit` rows.
    async fn list_transactions(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// The full log in creation order.
    async fn transaction_log(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError>;

    /// Returns `true` if the symbol was not already present.
    async fn add_to_watchlist(&self, account_id: Uuid, symbol: &str) -> Result<bool, StoreError>;

    /// Returns `true` if the symbol was present.
    async fn remove_from_watchlist(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<bool, StoreError>;

    async fn list_watchlist(&self, account_id: Uuid) -> Result<Vec<WatchlistEntry>, StoreError>;

    /// Watchlist rows across every account.
    async fn watchlist_members(&self) -> Result<Vec<WatchlistEntry>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
