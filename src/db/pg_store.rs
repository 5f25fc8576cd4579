use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Holding, Transaction, Wallet, WatchlistEntry};

use super::{
    holding_repo, transaction_repo, wallet_repo, watchlist_repo, HoldingChange, LedgerStore,
    StoreError, TradeCommit,
};

/// Postgres-backed ledger store.
///
/// A trade commit runs inside one SQL transaction. If the future is dropped
/// before `commit()`, sqlx rolls the transaction back, so cancellation cannot
/// leave a debited wallet without its holding and log rows.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn create_account(&self, initial_balance: Decimal) -> Result<Wallet, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallet_repo::insert_wallet(&mut conn, Uuid::new_v4(), initial_balance).await?;
        Ok(wallet)
    }

    async fn get_wallet(&self, account_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallet_repo::get_wallet(&mut conn, account_id).await?)
    }

    async fn list_holdings(&self, account_id: Uuid) -> Result<Vec<Holding>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(holding_repo::get_holdings(&mut conn, account_id).await?)
    }

    async fn get_holding(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Holding>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(holding_repo::get_holding(&mut conn, account_id, symbol).await?)
    }

    async fn commit_trade(&self, commit: TradeCommit) -> Result<Transaction, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = wallet_repo::update_balance_if_version(
            &mut tx,
            commit.account_id,
            commit.expected_version,
            commit.new_balance,
        )
        .await?;

        if !updated {
            let exists = wallet_repo::get_wallet(&mut tx, commit.account_id)
                .await?
                .is_some();
            tx.rollback().await?;
            return Err(if exists {
                StoreError::VersionConflict {
                    account_id: commit.account_id,
                }
            } else {
                StoreError::AccountNotFound(commit.account_id)
            });
        }

        match &commit.holding {
            HoldingChange::Upsert {
                symbol,
                name,
                quantity,
                avg_price,
            } => {
                holding_repo::upsert_holding(
                    &mut tx,
                    commit.account_id,
                    symbol,
                    name,
                    *quantity,
                    *avg_price,
                )
                .await?;
            }
            HoldingChange::Delete { symbol } => {
                holding_repo::delete_holding(&mut tx, commit.account_id, symbol).await?;
            }
        }

        let recorded = match transaction_repo::insert_transaction(&mut tx, &commit.transaction).await
        {
            Ok(t) => t,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Err(StoreError::DuplicateOrder {
                    client_order_id: commit.transaction.client_order_id.unwrap_or_default(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        tracing::debug!(
            account_id = %commit.account_id,
            transaction_id = recorded.id,
            new_balance = %commit.new_balance,
            "Trade committed"
        );

        Ok(recorded)
    }

    async fn find_by_client_order_id(
        &self,
        account_id: Uuid,
        client_order_id: Uuid,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transaction_repo::get_by_client_order_id(&mut conn, account_id, client_order_id).await?)
    }

    async fn list_transactions(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transaction_repo::get_recent(&mut conn, account_id, limit).await?)
    }

    async fn transaction_log(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transaction_repo::get_log(&mut conn, account_id).await?)
    }

    async fn add_to_watchlist(&self, account_id: Uuid, symbol: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        match watchlist_repo::add_symbol(&mut conn, account_id, symbol).await {
            Ok(added) => Ok(added),
            Err(e) if is_foreign_key_violation(&e) => Err(StoreError::AccountNotFound(account_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_from_watchlist(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(watchlist_repo::remove_symbol(&mut conn, account_id, symbol).await?)
    }

    async fn list_watchlist(&self, account_id: Uuid) -> Result<Vec<WatchlistEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(watchlist_repo::get_watchlist(&mut conn, account_id).await?)
    }

    async fn watchlist_members(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(watchlist_repo::get_all_entries(&mut conn).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
