use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Holding, Transaction, Wallet, WatchlistEntry};

use super::{HoldingChange, LedgerStore, StoreError, TradeCommit};

/// Process-local ledger store.
///
/// Used when no `DATABASE_URL` is configured and throughout the test suite.
/// A trade commit is validated and applied under one lock acquisition with no
/// suspension point in between, so readers never observe a partial trade.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    wallets: HashMap<Uuid, Wallet>,
    holdings: HashMap<Uuid, BTreeMap<String, Holding>>,
    /// Per-account log in creation order.
    transactions: HashMap<Uuid, Vec<Transaction>>,
    watchlists: HashMap<Uuid, Vec<WatchlistEntry>>,
    last_transaction_id: i64,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn create_account(&self, initial_balance: Decimal) -> Result<Wallet, StoreError> {
        let now = Utc::now();
        let wallet = Wallet {
            account_id: Uuid::new_v4(),
            balance: initial_balance,
            initial_balance,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.lock().await;
        inner.wallets.insert(wallet.account_id, wallet.clone());
        Ok(wallet)
    }

    async fn get_wallet(&self, account_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.wallets.get(&account_id).cloned())
    }

    async fn list_holdings(&self, account_id: Uuid) -> Result<Vec<Holding>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .holdings
            .get(&account_id)
            .map(|h| h.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_holding(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Holding>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .holdings
            .get(&account_id)
            .and_then(|h| h.get(symbol))
            .cloned())
    }

    async fn commit_trade(&self, commit: TradeCommit) -> Result<Transaction, StoreError> {
        let mut inner = self.inner.lock().await;

        // Validate everything before the first mutation.
        let wallet = inner
            .wallets
            .get(&commit.account_id)
            .ok_or(StoreError::AccountNotFound(commit.account_id))?;
        if wallet.version != commit.expected_version {
            return Err(StoreError::VersionConflict {
                account_id: commit.account_id,
            });
        }
        if commit.new_balance < Decimal::ZERO {
            return Err(StoreError::Unavailable(
                "wallet balance constraint violated".into(),
            ));
        }
        if let Some(client_order_id) = commit.transaction.client_order_id {
            let duplicate = inner
                .transactions
                .get(&commit.account_id)
                .is_some_and(|log| {
                    log.iter()
                        .any(|t| t.client_order_id == Some(client_order_id))
                });
            if duplicate {
                return Err(StoreError::DuplicateOrder { client_order_id });
            }
        }

        let now = Utc::now();

        if let Some(wallet) = inner.wallets.get_mut(&commit.account_id) {
            wallet.balance = commit.new_balance;
            wallet.version += 1;
            wallet.updated_at = now;
        }

        let holdings = inner.holdings.entry(commit.account_id).or_default();
        match commit.holding {
            HoldingChange::Upsert {
                symbol,
                name,
                quantity,
                avg_price,
            } => {
                holdings.insert(
                    symbol.clone(),
                    Holding {
                        account_id: commit.account_id,
                        symbol,
                        name,
                        quantity,
                        avg_price,
                        updated_at: now,
                    },
                );
            }
            HoldingChange::Delete { symbol } => {
                holdings.remove(&symbol);
            }
        }

        inner.last_transaction_id += 1;
        let tx = commit
            .transaction
            .into_transaction(inner.last_transaction_id, now);
        inner
            .transactions
            .entry(commit.account_id)
            .or_default()
            .push(tx.clone());

        Ok(tx)
    }

    async fn find_by_client_order_id(
        &self,
        account_id: Uuid,
        client_order_id: Uuid,
    ) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.transactions.get(&account_id).and_then(|log| {
            log.iter()
                .find(|t| t.client_order_id == Some(client_order_id))
                .cloned()
        }))
    }

    async fn list_transactions(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.lock().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(0);
        Ok(inner
            .transactions
            .get(&account_id)
            .map(|log| log.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn transaction_log(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .get(&account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_to_watchlist(&self, account_id: Uuid, symbol: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.wallets.contains_key(&account_id) {
            return Err(StoreError::AccountNotFound(account_id));
        }

        let entries = inner.watchlists.entry(account_id).or_default();
        if entries.iter().any(|e| e.symbol == symbol) {
            return Ok(false);
        }
        entries.push(WatchlistEntry {
            account_id,
            symbol: symbol.to_string(),
            added_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove_from_watchlist(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(entries) = inner.watchlists.get_mut(&account_id) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|e| e.symbol != symbol);
        Ok(entries.len() != before)
    }

    async fn list_watchlist(&self, account_id: Uuid) -> Result<Vec<WatchlistEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .watchlists
            .get(&account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn watchlist_members(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.watchlists.values().flatten().cloned().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
