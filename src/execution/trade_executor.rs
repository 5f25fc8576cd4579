use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{with_timeout, HoldingChange, LedgerStore, StoreError, TradeCommit};
use crate::models::{Holding, NewTransaction, Side, Transaction, Wallet};

use super::policy::{check_minimum_investment, TradePolicy};

/// Fractional digits kept when the weighted average cost is recomputed.
pub const AVG_PRICE_DP: u32 = 8;

/// Accepted per-share price band for orders.
pub const MIN_ORDER_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
pub const MAX_ORDER_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Smallest positive average cost representable at `AVG_PRICE_DP`.
const MIN_AVG_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, AVG_PRICE_DP);

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("quantity must be a positive whole number, got {0}")]
    InvalidQuantity(i64),

    #[error("price must be between {min} and {max}, got {0}", min = MIN_ORDER_PRICE, max = MAX_ORDER_PRICE)]
    InvalidPrice(Decimal),

    #[error("client order id {client_order_id} was already used for a different order")]
    ClientOrderIdReused { client_order_id: Uuid },

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("insufficient funds: order costs {required}, available balance {available} (short by {shortfall})")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("order value {order_value} is below the minimum investment of {minimum}; buy at least {min_quantity} shares")]
    BelowMinimumInvestment {
        order_value: Decimal,
        minimum: Decimal,
        min_quantity: i64,
    },

    #[error("insufficient shares of {symbol}: requested {requested}, available {available}")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        available: i64,
    },

    #[error("no holding for {0}")]
    NoSuchHolding(String),

    #[error("starting balance {amount} must be between {min} and {max}")]
    InvalidInitialBalance {
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("not authenticated")]
    NotAuthenticated,

    /// Persistence failed or timed out. The caller may retry with the same
    /// client order id, or re-read state first.
    #[error("ledger store unavailable: {0}")]
    StoreUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeErrorKind {
    Validation,
    BusinessRule,
    Authentication,
    Store,
}

impl TradeError {
    pub fn kind(&self) -> TradeErrorKind {
        match self {
            TradeError::InvalidQuantity(_)
            | TradeError::InvalidPrice(_)
            | TradeError::UnknownSymbol(_)
            | TradeError::ClientOrderIdReused { .. }
            | TradeError::InvalidInitialBalance { .. } => TradeErrorKind::Validation,
            TradeError::InsufficientFunds { .. }
            | TradeError::BelowMinimumInvestment { .. }
            | TradeError::InsufficientShares { .. }
            | TradeError::NoSuchHolding(_) => TradeErrorKind::BusinessRule,
            TradeError::NotAuthenticated => TradeErrorKind::Authentication,
            TradeError::StoreUnavailable(_) => TradeErrorKind::Store,
        }
    }

    /// Stable machine-readable identifier.
    pub fn code(&self) -> &'static str {
        match self {
            TradeError::InvalidQuantity(_) => "invalid_quantity",
            TradeError::InvalidPrice(_) => "invalid_price",
            TradeError::UnknownSymbol(_) => "unknown_symbol",
            TradeError::ClientOrderIdReused { .. } => "client_order_id_reused",
            TradeError::InsufficientFunds { .. } => "insufficient_funds",
            TradeError::BelowMinimumInvestment { .. } => "below_minimum_investment",
            TradeError::InsufficientShares { .. } => "insufficient_shares",
            TradeError::NoSuchHolding(_) => "no_such_holding",
            TradeError::InvalidInitialBalance { .. } => "invalid_initial_balance",
            TradeError::NotAuthenticated => "not_authenticated",
            TradeError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<StoreError> for TradeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AccountNotFound(_) => TradeError::NotAuthenticated,
            other => TradeError::StoreUnavailable(other.to_string()),
        }
    }
}

/// A buy or sell request at the price the user confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOrder {
    pub account_id: Uuid,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
    /// Idempotency key. A repeated id returns the original transaction.
    pub client_order_id: Option<Uuid>,
}

/// Reject malformed orders before the store is touched. Returns the order value.
fn validate_order(order: &TradeOrder) -> Result<Decimal, TradeError> {
    if order.quantity <= 0 {
        return Err(TradeError::InvalidQuantity(order.quantity));
    }
    if order.price < MIN_ORDER_PRICE || order.price > MAX_ORDER_PRICE {
        return Err(TradeError::InvalidPrice(order.price));
    }
    if order.symbol.trim().is_empty() {
        return Err(TradeError::UnknownSymbol(order.symbol.clone()));
    }

    order
        .price
        .checked_mul(Decimal::from(order.quantity))
        .ok_or(TradeError::InvalidQuantity(order.quantity))
}

/// Cost basis spread over `quantity`, rounded to `AVG_PRICE_DP` and never
/// rounded down to zero.
pub fn weighted_average(cost_basis: Decimal, quantity: i64) -> Option<Decimal> {
    if quantity <= 0 || cost_basis <= Decimal::ZERO {
        return None;
    }
    let avg = cost_basis
        .checked_div(Decimal::from(quantity))?
        .round_dp(AVG_PRICE_DP);
    Some(avg.max(MIN_AVG_PRICE))
}

/// A recorded transaction replayed under the same client order id must
/// describe the same order.
fn same_order(recorded: &Transaction, side: Side, order: &TradeOrder) -> bool {
    recorded.side == side && recorded.symbol == order.symbol && recorded.quantity == order.quantity
}

fn new_transaction(order: &TradeOrder, side: Side, total: Decimal) -> NewTransaction {
    NewTransaction {
        account_id: order.account_id,
        client_order_id: order.client_order_id,
        side,
        symbol: order.symbol.clone(),
        name: order.name.clone(),
        quantity: order.quantity,
        price: order.price,
        total,
    }
}

/// Plan a buy against a wallet snapshot and the current holding (if any).
///
/// Pure: computes the commit without touching the store.
pub fn plan_buy(
    wallet: &Wallet,
    existing: Option<&Holding>,
    order: &TradeOrder,
    policy: &TradePolicy,
) -> Result<TradeCommit, TradeError> {
    let total_cost = validate_order(order)?;

    if total_cost > wallet.balance {
        return Err(TradeError::InsufficientFunds {
            required: total_cost,
            available: wallet.balance,
            shortfall: total_cost - wallet.balance,
        });
    }

    check_minimum_investment(total_cost, order.price, policy)?;

    let (quantity, avg_price, name) = match existing {
        Some(h) => {
            let new_quantity = h
                .quantity
                .checked_add(order.quantity)
                .ok_or(TradeError::InvalidQuantity(order.quantity))?;
            let cost_basis = h
                .avg_price
                .checked_mul(Decimal::from(h.quantity))
                .and_then(|c| c.checked_add(total_cost))
                .ok_or(TradeError::InvalidQuantity(order.quantity))?;
            let new_avg = weighted_average(cost_basis, new_quantity)
                .ok_or(TradeError::InvalidQuantity(order.quantity))?;
            (new_quantity, new_avg, h.name.clone())
        }
        None => (order.quantity, order.price, order.name.clone()),
    };

    Ok(TradeCommit {
        account_id: wallet.account_id,
        expected_version: wallet.version,
        new_balance: wallet.balance - total_cost,
        holding: HoldingChange::Upsert {
            symbol: order.symbol.clone(),
            name,
            quantity,
            avg_price,
        },
        transaction: new_transaction(order, Side::Buy, total_cost),
    })
}

/// Plan a sell. Proceeds use the order price; `avg_price` is left unchanged.
pub fn plan_sell(
    wallet: &Wallet,
    existing: Option<&Holding>,
    order: &TradeOrder,
) -> Result<TradeCommit, TradeError> {
    let sell_value = validate_order(order)?;

    let holding = existing.ok_or_else(|| TradeError::NoSuchHolding(order.symbol.clone()))?;
    if holding.quantity < order.quantity {
        return Err(TradeError::InsufficientShares {
            symbol: order.symbol.clone(),
            requested: order.quantity,
            available: holding.quantity,
        });
    }

    let holding_change = if holding.quantity == order.quantity {
        HoldingChange::Delete {
            symbol: order.symbol.clone(),
        }
    } else {
        HoldingChange::Upsert {
            symbol: order.symbol.clone(),
            name: holding.name.clone(),
            quantity: holding.quantity - order.quantity,
            avg_price: holding.avg_price,
        }
    };

    let new_balance = wallet
        .balance
        .checked_add(sell_value)
        .ok_or(TradeError::InvalidQuantity(order.quantity))?;

    // Record under the name the position was opened with.
    let mut order = order.clone();
    order.name = holding.name.clone();

    Ok(TradeCommit {
        account_id: wallet.account_id,
        expected_version: wallet.version,
        new_balance,
        holding: holding_change,
        transaction: new_transaction(&order, Side::Sell, sell_value),
    })
}

/// Validates and applies buy/sell orders against a ledger store.
///
/// Each trade is planned against a wallet snapshot and committed as one unit
/// guarded by the wallet version. A conflicting concurrent write triggers a
/// re-read and re-plan, up to `max_attempts`.
#[derive(Clone)]
pub struct TradeExecutor {
    store: Arc<dyn LedgerStore>,
    policy: TradePolicy,
    max_attempts: u32,
    store_timeout: Duration,
}

impl TradeExecutor {
    pub fn new(store: Arc<dyn LedgerStore>, policy: TradePolicy) -> Self {
        Self {
            store,
            policy,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, max_attempts: u32, store_timeout: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.store_timeout = store_timeout;
        self
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub async fn buy(&self, order: TradeOrder) -> Result<Transaction, TradeError> {
        self.execute(Side::Buy, order).await
    }

    pub async fn sell(&self, order: TradeOrder) -> Result<Transaction, TradeError> {
        self.execute(Side::Sell, order).await
    }

    async fn execute(&self, side: Side, order: TradeOrder) -> Result<Transaction, TradeError> {
        let result = self.try_execute(side, &order).await;

        match &result {
            Ok(tx) => {
                counter!("trades_executed_total", "side" => side.as_str()).increment(1);
                tracing::info!(
                    account_id = %order.account_id,
                    transaction_id = tx.id,
                    side = %side,
                    symbol = %order.symbol,
                    quantity = order.quantity,
                    price = %order.price,
                    total = %tx.total,
                    "Trade executed"
                );
            }
            Err(e) => {
                counter!("trades_rejected_total", "reason" => e.code()).increment(1);
                match e.kind() {
                    TradeErrorKind::Store => tracing::error!(
                        account_id = %order.account_id,
                        side = %side,
                        symbol = %order.symbol,
                        error = %e,
                        "Trade failed: ledger store error"
                    ),
                    _ => tracing::info!(
                        account_id = %order.account_id,
                        side = %side,
                        symbol = %order.symbol,
                        reason = e.code(),
                        "Trade rejected"
                    ),
                }
            }
        }

        result
    }

    async fn try_execute(&self, side: Side, order: &TradeOrder) -> Result<Transaction, TradeError> {
        validate_order(order)?;

        if let Some(client_order_id) = order.client_order_id {
            if let Some(existing) = self
                .bounded(
                    self.store
                        .find_by_client_order_id(order.account_id, client_order_id),
                )
                .await?
            {
                return replayed(existing, side, order, client_order_id);
            }
        }

        for attempt in 1..=self.max_attempts {
            let wallet = self
                .bounded(self.store.get_wallet(order.account_id))
                .await?
                .ok_or(TradeError::NotAuthenticated)?;
            let holding = self
                .bounded(self.store.get_holding(order.account_id, &order.symbol))
                .await?;

            let commit = match side {
                Side::Buy => plan_buy(&wallet, holding.as_ref(), order, &self.policy)?,
                Side::Sell => plan_sell(&wallet, holding.as_ref(), order)?,
            };

            match self.bounded(self.store.commit_trade(commit)).await {
                Ok(tx) => return Ok(tx),
                Err(StoreError::VersionConflict { account_id }) => {
                    tracing::warn!(
                        account_id = %account_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Wallet changed while trading, re-planning"
                    );
                }
                Err(StoreError::DuplicateOrder { client_order_id }) => {
                    let existing = self
                        .bounded(
                            self.store
                                .find_by_client_order_id(order.account_id, client_order_id),
                        )
                        .await?
                        .ok_or_else(|| {
                            TradeError::StoreUnavailable(
                                "duplicate order reported but not found".into(),
                            )
                        })?;
                    return replayed(existing, side, order, client_order_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TradeError::StoreUnavailable(format!(
            "wallet kept changing; gave up after {} attempts",
            self.max_attempts
        )))
    }

    /// Bound a store call by the configured timeout.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        with_timeout(self.store_timeout, fut).await
    }
}

fn replayed(
    existing: Transaction,
    side: Side,
    order: &TradeOrder,
    client_order_id: Uuid,
) -> Result<Transaction, TradeError> {
    if !same_order(&existing, side, order) {
        return Err(TradeError::ClientOrderIdReused { client_order_id });
    }
    tracing::info!(
        account_id = %order.account_id,
        client_order_id = %client_order_id,
        transaction_id = existing.id,
        "Replayed order already executed, returning recorded transaction"
    );
    Ok(existing)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
