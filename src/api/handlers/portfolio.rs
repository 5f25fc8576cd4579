use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::auth::AccountId;
use crate::errors::AppError;
use crate::models::Transaction;
use crate::valuation::{HoldingValuation, PortfolioSummary, PortfolioValuation, RealizedPnlReport};
use crate::AppState;

use super::{ok, ApiResponse};

/// GET /api/holdings: Every holding valued against the latest quotes.
pub async fn holdings(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<Json<ApiResponse<PortfolioValuation>>, AppError> {
    Ok(ok(state.trading.holdings(account_id).await?))
}

/// GET /api/holdings/:symbol
pub async fn holding(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<HoldingValuation>>, AppError> {
    state
        .trading
        .get_holding(account_id, &symbol)
        .await?
        .map(ok)
        .ok_or_else(|| AppError::NotFound(format!("no holding for {}", symbol.to_uppercase())))
}

/// GET /api/portfolio/summary
pub async fn summary(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<Json<ApiResponse<PortfolioSummary>>, AppError> {
    Ok(ok(state.trading.portfolio_summary(account_id).await?))
}

/// GET /api/portfolio/realized: Realized gains replayed from the trade log.
pub async fn realized(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<Json<ApiResponse<RealizedPnlReport>>, AppError> {
    Ok(ok(state.trading.realized_pnl(account_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

/// GET /api/transactions?limit=: Most recent first.
pub async fn transactions(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    Ok(ok(state.trading.transactions(account_id, query.limit).await?))
}
