use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::auth::AccountId;
use crate::errors::AppError;
use crate::models::Transaction;
use crate::AppState;

use super::{ok, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: i64,
    /// Price the user confirmed. Falls back to the latest quote when absent.
    pub price: Option<Decimal>,
    /// Idempotency key for safe retries.
    pub client_order_id: Option<Uuid>,
}

fn parse(body: Result<Json<TradeRequest>, JsonRejection>) -> Result<TradeRequest, AppError> {
    body.map(|Json(req)| req)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// POST /api/trades/buy
pub async fn buy(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    body: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let req = parse(body)?;
    let tx = state
        .trading
        .buy_stock(account_id, &req.symbol, req.quantity, req.price, req.client_order_id)
        .await?;
    Ok(ok(tx))
}

/// POST /api/trades/sell
pub async fn sell(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    body: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let req = parse(body)?;
    let tx = state
        .trading
        .sell_stock(account_id, &req.symbol, req.quantity, req.price, req.client_order_id)
        .await?;
    Ok(ok(tx))
}
