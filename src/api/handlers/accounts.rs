use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::api::auth::AccountId;
use crate::errors::AppError;
use crate::models::Wallet;
use crate::AppState;

use super::{ok, ApiResponse};

#[derive(Debug, Default, Deserialize)]
pub struct OpenAccountRequest {
    pub initial_balance: Option<Decimal>,
}

/// POST /api/accounts: Onboard a new account with a starting balance.
pub async fn open(
    State(state): State<AppState>,
    body: Option<Json<OpenAccountRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Wallet>>), AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let wallet = state.trading.open_account(request.initial_balance).await?;
    Ok((StatusCode::CREATED, ok(wallet)))
}

/// GET /api/account: The caller's wallet.
pub async fn wallet(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<Json<ApiResponse<Wallet>>, AppError> {
    Ok(ok(state.trading.wallet(account_id).await?))
}
