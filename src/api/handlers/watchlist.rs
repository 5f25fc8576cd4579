use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::auth::AccountId;
use crate::errors::AppError;
use crate::models::{normalize_symbol, Quote, WatchlistEntry};
use crate::AppState;

use super::{ok, ApiResponse};

#[derive(Serialize)]
pub struct WatchedSymbol {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub quote: Option<Quote>,
}

#[derive(Serialize)]
pub struct WatchStatus {
    pub symbol: String,
    pub watched: bool,
    /// Whether this call changed the watchlist.
    pub changed: bool,
}

/// GET /api/watchlist: Watched symbols with their latest quotes.
pub async fn list(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<Json<ApiResponse<Vec<WatchedSymbol>>>, AppError> {
    let entries = state.trading.watchlist(account_id).await?;
    let quotes = state.quotes.snapshot().await;
    let watched = entries
        .into_iter()
        .map(|entry| WatchedSymbol {
            quote: quotes.get(&entry.symbol).cloned(),
            entry,
        })
        .collect();
    Ok(ok(watched))
}

/// GET /api/watchlist/:symbol
pub async fn status(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<WatchStatus>>, AppError> {
    let watched = state.trading.is_watched(account_id, &symbol).await?;
    Ok(ok(WatchStatus {
        symbol: normalize_symbol(&symbol),
        watched,
        changed: false,
    }))
}

/// PUT /api/watchlist/:symbol: Idempotent add.
pub async fn add(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<WatchStatus>>, AppError> {
    let changed = state.trading.add_to_watchlist(account_id, &symbol).await?;
    Ok(ok(WatchStatus {
        symbol: normalize_symbol(&symbol),
        watched: true,
        changed,
    }))
}

/// DELETE /api/watchlist/:symbol
pub async fn remove(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<WatchStatus>>, AppError> {
    let changed = state
        .trading
        .remove_from_watchlist(account_id, &symbol)
        .await?;
    Ok(ok(WatchStatus {
        symbol: normalize_symbol(&symbol),
        watched: false,
        changed,
    }))
}
