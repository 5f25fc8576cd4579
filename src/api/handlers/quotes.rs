use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::execution::TradeError;
use crate::models::{normalize_symbol, PricePoint, Quote};
use crate::quotes::QuoteError;
use crate::AppState;

use super::{ok, ApiResponse};

#[derive(Serialize)]
pub struct QuoteBoard {
    pub quotes: Vec<Quote>,
    pub is_live: bool,
    pub last_refreshed: Option<DateTime<Utc>>,
}

/// GET /api/quotes: Latest known quote for every symbol.
pub async fn list(State(state): State<AppState>) -> Json<ApiResponse<QuoteBoard>> {
    ok(QuoteBoard {
        quotes: state.quotes.all().await,
        is_live: state.quotes.is_live().await,
        last_refreshed: state.quotes.last_refreshed().await,
    })
}

/// GET /api/quotes/:symbol/history: Daily closes, oldest first.
pub async fn history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<Vec<PricePoint>>>, AppError> {
    let symbol = normalize_symbol(&symbol);
    match state.quote_source.get_history(&symbol).await {
        Ok(points) => Ok(ok(points)),
        Err(QuoteError::UnknownSymbol(s)) => Err(TradeError::UnknownSymbol(s).into()),
        Err(e) => Err(AppError::Internal(e.into())),
    }
}
