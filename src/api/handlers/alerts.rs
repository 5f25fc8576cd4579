use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::api::auth::AccountId;
use crate::errors::AppError;
use crate::models::Notification;
use crate::AppState;

use super::{ok, ApiResponse};

/// GET /api/alerts: Unexpired notifications, newest first.
pub async fn list(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<Json<ApiResponse<Vec<Notification>>>, AppError> {
    state.trading.wallet(account_id).await?;
    Ok(ok(state.alerts.notifications(account_id, Utc::now()).await))
}

/// DELETE /api/alerts/:id
pub async fn dismiss(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    if state.alerts.dismiss(account_id, id).await {
        Ok(ok(id))
    } else {
        Err(AppError::NotFound(format!("notification {id}")))
    }
}
