use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::execution::{TradeError, TradeErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Numbers a client needs to correct a rejected trade.
fn trade_details(e: &TradeError) -> Option<Value> {
    match e {
        TradeError::InsufficientFunds {
            required,
            available,
            shortfall,
        } => Some(json!({
            "required": required,
            "available": available,
            "shortfall": shortfall,
        })),
        TradeError::BelowMinimumInvestment {
            order_value,
            minimum,
            min_quantity,
        } => Some(json!({
            "order_value": order_value,
            "minimum": minimum,
            "min_quantity": min_quantity,
        })),
        TradeError::InsufficientShares {
            symbol,
            requested,
            available,
        } => Some(json!({
            "symbol": symbol,
            "requested": requested,
            "available": available,
        })),
        TradeError::InvalidInitialBalance { amount, min, max } => Some(json!({
            "amount": amount,
            "min": min,
            "max": max,
        })),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".into(),
                None,
            ),
            AppError::Trade(e) => match e.kind() {
                TradeErrorKind::Validation => {
                    (StatusCode::BAD_REQUEST, e.code(), e.to_string(), trade_details(e))
                }
                TradeErrorKind::BusinessRule => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    e.code(),
                    e.to_string(),
                    trade_details(e),
                ),
                TradeErrorKind::Authentication => {
                    (StatusCode::UNAUTHORIZED, e.code(), e.to_string(), None)
                }
                TradeErrorKind::Store => {
                    tracing::error!("Ledger store error: {e}");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        e.code(),
                        "Service temporarily unavailable, please try again".into(),
                        None,
                    )
                }
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".into(),
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
                code,
                details,
            }),
        )
            .into_response()
    }
}
