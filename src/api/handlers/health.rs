use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.store.ping().await.is_ok();
    let last_refresh = state.quotes.last_refreshed().await;
    let live = state.quotes.is_live().await;

    if store_ok {
        (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "quotes": { "live": live, "last_refreshed": last_refresh },
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "store": "disconnected" })),
        )
    }
}
