use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes: require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Accounts
        .route("/api/accounts", post(handlers::accounts::open))
        .route("/api/account", get(handlers::accounts::wallet))
        // Trades
        .route("/api/trades/buy", post(handlers::trades::buy))
        .route("/api/trades/sell", post(handlers::trades::sell))
        // Portfolio
        .route("/api/holdings", get(handlers::portfolio::holdings))
        .route("/api/holdings/:symbol", get(handlers::portfolio::holding))
        .route("/api/portfolio/summary", get(handlers::portfolio::summary))
        .route("/api/portfolio/realized", get(handlers::portfolio::realized))
        .route("/api/transactions", get(handlers::portfolio::transactions))
        // Watchlist
        .route("/api/watchlist", get(handlers::watchlist::list))
        .route(
            "/api/watchlist/:symbol",
            get(handlers::watchlist::status)
                .put(handlers::watchlist::add)
                .delete(handlers::watchlist::remove),
        )
        // Alerts
        .route("/api/alerts", get(handlers::alerts::list))
        .route("/api/alerts/:id", delete(handlers::alerts::dismiss))
        // Quotes
        .route("/api/quotes", get(handlers::quotes::list))
        .route("/api/quotes/:symbol/history", get(handlers::quotes::history))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // CORS: the web client is served from a different origin in development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
