use std::sync::Arc;
use std::time::Duration;

use papertrade::api::router::create_router;
use papertrade::config::AppConfig;
use papertrade::db::{self, LedgerStore, MemoryLedgerStore, PgLedgerStore};
use papertrade::execution::TradeExecutor;
use papertrade::quotes::{
    AlphaVantageClient, FallbackQuoteSource, QuoteBook, QuoteCache, QuoteSource,
};
use papertrade::services::quote_refresher::{refresh_once, run_quote_refresher};
use papertrade::services::{TradingService, TradingSettings};
use papertrade::watchlist::AlertHub;
use papertrade::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = papertrade::metrics::init_metrics();

    // --- Ledger store ---
    let store: Arc<dyn LedgerStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            tracing::info!("Database connected");
            Arc::new(PgLedgerStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory ledger (state is lost on restart)");
            Arc::new(MemoryLedgerStore::new())
        }
    };

    // --- Quote source ---
    let quote_source: Arc<dyn QuoteSource> = match &config.alpha_vantage_api_key {
        Some(key) => {
            let ttl = Duration::from_secs(config.quote_cache_ttl_secs);
            Arc::new(AlphaVantageClient::new(
                reqwest::Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()?,
                key.clone(),
                config.usd_to_inr,
                Arc::new(QuoteCache::new(ttl)),
                Arc::new(QuoteCache::new(ttl)),
            ))
        }
        None => {
            tracing::warn!("No ALPHA_VANTAGE_API_KEY, serving demo quotes");
            Arc::new(FallbackQuoteSource)
        }
    };

    let quotes = QuoteBook::new();
    let alerts = AlertHub::new(config.alert_settings());

    match refresh_once(quote_source.as_ref(), &quotes, store.as_ref(), &alerts).await {
        Ok(outcome) => tracing::info!(
            source = quote_source.name(),
            quotes = outcome.quotes_accepted,
            live = outcome.live_quotes,
            "Initial quote refresh complete"
        ),
        Err(e) => tracing::warn!(error = %e, "Initial quote refresh failed"),
    }

    {
        let source = quote_source.clone();
        let book = quotes.clone();
        let store = store.clone();
        let hub = alerts.clone();
        let interval_secs = config.quote_refresh_secs;
        tokio::spawn(async move {
            run_quote_refresher(source, book, store, hub, interval_secs).await;
        });
        tracing::info!(interval_secs = config.quote_refresh_secs, "Quote refresher spawned");
    }

    alerts.on_alert(|event| {
        tracing::debug!(
            account_id = %event.account_id,
            symbol = %event.symbol,
            direction = ?event.direction,
            price = %event.price,
            "Alert published"
        );
    });

    // --- Trading ---
    let executor = TradeExecutor::new(store.clone(), config.trade_policy())
        .with_limits(config.trade_max_attempts, config.store_timeout());
    let trading = TradingService::new(
        store.clone(),
        executor,
        quotes.clone(),
        alerts.clone(),
        TradingSettings {
            default_initial_balance: config.default_initial_balance,
            transactions_page_size: config.transactions_page_size,
            quote_max_age: config.quote_max_age(),
        },
    );

    let state = AppState {
        store,
        config,
        trading: Arc::new(trading),
        quotes,
        quote_source,
        alerts,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
