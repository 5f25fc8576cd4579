pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod execution;
pub mod metrics;
pub mod models;
pub mod quotes;
pub mod services;
pub mod valuation;
pub mod watchlist;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::LedgerStore;
use crate::quotes::{QuoteBook, QuoteSource};
use crate::services::TradingService;
use crate::watchlist::AlertHub;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub config: AppConfig,
    pub trading: Arc<TradingService>,
    pub quotes: QuoteBook,
    pub quote_source: Arc<dyn QuoteSource>,
    pub alerts: AlertHub,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
