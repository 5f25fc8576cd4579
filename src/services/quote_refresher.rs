use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, gauge};
use tokio::time::{interval_at, Duration, Instant};
use uuid::Uuid;

use crate::db::LedgerStore;
use crate::quotes::{catalog, QuoteBook, QuoteSource};
use crate::watchlist::AlertHub;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub quotes_accepted: usize,
    pub live_quotes: usize,
    pub alerts: usize,
}

/// Fetch every catalog symbol, merge into the book, then run each account's
/// watchlist against the refreshed book.
pub async fn refresh_once(
    source: &dyn QuoteSource,
    book: &QuoteBook,
    store: &dyn LedgerStore,
    alerts: &AlertHub,
) -> anyhow::Result<RefreshOutcome> {
    let now = Utc::now();
    let quotes = source.get_quotes(&catalog::symbols()).await?;
    let live_quotes = quotes.iter().filter(|q| q.is_live).count();
    let quotes_accepted = book.update(quotes, now).await;

    let mut watched: HashMap<Uuid, HashSet<String>> = HashMap::new();
    for entry in store.watchlist_members().await? {
        watched
            .entry(entry.account_id)
            .or_default()
            .insert(entry.symbol);
    }

    let watching: HashSet<Uuid> = watched.keys().copied().collect();
    alerts.retain_accounts(&watching, now).await;

    let snapshot = book.snapshot().await;
    let mut alert_count = 0;
    for (account_id, symbols) in &watched {
        alert_count += alerts
            .observe_account(*account_id, symbols, &snapshot, now)
            .await
            .len();
    }

    Ok(RefreshOutcome {
        quotes_accepted,
        live_quotes,
        alerts: alert_count,
    })
}

/// Run the quote refresher loop. The first refresh happens one period after
/// start; callers refresh once themselves before serving traffic.
pub async fn run_quote_refresher(
    source: Arc<dyn QuoteSource>,
    book: QuoteBook,
    store: Arc<dyn LedgerStore>,
    alerts: AlertHub,
    interval_secs: u64,
) {
    let period = Duration::from_secs(interval_secs.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        ticker.tick().await;

        match refresh_once(source.as_ref(), &book, store.as_ref(), &alerts).await {
            Ok(outcome) => {
                counter!("quote_refresh_total").increment(1);
                gauge!("quotes_live").set(outcome.live_quotes as f64);
                tracing::debug!(
                    source = source.name(),
                    quotes = outcome.quotes_accepted,
                    live = outcome.live_quotes,
                    alerts = outcome.alerts,
                    "Quote refresh complete"
                );
            }
            Err(e) => {
                counter!("quote_refresh_failures").increment(1);
                tracing::warn!(
                    source = source.name(),
                    error = %e,
                    "Quote refresh failed, keeping last known quotes"
                );
            }
        }
    }
}
