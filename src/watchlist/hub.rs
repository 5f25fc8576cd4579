use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::{AlertDirection, AlertEvent, Notification, Quote};

use super::monitor::{AlertMode, WatchlistMonitor};
use super::notifications::NotificationQueue;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub threshold_pct: Decimal,
    pub mode: AlertMode,
    pub max_notifications: usize,
    pub ttl: Duration,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            threshold_pct: Decimal::ONE,
            mode: AlertMode::Cumulative,
            max_notifications: 5,
            ttl: Duration::seconds(10),
        }
    }
}

struct AccountAlerts {
    monitor: WatchlistMonitor,
    tray: NotificationQueue,
}

impl AccountAlerts {
    fn is_idle(&mut self, now: DateTime<Utc>) -> bool {
        self.monitor.is_empty() && self.tray.active(now).is_empty()
    }
}

/// Routes quote refreshes through each account's watchlist monitor, keeps the
/// per-account notification trays and broadcasts every alert.
#[derive(Clone)]
pub struct AlertHub {
    settings: AlertSettings,
    accounts: Arc<Mutex<HashMap<Uuid, AccountAlerts>>>,
    tx: broadcast::Sender<AlertEvent>,
}

impl AlertHub {
    pub fn new(settings: AlertSettings) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            settings,
            accounts: Arc::new(Mutex::new(HashMap::new())),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.tx.subscribe()
    }

    /// Invoke `callback` for every alert until the hub is dropped.
    pub fn on_alert<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(AlertEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Alert subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Run one refresh for an account. `watched` is the account's current
    /// watchlist; monitor state for anything no longer on it is dropped.
    pub async fn observe_account(
        &self,
        account_id: Uuid,
        watched: &HashSet<String>,
        quotes: &HashMap<String, Quote>,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let events = {
            let mut accounts = self.accounts.lock().await;
            let entry = accounts
                .entry(account_id)
                .or_insert_with(|| self.new_account(account_id));
            entry.monitor.sync_membership(watched);

            let mut symbols: Vec<&String> = watched.iter().collect();
            symbols.sort();

            let mut events = Vec::new();
            for symbol in symbols {
                let Some(quote) = quotes.get(symbol) else {
                    continue;
                };
                if let Some(event) = entry.monitor.observe(quote, now) {
                    entry.tray.push(event.clone());
                    events.push(event);
                }
            }
            events
        };

        for event in &events {
            counter!("watchlist_alerts_total", "direction" => direction_label(event)).increment(1);
            tracing::info!(
                account_id = %account_id,
                symbol = %event.symbol,
                change_percent = %event.change_percent,
                "Watchlist alert"
            );
            // No subscribers is fine; the tray still holds the event.
            let _ = self.tx.send(event.clone());
        }

        events
    }

    /// Drop monitor state for a symbol removed from an account's watchlist.
    pub async fn forget(&self, account_id: Uuid, symbol: &str) {
        let mut accounts = self.accounts.lock().await;
        let idle = match accounts.get_mut(&account_id) {
            Some(entry) => {
                entry.monitor.forget(symbol);
                entry.is_idle(Utc::now())
            }
            None => false,
        };
        if idle {
            accounts.remove(&account_id);
        }
    }

    /// Drop state for accounts that no longer watch anything once their
    /// notifications have expired. Returns the number of accounts tracked.
    pub async fn retain_accounts(&self, watching: &HashSet<Uuid>, now: DateTime<Utc>) -> usize {
        let mut accounts = self.accounts.lock().await;
        accounts.retain(|account_id, entry| {
            if watching.contains(account_id) {
                return true;
            }
            entry.monitor.sync_membership(&HashSet::new());
            !entry.is_idle(now)
        });
        accounts.len()
    }

    pub async fn notifications(&self, account_id: Uuid, now: DateTime<Utc>) -> Vec<Notification> {
        match self.accounts.lock().await.get_mut(&account_id) {
            Some(entry) => entry.tray.active(now),
            None => Vec::new(),
        }
    }

    pub async fn dismiss(&self, account_id: Uuid, id: Uuid) -> bool {
        match self.accounts.lock().await.get_mut(&account_id) {
            Some(entry) => entry.tray.dismiss(id),
            None => false,
        }
    }

    fn new_account(&self, account_id: Uuid) -> AccountAlerts {
        AccountAlerts {
            monitor: WatchlistMonitor::new(
                account_id,
                self.settings.threshold_pct,
                self.settings.mode,
            ),
            tray: NotificationQueue::new(self.settings.max_notifications, self.settings.ttl),
        }
    }
}

fn direction_label(event: &AlertEvent) -> &'static str {
    match event.direction {
        AlertDirection::Gain => "gain",
        AlertDirection::Loss => "loss",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quotes(price: Decimal) -> HashMap<String, Quote> {
        let quote = Quote {
            symbol: "INFY".into(),
            name: "Infosys Ltd".into(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            volume: 0,
            is_live: false,
            last_updated: Utc::now(),
        };
        HashMap::from([(quote.symbol.clone(), quote)])
    }

    fn watched() -> HashSet<String> {
        HashSet::from(["INFY".to_string()])
    }

    #[tokio::test]
    async fn test_alert_reaches_tray_and_subscribers() {
        let hub = AlertHub::new(AlertSettings::default());
        let mut rx = hub.subscribe();
        let account = Uuid::new_v4();
        let now = Utc::now();

        assert!(hub.observe_account(account, &watched(), &quotes(dec!(1500)), now).await.is_empty());
        let events = hub.observe_account(account, &watched(), &quotes(dec!(1530)), now).await;
        assert_eq!(events.len(), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, events[0].id);
        assert_eq!(hub.notifications(account, now).await.len(), 1);

        assert!(hub.dismiss(account, received.id).await);
        assert!(hub.notifications(account, now).await.is_empty());
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let hub = AlertHub::new(AlertSettings::default());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let now = Utc::now();

        hub.observe_account(a, &watched(), &quotes(dec!(1500)), now).await;
        // b has never seen INFY, so this only seeds its baseline
        assert!(hub.observe_account(b, &watched(), &quotes(dec!(1600)), now).await.is_empty());
        assert_eq!(hub.observe_account(a, &watched(), &quotes(dec!(1600)), now).await.len(), 1);
        assert!(hub.notifications(b, now).await.is_empty());
    }

    #[tokio::test]
    async fn test_accounts_without_watchlist_are_evicted() {
        let hub = AlertHub::new(AlertSettings::default());
        let quiet = Uuid::new_v4();
        let alerted = Uuid::new_v4();
        let now = Utc::now();

        hub.observe_account(quiet, &watched(), &quotes(dec!(1500)), now).await;
        hub.observe_account(alerted, &watched(), &quotes(dec!(1500)), now).await;
        hub.observe_account(alerted, &watched(), &quotes(dec!(1600)), now).await;

        // Both emptied their watchlists; only the unexpired tray is kept
        assert_eq!(hub.retain_accounts(&HashSet::new(), now).await, 1);
        assert_eq!(hub.notifications(alerted, now).await.len(), 1);

        let later = now + Duration::seconds(11);
        assert_eq!(hub.retain_accounts(&HashSet::new(), later).await, 0);
        assert!(hub.notifications(alerted, later).await.is_empty());
    }

    #[tokio::test]
    async fn test_forgetting_last_symbol_evicts_quiet_account() {
        let hub = AlertHub::new(AlertSettings::default());
        let account = Uuid::new_v4();
        let now = Utc::now();

        hub.observe_account(account, &watched(), &quotes(dec!(1500)), now).await;
        hub.forget(account, "INFY").await;
        assert_eq!(hub.retain_accounts(&HashSet::from([account]), now).await, 0);
    }

    #[tokio::test]
    async fn test_forget_resets_symbol() {
        let hub = AlertHub::new(AlertSettings::default());
        let account = Uuid::new_v4();
        let now = Utc::now();

        hub.observe_account(account, &watched(), &quotes(dec!(1500)), now).await;
        hub.forget(account, "INFY").await;
        assert!(hub.observe_account(account, &watched(), &quotes(dec!(1600)), now).await.is_empty());
    }
}
