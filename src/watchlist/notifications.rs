use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{AlertEvent, Notification};

/// Bounded, newest-first tray of alert notifications. Each entry expires on
/// its own clock regardless of later arrivals.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    capacity: usize,
    ttl: Duration,
    entries: VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, event: AlertEvent) {
        let expires_at = event.timestamp + self.ttl;
        self.entries.push_front(Notification { event, expires_at });
        self.entries.truncate(self.capacity);
    }

    /// Unexpired notifications, newest first. Expired ones are discarded.
    pub fn active(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        self.entries.retain(|n| n.expires_at > now);
        self.entries.iter().cloned().collect()
    }

    /// Returns `true` if a notification with this id was present.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.event.id != id);
        self.entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertDirection;
    use rust_decimal::Decimal;

    fn event(symbol: &str, at: DateTime<Utc>) -> AlertEvent {
        AlertEvent {
            id: Uuid::new_v4(),
            account_id: Uuid::nil(),
            symbol: symbol.into(),
            name: symbol.into(),
            previous_price: Decimal::ONE_HUNDRED,
            price: Decimal::from(102),
            price_delta: Decimal::TWO,
            change_percent: Decimal::TWO,
            day_change_percent: Decimal::ZERO,
            direction: AlertDirection::Gain,
            timestamp: at,
        }
    }

    #[test]
    fn test_keeps_newest_up_to_capacity() {
        let now = Utc::now();
        let mut q = NotificationQueue::new(5, Duration::seconds(10));
        for i in 0..7 {
            q.push(event(&format!("S{i}"), now));
        }

        let active = q.active(now);
        assert_eq!(active.len(), 5);
        assert_eq!(active[0].event.symbol, "S6");
        assert_eq!(active[4].event.symbol, "S2");
    }

    #[test]
    fn test_entries_expire_independently() {
        let t0 = Utc::now();
        let mut q = NotificationQueue::new(5, Duration::seconds(10));
        q.push(event("OLD", t0));
        q.push(event("NEW", t0 + Duration::seconds(6)));

        let active = q.active(t0 + Duration::seconds(11));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].event.symbol, "NEW");
        assert!(q.active(t0 + Duration::seconds(17)).is_empty());
    }

    #[test]
    fn test_dismiss_by_id() {
        let now = Utc::now();
        let mut q = NotificationQueue::new(5, Duration::seconds(10));
        let e = event("TCS", now);
        let id = e.id;
        q.push(e);

        assert!(q.dismiss(id));
        assert!(!q.dismiss(id));
        assert!(q.active(now).is_empty());
    }
}
