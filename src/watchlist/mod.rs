//! Watchlist alerting: per-account price baselines, threshold detection and
//! short-lived notification trays.

pub mod hub;
pub mod monitor;
pub mod notifications;

pub use hub::{AlertHub, AlertSettings};
pub use monitor::{AlertMode, WatchlistMonitor};
pub use notifications::NotificationQueue;
