pub mod quote_refresher;
pub mod trading;

pub use trading::{TradingService, TradingSettings};
