pub mod policy;
pub mod trade_executor;

pub use policy::TradePolicy;
pub use trade_executor::{plan_buy, plan_sell, TradeError, TradeErrorKind, TradeExecutor, TradeOrder};
