use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::trade_executor::TradeError;

/// Product rules applied to buy orders on top of the ledger's own checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradePolicy {
    /// Reject buys whose notional value is below this amount. `None` disables.
    pub min_order_value: Option<Decimal>,
}

impl TradePolicy {
    pub fn with_min_order_value(minimum: Decimal) -> Self {
        Self {
            min_order_value: Some(minimum).filter(|m| *m > Decimal::ZERO),
        }
    }
}

/// Smallest whole quantity whose value at `price` reaches `minimum`.
pub fn min_quantity_for(minimum: Decimal, price: Decimal) -> i64 {
    if price <= Decimal::ZERO {
        return 0;
    }
    minimum
        .checked_div(price)
        .and_then(|q| q.ceil().to_i64())
        .unwrap_or(i64::MAX)
}

/// Check a buy's notional value against the configured minimum.
pub fn check_minimum_investment(
    order_value: Decimal,
    price: Decimal,
    policy: &TradePolicy,
) -> Result<(), TradeError> {
    let Some(minimum) = policy.min_order_value else {
        return Ok(());
    };

    if order_value < minimum {
        return Err(TradeError::BelowMinimumInvestment {
            order_value,
            minimum,
            min_quantity: min_quantity_for(minimum, price),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_disabled_policy_accepts_anything() {
        let result = check_minimum_investment(dec!(1), dec!(1), &TradePolicy::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_minimum_disables_the_rule() {
        assert_eq!(TradePolicy::with_min_order_value(Decimal::ZERO).min_order_value, None);
    }

    #[test]
    fn test_below_minimum_reports_quantity_needed() {
        let policy = TradePolicy::with_min_order_value(dec!(1000));
        // 2 × 467.25 = 934.50 < 1000 → need ceil(1000 / 467.25) = 3
        let result = check_minimum_investment(dec!(934.50), dec!(467.25), &policy);
        match result {
            Err(TradeError::BelowMinimumInvestment { min_quantity, minimum, .. }) => {
                assert_eq!(min_quantity, 3);
                assert_eq!(minimum, dec!(1000));
            }
            other => panic!("expected BelowMinimumInvestment, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_minimum_is_accepted() {
        let policy = TradePolicy::with_min_order_value(dec!(1000));
        assert!(check_minimum_investment(dec!(1000), dec!(250), &policy).is_ok());
    }

    #[test]
    fn test_min_quantity_for_saturates_on_tiny_price() {
        assert_eq!(min_quantity_for(dec!(1000), dec!(0.0000000000000000000000000001)), i64::MAX);
        assert_eq!(min_quantity_for(dec!(1000), Decimal::ZERO), 0);
    }

    #[test]
    fn test_min_quantity_for_exact_division() {
        assert_eq!(min_quantity_for(dec!(1000), dec!(250)), 4);
        assert_eq!(min_quantity_for(dec!(1000), dec!(2847.50)), 1);
    }
}
