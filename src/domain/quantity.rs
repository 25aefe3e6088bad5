//! Order sizing with fixed-point decimal arithmetic.
//!
//! Converts a configured notional (amount of quote currency to spend)
//! into a base-currency quantity that a venue will accept. Quantities
//! are always truncated toward zero so that `quantity * price` never
//! exceeds the notional.
//!
//! All arithmetic uses `rust_decimal`; binary floating point never
//! touches a price or a quantity.

use rust_decimal::prelude::*;

/// Scale used for quantities when neither a step size nor a base
/// currency precision is known.
pub const DEFAULT_QUANTITY_SCALE: u32 = 8;

/// Apply the configured margin above the live price.
///
/// `multiplier` is the fractional margin (0.05 = 5% above the ask).
/// When the quote currency precision is known the result is rounded
/// *up* to it, so the spend computed from the adjusted price is an
/// upper bound of the spend at the live price. `None` on overflow.
pub fn adjust_price(
    price: Decimal,
    multiplier: Option<Decimal>,
    quote_precision: Option<u32>,
) -> Option<Decimal> {
    let adjusted = match multiplier {
        Some(margin) => price.checked_mul(Decimal::ONE.checked_add(margin)?)?,
        None => price,
    };

    Some(match quote_precision {
        Some(dp) => adjusted.round_dp_with_strategy(dp, RoundingStrategy::AwayFromZero),
        None => adjusted,
    })
}

/// Truncate `quantity` down to the nearest multiple of `step`.
///
/// The result carries the scale of `step` (0.01 -> two decimal places),
/// which is the format venues expect. `None` when the number of steps
/// does not fit in a `Decimal`.
pub fn truncate_to_step(quantity: Decimal, step: Decimal) -> Option<Decimal> {
    if step <= Decimal::ZERO {
        return Some(quantity);
    }
    quantity.checked_div(step)?.trunc().checked_mul(step)
}

/// Compute the quantity to buy for `notional` at `price`.
///
/// Truncation unit, in order of preference: the venue step size, the
/// base currency precision, [`DEFAULT_QUANTITY_SCALE`]. Returns `None`
/// when the price or notional is not positive, when the truncated
/// quantity is zero, or when the arithmetic overflows.
pub fn order_quantity(
    notional: Decimal,
    price: Decimal,
    step: Option<Decimal>,
    base_precision: Option<u32>,
) -> Option<Decimal> {
    if price <= Decimal::ZERO || notional <= Decimal::ZERO {
        return None;
    }

    let raw = notional.checked_div(price)?;

    let (mut quantity, unit) = match step.filter(|s| *s > Decimal::ZERO) {
        Some(step) => (truncate_to_step(raw, step)?, step),
        None => {
            let scale = base_precision.unwrap_or(DEFAULT_QUANTITY_SCALE);
            (
                raw.round_dp_with_strategy(scale, RoundingStrategy::ToZero),
                Decimal::new(1, scale),
            )
        }
    };

    // Division rounds at the 28th significant digit; step back one unit
    // if that rounding pushed the spend over the notional.
    if quantity.checked_mul(price)? > notional {
        quantity -= unit;
    }

    (quantity > Decimal::ZERO).then_some(quantity)
}

/// Quote-currency spend of an order.
pub fn spend(quantity: Decimal, price: Decimal) -> Option<Decimal> {
    quantity.checked_mul(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantity_truncates_to_step() {
        let quantity = order_quantity(dec!(100), dec!(3.3333), Some(dec!(0.01)), None).unwrap();
        assert_eq!(quantity, dec!(30.00));
        assert_eq!(quantity.to_string(), "30.00");
        assert_eq!(spend(quantity, dec!(3.3333)).unwrap(), dec!(99.999));
    }

    #[test]
    fn test_quantity_never_rounds_up() {
        // 10 / 3 = 3.333..., step 1 -> 3, never 4
        assert_eq!(order_quantity(dec!(10), dec!(3), Some(dec!(1)), None), Some(dec!(3)));
        // 0.999 / 1 with step 0.1 -> 0.9
        assert_eq!(
            order_quantity(dec!(0.999), dec!(1), Some(dec!(0.1)), None),
            Some(dec!(0.9))
        );
    }

    #[test]
    fn test_quantity_uses_base_precision_without_step() {
        let quantity = order_quantity(dec!(1), dec!(3), None, Some(2)).unwrap();
        assert_eq!(quantity, dec!(0.33));
    }

    #[test]
    fn test_quantity_default_scale() {
        let quantity = order_quantity(dec!(1), dec!(3), None, None).unwrap();
        assert_eq!(quantity, dec!(0.33333333));
    }

    #[test]
    fn test_quantity_below_step_is_none() {
        assert_eq!(order_quantity(dec!(1), dec!(50000), Some(dec!(0.001)), None), None);
    }

    #[test]
    fn test_quantity_rejects_non_positive_inputs() {
        assert_eq!(order_quantity(dec!(100), dec!(0), None, None), None);
        assert_eq!(order_quantity(dec!(100), dec!(-1), None, None), None);
        assert_eq!(order_quantity(dec!(0), dec!(1), None, None), None);
    }

    #[test]
    fn test_zero_step_falls_back_to_precision() {
        assert_eq!(
            order_quantity(dec!(10), dec!(4), Some(Decimal::ZERO), Some(1)),
            Some(dec!(2.5))
        );
    }

    #[test]
    fn test_adjust_price_applies_margin() {
        assert_eq!(adjust_price(dec!(2), Some(dec!(0.05)), None), Some(dec!(2.10)));
        assert_eq!(adjust_price(dec!(2), None, None), Some(dec!(2)));
    }

    #[test]
    fn test_adjust_price_rounds_up_to_quote_precision() {
        assert_eq!(adjust_price(dec!(0.000012341), None, Some(8)), Some(dec!(0.00001235)));
        assert_eq!(
            adjust_price(dec!(3.33331), Some(Decimal::ZERO), Some(4)),
            Some(dec!(3.3334))
        );
    }

    #[test]
    fn test_adjust_price_overflow_is_none() {
        assert_eq!(adjust_price(Decimal::MAX, Some(dec!(0.05)), None), None);
        assert_eq!(adjust_price(dec!(1), Some(Decimal::MAX), None), None);
    }

    #[test]
    fn test_truncate_to_step_keeps_step_scale() {
        let truncated = truncate_to_step(dec!(12.3456), dec!(0.01)).unwrap();
        assert_eq!(truncated.to_string(), "12.34");
        assert_eq!(truncate_to_step(dec!(12.3456), dec!(5)), Some(dec!(10)));
        assert_eq!(truncate_to_step(dec!(12.3456), Decimal::ZERO), Some(dec!(12.3456)));
    }

    #[test]
    fn test_step_count_overflow_is_none() {
        // 100 / 1e-20 = 1e22 units, 1e30 steps of 1e-8
        let price = dec!(0.00000000000000000001);
        assert_eq!(truncate_to_step(dec!(10000000000000000000000), dec!(0.00000001)), None);
        assert_eq!(order_quantity(dec!(100), price, Some(dec!(0.00000001)), None), None);
    }
}
