//! Money arithmetic
//!
//! Amounts are stored and serialized as `f64`; every calculation goes through
//! `Decimal` and is rounded half-up to cents before it leaves this module.

use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 2;

#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert back to `f64` for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_cents(value).to_f64().unwrap_or_default()
}

#[inline]
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `price × quantity`, rounded to cents
pub fn line_total(price: f64, quantity: i64) -> Decimal {
    round_cents(to_decimal(price) * Decimal::from(quantity))
}

/// Sum of rounded line totals
pub fn order_total<I>(lines: I) -> f64
where
    I: IntoIterator<Item = (f64, i64)>,
{
    let total: Decimal = lines
        .into_iter()
        .map(|(price, quantity)| line_total(price, quantity))
        .sum();
    to_f64(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_precision() {
        let sum_f64 = 0.1_f64 + 0.2_f64;
        assert_ne!(sum_f64, 0.3);
        assert_eq!(to_f64(to_decimal(0.1) + to_decimal(0.2)), 0.3);
    }

    #[test]
    fn test_line_total_rounds_half_up() {
        // 0.335 × 1 rounds away from zero
        assert_eq!(to_f64(line_total(0.335, 1)), 0.34);
        assert_eq!(to_f64(line_total(2.5, 3)), 7.5);
    }

    #[test]
    fn test_order_total_accumulates_exactly() {
        let lines = std::iter::repeat_n((0.01, 1), 1000);
        assert_eq!(order_total(lines), 10.0);
        assert_eq!(order_total([(1.99, 3), (0.5, 2)]), 6.97);
        assert_eq!(order_total(std::iter::empty()), 0.0);
    }
}
