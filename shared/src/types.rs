//! Common numeric types and rounding rules

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Decimal places kept for every kilogram quantity
pub const QUANTITY_SCALE: u32 = 4;

/// Largest quantity in kg that fits the stored `NUMERIC(14, 4)` columns
pub const MAX_QUANTITY_KG: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 4);

/// An amount or cost left the representable range
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("quantity or cost is out of range")]
pub struct OutOfRange;

/// Round a quantity in kg to the stored precision (half-up)
pub fn round_quantity(kg: Decimal) -> Decimal {
    kg.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a monetary amount to a whole currency unit (half-up)
pub fn round_cost(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a recipe percentage (kg per 100 kg) into kg for the given batch size
pub fn percent_of(percent_per_kg: Decimal, quantity_kg: Decimal) -> Result<Decimal, OutOfRange> {
    (percent_per_kg / Decimal::ONE_HUNDRED)
        .checked_mul(quantity_kg)
        .map(round_quantity)
        .ok_or(OutOfRange)
}

/// Cost of `quantity_kg` at `unit_cost` per kg, rounded to a whole unit
pub fn line_cost(quantity_kg: Decimal, unit_cost: Decimal) -> Result<Decimal, OutOfRange> {
    quantity_kg.checked_mul(unit_cost).map(round_cost).ok_or(OutOfRange)
}

/// Add without panicking on overflow
pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, OutOfRange> {
    a.checked_add(b).ok_or(OutOfRange)
}

/// Sum without panicking on overflow
pub fn checked_sum<I>(values: I) -> Result<Decimal, OutOfRange>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, checked_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_cost_half_up() {
        assert_eq!(round_cost(dec("2.5")), dec("3"));
        assert_eq!(round_cost(dec("2.4999")), dec("2"));
        assert_eq!(round_cost(dec("300.0000")), dec("300"));
    }

    #[test]
    fn test_round_quantity_keeps_four_places() {
        assert_eq!(round_quantity(dec("1.23456")), dec("1.2346"));
        assert_eq!(round_quantity(dec("1.23454")), dec("1.2345"));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec("60"), dec("5")), Ok(dec("3")));
        assert_eq!(percent_of(dec("0.5"), dec("3")), Ok(dec("0.015")));
        assert_eq!(percent_of(dec("33.3333"), dec("1")), Ok(dec("0.3333")));
    }

    #[test]
    fn test_max_quantity_matches_column() {
        assert_eq!(MAX_QUANTITY_KG, dec("9999999999.9999"));
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(percent_of(dec("1000"), Decimal::MAX), Err(OutOfRange));
        assert_eq!(line_cost(dec("100000000000000000000"), dec("100000000000")), Err(OutOfRange));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE]), Err(OutOfRange));
        assert_eq!(checked_sum([dec("1.5"), dec("2")]), Ok(dec("3.5")));
    }
}
