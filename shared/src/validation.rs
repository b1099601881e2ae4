//! Validation utilities for order and warehouse input

use std::collections::HashSet;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{IngredientLine, OrderLine};
use crate::types::MAX_QUANTITY_KG;

/// Longest title accepted for an order
pub const MAX_TITLE_LENGTH: usize = 200;

/// Validate that a quantity in kg is positive and fits a stock column
pub fn validate_quantity(quantity_kg: Decimal) -> Result<(), &'static str> {
    if quantity_kg <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    if quantity_kg > MAX_QUANTITY_KG {
        return Err("Quantity must be less than 10,000,000,000 kg");
    }
    Ok(())
}

/// Validate an order title
pub fn validate_title(title: &str) -> Result<(), &'static str> {
    if title.trim().is_empty() {
        return Err("Title cannot be empty");
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err("Title must be at most 200 characters");
    }
    Ok(())
}

/// Validate the writer recorded on an order
pub fn validate_writer(writer: &str) -> Result<(), &'static str> {
    if writer.trim().is_empty() {
        return Err("Writer cannot be empty");
    }
    Ok(())
}

/// Validate the product lines of a product order
pub fn validate_order_lines(lines: &[OrderLine]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("At least one product line is required");
    }
    for line in lines {
        validate_quantity(line.quantity_kg)?;
    }
    Ok(())
}

/// Validate the lines of an ingredient purchase order
pub fn validate_ingredient_lines(lines: &[IngredientLine]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("At least one ingredient line is required");
    }
    for line in lines {
        validate_quantity(line.quantity_kg)?;
    }
    Ok(())
}

/// Validate a recipe percentage (0-100 nominal)
pub fn validate_percent(percent: Decimal) -> Result<(), &'static str> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

/// Validate an ordered warehouse ranking
pub fn validate_priority_order(ordered: &[Uuid]) -> Result<(), &'static str> {
    if ordered.is_empty() {
        return Err("At least one warehouse must be ranked");
    }
    let mut seen = HashSet::with_capacity(ordered.len());
    if !ordered.iter().all(|id| seen.insert(*id)) {
        return Err("A warehouse can only appear once in the ranking");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(dec("0.0001")).is_ok());
        assert!(validate_quantity(dec("0")).is_err());
        assert!(validate_quantity(dec("-1")).is_err());
    }

    #[test]
    fn test_validate_quantity_upper_bound() {
        assert!(validate_quantity(MAX_QUANTITY_KG).is_ok());
        assert!(validate_quantity(dec("10000000000")).is_err());
        assert!(validate_quantity(dec("50000000000000000000000000000")).is_err());

        let line = IngredientLine {
            ingredient_id: Uuid::new_v4(),
            quantity_kg: dec("10000000000"),
        };
        assert!(validate_ingredient_lines(&[line]).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Spring restock").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_order_lines() {
        assert!(validate_order_lines(&[]).is_err());

        let good = OrderLine {
            product_id: Uuid::new_v4(),
            quantity_kg: dec("5"),
            note: None,
        };
        let bad = OrderLine {
            quantity_kg: dec("0"),
            ..good.clone()
        };
        assert!(validate_order_lines(&[good.clone()]).is_ok());
        assert!(validate_order_lines(&[good, bad]).is_err());
    }

    #[test]
    fn test_validate_percent() {
        assert!(validate_percent(dec("0")).is_ok());
        assert!(validate_percent(dec("100")).is_ok());
        assert!(validate_percent(dec("100.01")).is_err());
        assert!(validate_percent(dec("-0.5")).is_err());
    }

    #[test]
    fn test_validate_priority_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_priority_order(&[a, b]).is_ok());
        assert!(validate_priority_order(&[]).is_err());
        assert!(validate_priority_order(&[a, b, a]).is_err());
    }
}
