//! Order models
//!
//! Two kinds of orders share one header table: product orders (finished goods,
//! expanded through their recipes) and ingredient orders (raw-material purchases
//! delivered to a named warehouse).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kind of order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Product,
    Ingredient,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Product => "product",
            OrderType::Ingredient => "ingredient",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown order type: {0}")]
pub struct ParseOrderTypeError(pub String);

impl std::str::FromStr for OrderType {
    type Err = ParseOrderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(OrderType::Product),
            "ingredient" => Ok(OrderType::Ingredient),
            other => Err(ParseOrderTypeError(other.to_string())),
        }
    }
}

impl TryFrom<String> for OrderType {
    type Error = ParseOrderTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Requested product line of a product order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity_kg: Decimal,
    /// Free-form per-ingredient remarks from the order form
    #[serde(default)]
    pub note: Option<serde_json::Value>,
}

/// Requested line of a raw-material purchase order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientLine {
    pub ingredient_id: Uuid,
    pub quantity_kg: Decimal,
}

/// Frozen purchase line of an ingredient order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientOrderLine {
    pub ingredient_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity_kg: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

impl IngredientOrderLine {
    /// Freeze a purchase line at the ingredient's current catalog cost
    pub fn freeze(line: &IngredientLine, warehouse_id: Uuid, unit_cost: Decimal) -> Result<Self, crate::OutOfRange> {
        let quantity_kg = crate::round_quantity(line.quantity_kg);
        Ok(Self {
            ingredient_id: line.ingredient_id,
            warehouse_id,
            quantity_kg,
            unit_cost,
            total_cost: crate::line_cost(quantity_kg, unit_cost)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_type_round_trip() {
        for t in [OrderType::Product, OrderType::Ingredient] {
            assert_eq!(OrderType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(OrderType::from_str("service").is_err());
    }

    #[test]
    fn test_freeze_ingredient_line() {
        let line = IngredientLine {
            ingredient_id: Uuid::new_v4(),
            quantity_kg: Decimal::from_str("2.5").unwrap(),
        };
        let frozen = IngredientOrderLine::freeze(&line, Uuid::new_v4(), Decimal::from(199)).unwrap();
        // 2.5 * 199 = 497.5 rounds half-up
        assert_eq!(frozen.total_cost, Decimal::from(498));
        assert_eq!(frozen.unit_cost, Decimal::from(199));
    }
}
