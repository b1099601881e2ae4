//! Decision half of the order application engine
//!
//! The backend locks rows and reads stock, then hands the figures to these
//! functions. A plan is only produced when every ingredient passes, so the
//! caller never has a partial set of deductions to write.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{IngredientOrderLine, OrderType};
use crate::types::{checked_add, OutOfRange};

/// Missing stock for one ingredient at the target warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shortage {
    pub ingredient_id: Uuid,
    pub required_kg: Decimal,
    pub current_kg: Decimal,
    pub lacking_kg: Decimal,
}

/// Reasons an order cannot be applied
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApplyError {
    #[error("order has already been applied")]
    AlreadyApplied,

    #[error("expected a {expected} order, found a {actual} order")]
    WrongOrderType { expected: OrderType, actual: OrderType },

    #[error("no warehouse priority is configured")]
    NoPriorityConfigured,

    #[error("order has no ingredient requirements")]
    EmptyOrder,

    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),

    #[error("insufficient stock for {} ingredient(s) at warehouse {warehouse_id}", shortages.len())]
    InsufficientStock {
        warehouse_id: Uuid,
        shortages: Vec<Shortage>,
    },
}

/// Check the order header before any stock is touched
pub fn ensure_applicable(expected: OrderType, actual: OrderType, is_applied: bool) -> Result<(), ApplyError> {
    if actual != expected {
        return Err(ApplyError::WrongOrderType { expected, actual });
    }
    if is_applied {
        return Err(ApplyError::AlreadyApplied);
    }
    Ok(())
}

/// One stock row to decrease
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockDeduction {
    pub ingredient_id: Uuid,
    pub current_kg: Decimal,
    pub required_kg: Decimal,
    pub remaining_kg: Decimal,
}

/// All deductions for one product order, against one warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeductionPlan {
    pub warehouse_id: Uuid,
    pub deductions: Vec<StockDeduction>,
}

/// Check every requirement against current stock and plan the deductions.
///
/// Ingredients missing from `current` hold 0 kg. Every shortage is reported,
/// not just the first.
pub fn plan_deductions(
    warehouse_id: Uuid,
    required: &BTreeMap<Uuid, Decimal>,
    current: &HashMap<Uuid, Decimal>,
) -> Result<DeductionPlan, ApplyError> {
    if required.is_empty() {
        return Err(ApplyError::EmptyOrder);
    }

    let mut deductions = Vec::with_capacity(required.len());
    let mut shortages = Vec::new();

    for (&ingredient_id, &required_kg) in required {
        let current_kg = current.get(&ingredient_id).copied().unwrap_or(Decimal::ZERO);
        if current_kg < required_kg {
            shortages.push(Shortage {
                ingredient_id,
                required_kg,
                current_kg,
                lacking_kg: required_kg - current_kg,
            });
        } else {
            deductions.push(StockDeduction {
                ingredient_id,
                current_kg,
                required_kg,
                remaining_kg: current_kg - required_kg,
            });
        }
    }

    if !shortages.is_empty() {
        return Err(ApplyError::InsufficientStock {
            warehouse_id,
            shortages,
        });
    }

    Ok(DeductionPlan {
        warehouse_id,
        deductions,
    })
}

/// One stock row to increase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockReceipt {
    pub warehouse_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity_kg: Decimal,
}

/// Collapse purchase lines into one receipt per (warehouse, ingredient)
pub fn plan_receipts(lines: &[IngredientOrderLine]) -> Result<Vec<StockReceipt>, ApplyError> {
    if lines.is_empty() {
        return Err(ApplyError::EmptyOrder);
    }

    let mut receipts: BTreeMap<(Uuid, Uuid), Decimal> = BTreeMap::new();
    for line in lines {
        let total = receipts
            .entry((line.warehouse_id, line.ingredient_id))
            .or_insert(Decimal::ZERO);
        *total = checked_add(*total, line.quantity_kg)?;
    }

    Ok(receipts
        .into_iter()
        .map(|((warehouse_id, ingredient_id), quantity_kg)| StockReceipt {
            warehouse_id,
            ingredient_id,
            quantity_kg,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_ensure_applicable() {
        assert!(ensure_applicable(OrderType::Product, OrderType::Product, false).is_ok());
        assert_eq!(
            ensure_applicable(OrderType::Product, OrderType::Product, true),
            Err(ApplyError::AlreadyApplied)
        );
        assert!(matches!(
            ensure_applicable(OrderType::Product, OrderType::Ingredient, false),
            Err(ApplyError::WrongOrderType { .. })
        ));
    }

    #[test]
    fn test_plan_reports_every_shortage() {
        let wh = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let required = BTreeMap::from([(a, dec("3")), (b, dec("2")), (c, dec("1"))]);
        let current = HashMap::from([(a, dec("2")), (b, dec("5"))]);

        match plan_deductions(wh, &required, &current) {
            Err(ApplyError::InsufficientStock { warehouse_id, shortages }) => {
                assert_eq!(warehouse_id, wh);
                assert_eq!(shortages.len(), 2);
                let missing_c = shortages.iter().find(|s| s.ingredient_id == c).unwrap();
                assert_eq!(missing_c.current_kg, Decimal::ZERO);
                assert_eq!(missing_c.lacking_kg, dec("1"));
            }
            other => panic!("expected shortage, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_exact_stock_passes() {
        let wh = Uuid::new_v4();
        let a = Uuid::new_v4();
        let required = BTreeMap::from([(a, dec("3"))]);
        let current = HashMap::from([(a, dec("3"))]);

        let plan = plan_deductions(wh, &required, &current).unwrap();
        assert_eq!(plan.deductions[0].remaining_kg, Decimal::ZERO);
    }

    #[test]
    fn test_plan_empty_order() {
        let result = plan_deductions(Uuid::new_v4(), &BTreeMap::new(), &HashMap::new());
        assert_eq!(result, Err(ApplyError::EmptyOrder));
    }

    #[test]
    fn test_plan_receipts_merges_duplicates() {
        let wh = Uuid::new_v4();
        let ing = Uuid::new_v4();
        let line = |qty: &str| IngredientOrderLine {
            ingredient_id: ing,
            warehouse_id: wh,
            quantity_kg: dec(qty),
            unit_cost: dec("10"),
            total_cost: dec("0"),
        };

        let receipts = plan_receipts(&[line("1.5"), line("2")]).unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].quantity_kg, dec("3.5"));
    }

    #[test]
    fn test_plan_receipts_overflow() {
        let line = IngredientOrderLine {
            ingredient_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            quantity_kg: Decimal::MAX,
            unit_cost: dec("1"),
            total_cost: dec("0"),
        };
        let result = plan_receipts(&[line.clone(), line]);
        assert_eq!(result, Err(ApplyError::OutOfRange(OutOfRange)));
    }
}
