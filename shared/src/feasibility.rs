//! Feasibility analyzer
//!
//! Read-only classification of whether ingredient requirements can be met from
//! the priority-ranked warehouses:
//!
//! 1. sufficient at the priority-1 warehouse
//! 2. sufficient only after moving stock in from lower-priority warehouses
//! 3. insufficient system-wide, a purchase is needed

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Recipe, WarehouseStock};
use crate::types::{checked_add, percent_of, OutOfRange};

/// Satisfiability tier, serialized as 1, 2 or 3
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum FeasibilityCase {
    Sufficient,
    TransferNeeded,
    MustPurchase,
}

impl FeasibilityCase {
    pub fn as_u8(&self) -> u8 {
        match self {
            FeasibilityCase::Sufficient => 1,
            FeasibilityCase::TransferNeeded => 2,
            FeasibilityCase::MustPurchase => 3,
        }
    }
}

impl From<FeasibilityCase> for u8 {
    fn from(case: FeasibilityCase) -> Self {
        case.as_u8()
    }
}

impl TryFrom<u8> for FeasibilityCase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FeasibilityCase::Sufficient),
            2 => Ok(FeasibilityCase::TransferNeeded),
            3 => Ok(FeasibilityCase::MustPurchase),
            other => Err(format!("invalid feasibility case {}", other)),
        }
    }
}

impl std::fmt::Display for FeasibilityCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeasibilityCase::Sufficient => write!(f, "Sufficient at priority-1 warehouse"),
            FeasibilityCase::TransferNeeded => write!(f, "Transfer between warehouses needed"),
            FeasibilityCase::MustPurchase => write!(f, "Purchase needed"),
        }
    }
}

/// Outcome of classifying one requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub case: FeasibilityCase,
    /// kg to bring in from lower-priority warehouses (case 2 only)
    pub move_kg: Decimal,
    /// kg missing system-wide (case 3 only)
    pub lacking_kg: Decimal,
}

/// Classify a requirement against priority-1 and system-wide stock.
///
/// Both boundaries are inclusive: `top >= required` is case 1 and
/// `required <= total` is case 2.
pub fn classify(required_kg: Decimal, top_stock_kg: Decimal, total_stock_kg: Decimal) -> Classification {
    if top_stock_kg >= required_kg {
        Classification {
            case: FeasibilityCase::Sufficient,
            move_kg: Decimal::ZERO,
            lacking_kg: Decimal::ZERO,
        }
    } else if required_kg <= total_stock_kg {
        Classification {
            case: FeasibilityCase::TransferNeeded,
            move_kg: required_kg - top_stock_kg,
            lacking_kg: Decimal::ZERO,
        }
    } else {
        Classification {
            case: FeasibilityCase::MustPurchase,
            move_kg: Decimal::ZERO,
            lacking_kg: required_kg - total_stock_kg,
        }
    }
}

/// Current stock of the ingredients under analysis, keyed by warehouse
#[derive(Debug, Clone)]
pub struct StockLevels {
    top_warehouse_id: Uuid,
    by_ingredient: HashMap<Uuid, HashMap<Uuid, Decimal>>,
}

impl StockLevels {
    pub fn new(top_warehouse_id: Uuid) -> Self {
        Self {
            top_warehouse_id,
            by_ingredient: HashMap::new(),
        }
    }

    pub fn from_rows<I>(top_warehouse_id: Uuid, rows: I) -> Self
    where
        I: IntoIterator<Item = WarehouseStock>,
    {
        let mut levels = Self::new(top_warehouse_id);
        for row in rows {
            levels.add(row.warehouse_id, row.ingredient_id, row.quantity_kg);
        }
        levels
    }

    pub fn add(&mut self, warehouse_id: Uuid, ingredient_id: Uuid, quantity_kg: Decimal) {
        *self
            .by_ingredient
            .entry(ingredient_id)
            .or_default()
            .entry(warehouse_id)
            .or_insert(Decimal::ZERO) += quantity_kg;
    }

    /// Stock at the priority-1 warehouse, 0 when it holds none
    pub fn top_stock(&self, ingredient_id: Uuid) -> Decimal {
        self.by_ingredient
            .get(&ingredient_id)
            .and_then(|per_warehouse| per_warehouse.get(&self.top_warehouse_id))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Stock summed over every warehouse
    pub fn total_stock(&self, ingredient_id: Uuid) -> Decimal {
        self.by_ingredient
            .get(&ingredient_id)
            .map(|per_warehouse| per_warehouse.values().copied().sum())
            .unwrap_or(Decimal::ZERO)
    }
}

/// Classification of one ingredient requirement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeasibilityResult {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub required_kg: Decimal,
    pub top_stock_kg: Decimal,
    pub total_stock_kg: Decimal,
    pub case: FeasibilityCase,
    pub move_kg: Decimal,
    pub lacking_kg: Decimal,
}

/// A named ingredient requirement to be classified
#[derive(Debug, Clone)]
pub struct Requirement {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub required_kg: Decimal,
}

/// Classify arbitrary requirements against the given stock
pub fn check_requirements<I>(requirements: I, stock: &StockLevels) -> Vec<FeasibilityResult>
where
    I: IntoIterator<Item = Requirement>,
{
    requirements
        .into_iter()
        .map(|req| {
            let top = stock.top_stock(req.ingredient_id);
            let total = stock.total_stock(req.ingredient_id);
            let c = classify(req.required_kg, top, total);
            FeasibilityResult {
                ingredient_id: req.ingredient_id,
                ingredient_name: req.ingredient_name,
                required_kg: req.required_kg,
                top_stock_kg: top,
                total_stock_kg: total,
                case: c.case,
                move_kg: c.move_kg,
                lacking_kg: c.lacking_kg,
            }
        })
        .collect()
}

/// Classify every ingredient of a product's recipe for a batch of `quantity_kg`.
///
/// The caller validates `quantity_kg` first.
pub fn check_feasibility(
    recipe: &Recipe,
    quantity_kg: Decimal,
    stock: &StockLevels,
) -> Result<Vec<FeasibilityResult>, OutOfRange> {
    let requirements = recipe
        .components
        .iter()
        .map(|c| {
            Ok(Requirement {
                ingredient_id: c.ingredient_id,
                ingredient_name: c.ingredient_name.clone(),
                required_kg: percent_of(c.percent_per_kg, quantity_kg)?,
            })
        })
        .collect::<Result<Vec<_>, OutOfRange>>()?;
    Ok(check_requirements(requirements, stock))
}

/// Per-ingredient view merged across several independent product checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedFeasibility {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub required_kg: Decimal,
    pub move_kg: Decimal,
    pub lacking_kg: Decimal,
    pub case: FeasibilityCase,
}

/// Merge per-product results, worst case wins.
///
/// Required kg is summed for every result; move kg only from case-2 results and
/// lacking kg only from case-3 results. Thresholds are not re-evaluated against
/// the summed requirement, see [`joint_feasibility`] for that.
pub fn merge_feasibility(per_product: &[Vec<FeasibilityResult>]) -> Result<Vec<MergedFeasibility>, OutOfRange> {
    let mut merged: Vec<MergedFeasibility> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for result in per_product.iter().flatten() {
        let i = *index.entry(result.ingredient_id).or_insert_with(|| {
            merged.push(MergedFeasibility {
                ingredient_id: result.ingredient_id,
                ingredient_name: result.ingredient_name.clone(),
                required_kg: Decimal::ZERO,
                move_kg: Decimal::ZERO,
                lacking_kg: Decimal::ZERO,
                case: FeasibilityCase::Sufficient,
            });
            merged.len() - 1
        });

        let entry = &mut merged[i];
        entry.required_kg = checked_add(entry.required_kg, result.required_kg)?;
        match result.case {
            FeasibilityCase::Sufficient => {}
            FeasibilityCase::TransferNeeded => entry.move_kg = checked_add(entry.move_kg, result.move_kg)?,
            FeasibilityCase::MustPurchase => entry.lacking_kg = checked_add(entry.lacking_kg, result.lacking_kg)?,
        }
        entry.case = entry.case.max(result.case);
    }

    Ok(merged)
}

/// Re-classify the summed requirement per ingredient against stock.
///
/// Every result for one ingredient carries the same stock figures, so the
/// stock of the first result seen is used.
pub fn joint_feasibility(per_product: &[Vec<FeasibilityResult>]) -> Result<Vec<FeasibilityResult>, OutOfRange> {
    let mut joint: Vec<FeasibilityResult> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for result in per_product.iter().flatten() {
        match index.get(&result.ingredient_id) {
            Some(&i) => joint[i].required_kg = checked_add(joint[i].required_kg, result.required_kg)?,
            None => {
                index.insert(result.ingredient_id, joint.len());
                joint.push(result.clone());
            }
        }
    }

    for entry in &mut joint {
        let c = classify(entry.required_kg, entry.top_stock_kg, entry.total_stock_kg);
        entry.case = c.case;
        entry.move_kg = c.move_kg;
        entry.lacking_kg = c.lacking_kg;
    }

    Ok(joint)
}

/// Results of one tier, for grouped display
pub fn results_in_case(results: &[MergedFeasibility], case: FeasibilityCase) -> Vec<&MergedFeasibility> {
    results.iter().filter(|r| r.case == case).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_tier_boundaries() {
        let top = dec("10");
        let total = dec("15");

        assert_eq!(classify(dec("10"), top, total).case, FeasibilityCase::Sufficient);

        let c = classify(dec("10.0001"), top, total);
        assert_eq!(c.case, FeasibilityCase::TransferNeeded);
        assert_eq!(c.move_kg, dec("0.0001"));

        assert_eq!(classify(dec("15"), top, total).case, FeasibilityCase::TransferNeeded);

        let c = classify(dec("15.0001"), top, total);
        assert_eq!(c.case, FeasibilityCase::MustPurchase);
        assert_eq!(c.lacking_kg, dec("0.0001"));
    }

    #[test]
    fn test_stock_levels_missing_rows_are_zero() {
        let top = Uuid::new_v4();
        let levels = StockLevels::new(top);
        assert_eq!(levels.top_stock(Uuid::new_v4()), Decimal::ZERO);
        assert_eq!(levels.total_stock(Uuid::new_v4()), Decimal::ZERO);
    }

    #[test]
    fn test_stock_levels_top_and_total() {
        let top = Uuid::new_v4();
        let other = Uuid::new_v4();
        let ing = Uuid::new_v4();
        let levels = StockLevels::from_rows(
            top,
            vec![
                WarehouseStock { warehouse_id: top, ingredient_id: ing, quantity_kg: dec("10") },
                WarehouseStock { warehouse_id: other, ingredient_id: ing, quantity_kg: dec("5") },
            ],
        );
        assert_eq!(levels.top_stock(ing), dec("10"));
        assert_eq!(levels.total_stock(ing), dec("15"));
    }

    #[test]
    fn test_case_serializes_as_number() {
        let json = serde_json::to_string(&FeasibilityCase::MustPurchase).unwrap();
        assert_eq!(json, "3");
        let back: FeasibilityCase = serde_json::from_str("2").unwrap();
        assert_eq!(back, FeasibilityCase::TransferNeeded);
        assert!(serde_json::from_str::<FeasibilityCase>("4").is_err());
    }

    #[test]
    fn test_case_ordering_by_severity() {
        assert!(FeasibilityCase::MustPurchase > FeasibilityCase::TransferNeeded);
        assert!(FeasibilityCase::TransferNeeded > FeasibilityCase::Sufficient);
    }

    #[test]
    fn test_merge_overflow_is_reported() {
        let ing = Uuid::new_v4();
        let huge = FeasibilityResult {
            ingredient_id: ing,
            ingredient_name: "Glycerin".to_string(),
            required_kg: Decimal::MAX,
            top_stock_kg: Decimal::ZERO,
            total_stock_kg: Decimal::ZERO,
            case: FeasibilityCase::MustPurchase,
            move_kg: Decimal::ZERO,
            lacking_kg: Decimal::MAX,
        };
        let per_product = vec![vec![huge.clone()], vec![huge]];
        assert_eq!(merge_feasibility(&per_product), Err(OutOfRange));
        assert_eq!(joint_feasibility(&per_product), Err(OutOfRange));
    }
}
