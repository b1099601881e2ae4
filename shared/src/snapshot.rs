//! Recipe snapshot engine
//!
//! Expands ordered product lines into frozen per-ingredient requirement rows and
//! rolls them up into an ingredient summary. The same aggregation is used when
//! an order is displayed and when it is applied to stock, so the two paths can
//! never disagree about how much of an ingredient an order needs.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Recipe;
use crate::types::{checked_add, checked_sum, line_cost, percent_of, OutOfRange};

/// Frozen requirement of one recipe ingredient for one product line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotRow {
    pub product_id: Uuid,
    pub ingredient_id: Uuid,
    /// Recipe percentage at order time
    pub amount_per_kg: Decimal,
    /// Catalog cost per kg at order time
    pub unit_cost: Decimal,
    pub total_amount_kg: Decimal,
    pub total_cost: Decimal,
}

/// Per-ingredient total across every line of one order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientSummary {
    pub ingredient_id: Uuid,
    pub total_amount_kg: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

/// Everything the snapshot engine produces for one order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub rows: Vec<SnapshotRow>,
    pub summary: Vec<IngredientSummary>,
}

/// Expand one product line into its frozen ingredient rows
pub fn snapshot_line(recipe: &Recipe, quantity_kg: Decimal) -> Result<Vec<SnapshotRow>, OutOfRange> {
    recipe
        .components
        .iter()
        .map(|component| {
            let unit_cost = component.effective_unit_cost();
            let total_amount_kg = percent_of(component.percent_per_kg, quantity_kg)?;
            Ok(SnapshotRow {
                product_id: recipe.product_id,
                ingredient_id: component.ingredient_id,
                amount_per_kg: component.percent_per_kg,
                unit_cost,
                total_amount_kg,
                total_cost: line_cost(total_amount_kg, unit_cost)?,
            })
        })
        .collect()
}

/// Expand every line of an order and summarize the result
pub fn snapshot_order<'a, I>(lines: I) -> Result<OrderSnapshot, OutOfRange>
where
    I: IntoIterator<Item = (&'a Recipe, Decimal)>,
{
    let mut rows: Vec<SnapshotRow> = Vec::new();
    for (recipe, quantity_kg) in lines {
        rows.extend(snapshot_line(recipe, quantity_kg)?);
    }
    let summary = summarize(&rows)?;
    Ok(OrderSnapshot { rows, summary })
}

/// Group snapshot rows by ingredient, in order of first appearance.
///
/// Amounts and costs are summed; the unit cost is the one carried by the last
/// row seen for that ingredient.
pub fn summarize(rows: &[SnapshotRow]) -> Result<Vec<IngredientSummary>, OutOfRange> {
    let mut summary: Vec<IngredientSummary> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        match index.get(&row.ingredient_id) {
            Some(&i) => {
                let entry = &mut summary[i];
                entry.total_amount_kg = checked_add(entry.total_amount_kg, row.total_amount_kg)?;
                entry.total_cost = checked_add(entry.total_cost, row.total_cost)?;
                entry.unit_cost = row.unit_cost;
            }
            None => {
                index.insert(row.ingredient_id, summary.len());
                summary.push(IngredientSummary {
                    ingredient_id: row.ingredient_id,
                    total_amount_kg: row.total_amount_kg,
                    unit_cost: row.unit_cost,
                    total_cost: row.total_cost,
                });
            }
        }
    }

    Ok(summary)
}

/// Required kg per ingredient, recomputed from frozen snapshot rows
pub fn required_by_ingredient(rows: &[SnapshotRow]) -> Result<BTreeMap<Uuid, Decimal>, OutOfRange> {
    Ok(summarize(rows)?
        .into_iter()
        .map(|s| (s.ingredient_id, s.total_amount_kg))
        .collect())
}

/// Grand total cost of an order
pub fn order_total_cost(summary: &[IngredientSummary]) -> Result<Decimal, OutOfRange> {
    checked_sum(summary.iter().map(|s| s.total_cost))
}
