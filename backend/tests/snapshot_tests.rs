//! Recipe snapshot tests
//!
//! Tests for order snapshot generation including:
//! - Snapshot row amounts and costs
//! - Snapshot immutability after catalog changes
//! - Summary consistency with snapshot rows
//! - Quantity cap and overflow reporting

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    order_total_cost, required_by_ingredient, snapshot_line, snapshot_order, summarize,
    validate_quantity, OutOfRange, Recipe, RecipeComponent, SnapshotRow, MAX_QUANTITY_KG,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn component(ingredient_id: Uuid, name: &str, percent: &str, cost: Option<&str>) -> RecipeComponent {
    RecipeComponent {
        ingredient_id,
        ingredient_name: name.to_string(),
        percent_per_kg: dec(percent),
        unit_cost: cost.map(dec),
    }
}

fn recipe(name: &str, components: Vec<RecipeComponent>) -> Recipe {
    Recipe {
        product_id: Uuid::new_v4(),
        product_name: name.to_string(),
        components,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 5 kg of a 60/40 product at costs 100 and 200
    #[test]
    fn test_snapshot_end_to_end_amounts() {
        let i1 = Uuid::new_v4();
        let i2 = Uuid::new_v4();
        let p1 = recipe(
            "Moisture Cream",
            vec![
                component(i1, "Glycerin", "60", Some("100")),
                component(i2, "Shea Butter", "40", Some("200")),
            ],
        );

        let snapshot = snapshot_order([(&p1, dec("5"))]).unwrap();

        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].total_amount_kg, dec("3"));
        assert_eq!(snapshot.rows[0].total_cost, dec("300"));
        assert_eq!(snapshot.rows[1].total_amount_kg, dec("2"));
        assert_eq!(snapshot.rows[1].total_cost, dec("400"));

        assert_eq!(snapshot.summary.len(), 2);
        assert_eq!(snapshot.summary[0].ingredient_id, i1);
        assert_eq!(snapshot.summary[0].total_amount_kg, dec("3"));
        assert_eq!(snapshot.summary[0].total_cost, dec("300"));
        assert_eq!(snapshot.summary[1].ingredient_id, i2);
        assert_eq!(snapshot.summary[1].total_cost, dec("400"));

        assert_eq!(order_total_cost(&snapshot.summary), Ok(dec("700")));
    }

    /// Catalog edits after creation change neither the stored rows nor what
    /// the apply path derives from them
    #[test]
    fn test_snapshot_immutability() {
        let x = Uuid::new_v4();
        let mut p = recipe("Cleansing Oil", vec![component(x, "Jojoba Oil", "50", Some("120"))]);

        let created = snapshot_order([(&p, dec("4"))]).unwrap();
        // What the order tables hold from here on
        let stored: Vec<SnapshotRow> = created.rows.clone();

        p.components[0].unit_cost = Some(dec("999"));
        p.components[0].percent_per_kg = dec("75");
        let recomputed = snapshot_order([(&p, dec("4"))]).unwrap();

        // Apply reads requirements from the stored rows, not the catalog
        let required = required_by_ingredient(&stored).unwrap();
        assert_eq!(required.len(), 1);
        assert_eq!(required[&x], dec("2"));
        assert_ne!(required_by_ingredient(&recomputed.rows).unwrap()[&x], required[&x]);

        // Stored costs and the summary rebuilt from them keep the creation values
        let summary = summarize(&stored).unwrap();
        assert_eq!(summary, created.summary);
        assert_eq!(summary[0].unit_cost, dec("120"));
        assert_eq!(order_total_cost(&summary), Ok(dec("240")));
        assert_eq!(order_total_cost(&recomputed.summary), Ok(dec("2997")));
    }

    /// Unpriced ingredients freeze at cost 0
    #[test]
    fn test_unpriced_ingredient() {
        let x = Uuid::new_v4();
        let p = recipe("Sample", vec![component(x, "Fragrance", "1.5", None)]);
        let rows = snapshot_line(&p, dec("10")).unwrap();
        assert_eq!(rows[0].unit_cost, Decimal::ZERO);
        assert_eq!(rows[0].total_cost, Decimal::ZERO);
        assert_eq!(rows[0].total_amount_kg, dec("0.15"));
    }

    /// A product without a formula contributes no rows
    #[test]
    fn test_empty_recipe() {
        let p = recipe("Placeholder", vec![]);
        let snapshot = snapshot_order([(&p, dec("3"))]).unwrap();
        assert!(snapshot.rows.is_empty());
        assert!(snapshot.summary.is_empty());
    }

    /// Shared ingredients across lines collapse into one summary entry
    #[test]
    fn test_summary_merges_shared_ingredient() {
        let water = Uuid::new_v4();
        let a = recipe("Toner", vec![component(water, "Purified Water", "80", Some("1"))]);
        let b = recipe("Essence", vec![component(water, "Purified Water", "70", Some("1"))]);

        let snapshot = snapshot_order([(&a, dec("10")), (&b, dec("10"))]).unwrap();
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.summary.len(), 1);
        assert_eq!(snapshot.summary[0].total_amount_kg, dec("15"));
        assert_eq!(snapshot.summary[0].total_cost, dec("15"));
    }

    /// Amounts keep four decimal places and costs round half away from zero
    #[test]
    fn test_rounding() {
        let x = Uuid::new_v4();
        let p = recipe("Serum", vec![component(x, "Hyaluronic Acid", "0.333", Some("150"))]);
        let rows = snapshot_line(&p, dec("1.5")).unwrap();
        // 0.333% of 1.5 kg = 0.004995 kg
        assert_eq!(rows[0].total_amount_kg, dec("0.0050"));
        // 0.0050 * 150 = 0.75
        assert_eq!(rows[0].total_cost, dec("1"));
    }

    /// Required totals are rebuilt from snapshot rows
    #[test]
    fn test_required_by_ingredient() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let a = recipe("A", vec![component(x, "X", "50", Some("10")), component(y, "Y", "50", Some("10"))]);
        let b = recipe("B", vec![component(x, "X", "25", Some("10"))]);

        let snapshot = snapshot_order([(&a, dec("8")), (&b, dec("8"))]).unwrap();
        let required = required_by_ingredient(&snapshot.rows).unwrap();

        assert_eq!(required[&x], dec("6"));
        assert_eq!(required[&y], dec("4"));
    }

    /// Quantities stop just below the NUMERIC(14,4) column limit
    #[test]
    fn test_quantity_cap() {
        assert_eq!(MAX_QUANTITY_KG, dec("9999999999.9999"));
        assert!(validate_quantity(MAX_QUANTITY_KG).is_ok());
        assert!(validate_quantity(MAX_QUANTITY_KG + dec("0.0001")).is_err());
        assert!(validate_quantity(dec("50000000000000000000000000000")).is_err());
    }

    /// A capped batch of a 100% product still snapshots
    #[test]
    fn test_largest_batch_snapshots() {
        let x = Uuid::new_v4();
        let p = recipe("Bulk Base", vec![component(x, "Purified Water", "100", Some("1000"))]);
        let snapshot = snapshot_order([(&p, MAX_QUANTITY_KG)]).unwrap();
        assert_eq!(snapshot.rows[0].total_amount_kg, MAX_QUANTITY_KG);
        assert_eq!(snapshot.rows[0].total_cost, dec("10000000000000"));
    }

    /// Arithmetic beyond the decimal range is an error, not a panic
    #[test]
    fn test_oversized_snapshot_is_error() {
        let x = Uuid::new_v4();
        let p = recipe(
            "Bulk Base",
            vec![component(x, "Purified Water", "100", Some("79228162514264337593543950"))],
        );
        assert_eq!(snapshot_line(&p, dec("100000")).map(|r| r.len()), Err(OutOfRange));

        let row = SnapshotRow {
            product_id: Uuid::new_v4(),
            ingredient_id: x,
            amount_per_kg: dec("100"),
            unit_cost: Decimal::ZERO,
            total_amount_kg: Decimal::MAX,
            total_cost: Decimal::ZERO,
        };
        assert_eq!(required_by_ingredient(&[row.clone(), row]).map(|r| r.len()), Err(OutOfRange));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn percent_strategy() -> impl Strategy<Value = Decimal> {
        (0u32..=10_000u32).prop_map(|bp| Decimal::new(bp as i64, 2))
    }

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1u32..=1_000_000u32).prop_map(|q| Decimal::new(q as i64, 3))
    }

    fn cost_strategy() -> impl Strategy<Value = Option<Decimal>> {
        prop::option::of((0u32..=100_000u32).prop_map(Decimal::from))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Summary total per ingredient equals the sum of its snapshot rows
        #[test]
        fn prop_summary_consistency(
            lines in prop::collection::vec(
                (
                    prop::collection::vec((0usize..4, percent_strategy(), cost_strategy()), 0..5),
                    quantity_strategy(),
                ),
                1..6,
            )
        ) {
            let pool: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            let recipes: Vec<(Recipe, Decimal)> = lines
                .iter()
                .map(|(components, qty)| {
                    let components = components
                        .iter()
                        .map(|(i, pct, cost)| RecipeComponent {
                            ingredient_id: pool[*i],
                            ingredient_name: format!("ingredient-{}", i),
                            percent_per_kg: *pct,
                            unit_cost: *cost,
                        })
                        .collect();
                    (recipe("P", components), *qty)
                })
                .collect();

            let snapshot = snapshot_order(recipes.iter().map(|(r, q)| (r, *q))).unwrap();

            let mut from_rows: BTreeMap<Uuid, (Decimal, Decimal)> = BTreeMap::new();
            for row in &snapshot.rows {
                let entry = from_rows.entry(row.ingredient_id).or_insert((Decimal::ZERO, Decimal::ZERO));
                entry.0 += row.total_amount_kg;
                entry.1 += row.total_cost;
            }

            prop_assert_eq!(snapshot.summary.len(), from_rows.len());
            for entry in &snapshot.summary {
                let (amount, cost) = from_rows[&entry.ingredient_id];
                prop_assert_eq!(entry.total_amount_kg, amount);
                prop_assert_eq!(entry.total_cost, cost);
            }

            let required = required_by_ingredient(&snapshot.rows).unwrap();
            for entry in &snapshot.summary {
                prop_assert_eq!(required[&entry.ingredient_id], entry.total_amount_kg);
            }
        }

        /// Every snapshot row has one entry per recipe component
        #[test]
        fn prop_one_row_per_component(
            percents in prop::collection::vec(percent_strategy(), 0..8),
            qty in quantity_strategy()
        ) {
            let components: Vec<RecipeComponent> = percents
                .iter()
                .map(|p| component(Uuid::new_v4(), "C", &p.to_string(), Some("10")))
                .collect();
            let r = recipe("P", components);
            let rows = snapshot_line(&r, qty).unwrap();
            prop_assert_eq!(rows.len(), percents.len());
            for row in &rows {
                prop_assert!(row.total_amount_kg >= Decimal::ZERO);
                prop_assert!(row.total_cost >= Decimal::ZERO);
                prop_assert!(row.total_amount_kg.scale() <= 4);
            }
        }

        /// Summarizing twice gives the same result
        #[test]
        fn prop_summarize_deterministic(
            percents in prop::collection::vec(percent_strategy(), 1..6),
            qty in quantity_strategy()
        ) {
            let x = Uuid::new_v4();
            let components = percents
                .iter()
                .map(|p| component(x, "X", &p.to_string(), Some("7")))
                .collect();
            let rows = snapshot_line(&recipe("P", components), qty).unwrap();
            prop_assert_eq!(summarize(&rows), summarize(&rows));
        }
    }
}
