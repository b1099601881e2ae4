//! WebAssembly module for Cosmetics Warehouse Management
//!
//! Lets the order screens work without a round trip:
//! - Feasibility tier of a single requirement
//! - Merging per-product feasibility results
//! - Cost preview of an order before it is saved
//! - Input validation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use wasm_bindgen::prelude::*;

use shared::{
    classify, joint_feasibility, merge_feasibility, order_total_cost, snapshot_order,
    validate_percent, validate_quantity, FeasibilityResult, IngredientSummary, MergedFeasibility,
    Recipe, SnapshotRow,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("cosmetics-warehouse-wasm loaded"));
}

/// Classify one requirement, returns 1, 2 or 3.
///
/// Quantities are decimal strings so no precision is lost on the way in.
#[wasm_bindgen]
pub fn classify_requirement(required_kg: &str, top_stock_kg: &str, total_stock_kg: &str) -> Result<u8, JsValue> {
    classify_tier(required_kg, top_stock_kg, total_stock_kg).map_err(|e| JsValue::from_str(&e))
}

/// Merge per-product feasibility results (JSON array of arrays)
#[wasm_bindgen]
pub fn merge_feasibility_results(per_product_json: &str) -> Result<String, JsValue> {
    merge_json(per_product_json).map_err(|e| JsValue::from_str(&e))
}

/// Preview an order's snapshot and total cost.
///
/// Input is a JSON array of `{ "recipe": Recipe, "quantity_kg": "5" }`.
#[wasm_bindgen]
pub fn preview_order_snapshot(lines_json: &str) -> Result<String, JsValue> {
    preview_json(lines_json).map_err(|e| JsValue::from_str(&e))
}

/// Check a line quantity before submitting an order
#[wasm_bindgen]
pub fn is_valid_quantity(quantity_kg: f64) -> bool {
    Decimal::try_from(quantity_kg)
        .map(|q| validate_quantity(q).is_ok())
        .unwrap_or(false)
}

/// Check a recipe percentage
#[wasm_bindgen]
pub fn is_valid_percent(percent: f64) -> bool {
    Decimal::try_from(percent)
        .map(|p| validate_percent(p).is_ok())
        .unwrap_or(false)
}

#[derive(Deserialize)]
struct PreviewLine {
    recipe: Recipe,
    quantity_kg: Decimal,
}

#[derive(Serialize)]
struct PreviewResponse {
    rows: Vec<SnapshotRow>,
    summary: Vec<IngredientSummary>,
    total_cost: Decimal,
}

#[derive(Serialize)]
struct MergeResponse {
    merged: Vec<MergedFeasibility>,
    joint: Vec<FeasibilityResult>,
}

fn parse_kg(field: &str, value: &str) -> Result<Decimal, String> {
    let kg = Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))?;
    if kg.is_sign_negative() {
        return Err(format!("Invalid {}: must not be negative", field));
    }
    Ok(kg)
}

fn classify_tier(required_kg: &str, top_stock_kg: &str, total_stock_kg: &str) -> Result<u8, String> {
    let required = parse_kg("required_kg", required_kg)?;
    let top = parse_kg("top_stock_kg", top_stock_kg)?;
    let total = parse_kg("total_stock_kg", total_stock_kg)?;
    Ok(classify(required, top, total).case.as_u8())
}

fn merge_json(per_product_json: &str) -> Result<String, String> {
    let per_product: Vec<Vec<FeasibilityResult>> = serde_json::from_str(per_product_json)
        .map_err(|e| format!("Invalid feasibility JSON: {}", e))?;

    let negative = per_product.iter().flatten().any(|r| {
        [r.required_kg, r.top_stock_kg, r.total_stock_kg, r.move_kg, r.lacking_kg]
            .iter()
            .any(|kg| kg.is_sign_negative())
    });
    if negative {
        return Err("Invalid feasibility JSON: quantities must not be negative".to_string());
    }

    let response = MergeResponse {
        merged: merge_feasibility(&per_product).map_err(|e| e.to_string())?,
        joint: joint_feasibility(&per_product).map_err(|e| e.to_string())?,
    };
    serde_json::to_string(&response).map_err(|e| e.to_string())
}

fn preview_json(lines_json: &str) -> Result<String, String> {
    let lines: Vec<PreviewLine> =
        serde_json::from_str(lines_json).map_err(|e| format!("Invalid order JSON: {}", e))?;
    for line in &lines {
        validate_quantity(line.quantity_kg)?;
        for component in &line.recipe.components {
            validate_percent(component.percent_per_kg)?;
        }
    }

    let snapshot =
        snapshot_order(lines.iter().map(|l| (&l.recipe, l.quantity_kg))).map_err(|e| e.to_string())?;
    let response = PreviewResponse {
        total_cost: order_total_cost(&snapshot.summary).map_err(|e| e.to_string())?,
        rows: snapshot.rows,
        summary: snapshot.summary,
    };
    serde_json::to_string(&response).map_err(|e| e.to_string())
}
